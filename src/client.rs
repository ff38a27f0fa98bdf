//! HTTP client used by a viewer to talk to the showroom server.
//!
//! Every call is a single request: no retries, no backoff. A non-success
//! status becomes [`Error::Status`].

use std::time::Duration;

use reqwest::{
    Url,
    multipart::{Form, Part},
};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    core::{registry::TEXTURES_DIR, upload::UploadKind},
    errors::{Error, Result},
    models::{
        DEFAULT_MODEL_ENTITY, MeshActionConfig, ModelEntry, ModelInfo, ModelListing,
        ProductUploadResponse, SHOP_ENTITY, SaveResponse, UploadResponse,
    },
};

const USER_AGENT: &str = concat!("showroom-viewer/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A file to send in an upload form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    /// Filename reported to the server
    pub file_name: String,
    /// File contents
    pub data: Vec<u8>,
}

impl FilePart {
    /// A part named `file_name` holding `data`.
    pub fn new(file_name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }

    fn into_part(self) -> Result<Part> {
        Ok(Part::bytes(self.data)
            .file_name(self.file_name)
            .mime_str("application/octet-stream")?)
    }
}

/// Client for one showroom server.
#[derive(Debug, Clone)]
pub struct ShowroomClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ShowroomClient {
    /// A client for the server at `base_url`, e.g. `http://localhost:3000`.
    ///
    /// # Errors
    /// Returns `Error::Config` for an unusable URL and `Error::Http` when the
    /// underlying client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| Error::Config {
            message: format!("Invalid server URL '{base_url}': {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config {
                message: format!("Server URL '{base_url}' cannot carry paths"),
            });
        }
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client, base_url })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// URL of a stored asset under `/uploads/<entity>/`.
    #[must_use]
    pub fn asset_url(&self, entity: &str, file_name: &str) -> Url {
        self.url(&["uploads", entity, file_name])
    }

    /// URL of a stored texture under `/uploads/<entity>/textures/`.
    #[must_use]
    pub fn texture_url(&self, entity: &str, file_name: &str) -> Url {
        self.url(&["uploads", entity, TEXTURES_DIR, file_name])
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            warn!("{} answered {}", response.url(), status);
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("GET {}", url);
        Self::read(self.client.get(url).send().await?).await
    }

    async fn post_json<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let url = self.url(&[path]);
        debug!("POST {}", url);
        Self::read(self.client.post(url).json(body).send().await?).await
    }

    /// Filenames of a model entity; `None` asks for the default `model`.
    ///
    /// # Errors
    /// `Error::Status` with 404 when the files are missing.
    pub async fn model_info(&self, name: Option<&str>) -> Result<ModelInfo> {
        let mut url = self.url(&["model-info"]);
        if let Some(name) = name {
            url.query_pairs_mut().append_pair("name", name);
        }
        self.get_json(url).await
    }

    /// Filenames of the shop scene.
    ///
    /// # Errors
    /// `Error::Status` with 404 when no shop was uploaded.
    pub async fn shop_model(&self) -> Result<ModelInfo> {
        self.get_json(self.url(&["shop-model"])).await
    }

    /// Every uploaded entity with its stored filenames.
    ///
    /// # Errors
    /// Transport failures and non-success statuses.
    pub async fn models(&self) -> Result<Vec<ModelListing>> {
        self.get_json(self.url(&["models"])).await
    }

    /// Every registered product.
    ///
    /// # Errors
    /// Transport failures and non-success statuses.
    pub async fn products(&self) -> Result<Vec<ModelEntry>> {
        self.get_json(self.url(&["products"])).await
    }

    /// The stored mesh action config.
    ///
    /// # Errors
    /// Transport failures and non-success statuses.
    pub async fn get_config(&self) -> Result<MeshActionConfig> {
        self.get_json(self.url(&["get-config"])).await
    }

    /// Replaces the mesh action config.
    ///
    /// # Errors
    /// `Error::Status` with 400 for an empty config.
    pub async fn save_config(&self, config: &MeshActionConfig) -> Result<SaveResponse> {
        self.post_json("save-config", config).await
    }

    /// Replaces the product registry.
    ///
    /// # Errors
    /// `Error::Status` with 400 for an invalid layout.
    pub async fn save_layout(&self, entries: &[ModelEntry]) -> Result<SaveResponse> {
        self.post_json("save-layout", &entries).await
    }

    fn upload_form(
        kind: UploadKind,
        name: Option<&str>,
        gltf: FilePart,
        bin: FilePart,
        textures: Vec<FilePart>,
    ) -> Result<Form> {
        let fields = kind.fields();
        let mut form = Form::new();
        if let (Some(field), Some(name)) = (fields.name, name) {
            form = form.text(field, name.to_string());
        }
        form = form
            .part(fields.model, gltf.into_part()?)
            .part(fields.binary, bin.into_part()?);
        for texture in textures {
            form = form.part(fields.textures, texture.into_part()?);
        }
        Ok(form)
    }

    async fn upload<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let url = self.url(&[path]);
        debug!("POST {} (multipart)", url);
        Self::read(self.client.post(url).multipart(form).send().await?).await
    }

    /// Uploads a single model; `name` defaults to `model` on the server.
    ///
    /// # Errors
    /// `Error::Status` with 400 when the server rejects the files.
    pub async fn upload_model(
        &self,
        name: Option<&str>,
        gltf: FilePart,
        bin: FilePart,
        textures: Vec<FilePart>,
    ) -> Result<UploadResponse> {
        let form = Self::upload_form(UploadKind::Model, name, gltf, bin, textures)?;
        self.upload("upload", form).await
    }

    /// Uploads the shop scene.
    ///
    /// # Errors
    /// `Error::Status` with 400 when the server rejects the files.
    pub async fn upload_shop(
        &self,
        gltf: FilePart,
        bin: FilePart,
        textures: Vec<FilePart>,
    ) -> Result<UploadResponse> {
        let form = Self::upload_form(UploadKind::Shop, None, gltf, bin, textures)?;
        self.upload("upload-shop", form).await
    }

    /// Uploads and registers a named product.
    ///
    /// # Errors
    /// `Error::Status` with 400 when the name or files are rejected.
    pub async fn upload_product(
        &self,
        name: &str,
        gltf: FilePart,
        bin: FilePart,
        textures: Vec<FilePart>,
    ) -> Result<ProductUploadResponse> {
        let form = Self::upload_form(UploadKind::Product, Some(name), gltf, bin, textures)?;
        self.upload("upload-product", form).await
    }
}

/// PBR texture URLs picked out of a texture list by filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextureSet {
    /// Albedo map
    pub base_color: Option<Url>,
    /// Normal map
    pub normal: Option<Url>,
    /// Packed metallic/roughness map
    pub metallic_roughness: Option<Url>,
}

impl TextureSet {
    /// Albedo map marker.
    pub const BASE_COLOR: &'static str = "baseColor";
    /// Normal map marker.
    pub const NORMAL: &'static str = "normal";
    /// Metallic/roughness map marker.
    pub const METALLIC_ROUGHNESS: &'static str = "metallicRoughness";

    /// Sorts `textures` of `entity` into roles.
    ///
    /// Each role takes the first file whose name contains its marker, so
    /// earlier submissions win and one file may fill several roles.
    /// Files matching no marker are ignored.
    #[must_use]
    pub fn classify(client: &ShowroomClient, entity: &str, textures: &[String]) -> Self {
        let pick = |marker: &str| {
            textures
                .iter()
                .find(|file_name| file_name.contains(marker))
                .map(|file_name| client.texture_url(entity, file_name))
        };
        Self {
            base_color: pick(Self::BASE_COLOR),
            normal: pick(Self::NORMAL),
            metallic_roughness: pick(Self::METALLIC_ROUGHNESS),
        }
    }
}

/// Everything a viewer needs to load one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelData {
    /// Entity the files belong to
    pub entity: String,
    /// URL of the GLTF file
    pub gltf_url: Url,
    /// URL of the BIN file
    pub bin_url: Url,
    /// Classified texture URLs
    pub textures: TextureSet,
}

/// Viewer state across reloads.
///
/// A failed load sets [`error`](Self::error) and keeps the last good model
/// and config.
#[derive(Debug)]
pub struct ViewerSession {
    client: ShowroomClient,
    /// Last successfully loaded model
    pub model: Option<ModelData>,
    /// Last successfully loaded mesh action config
    pub config: MeshActionConfig,
    /// Inline error from the most recent load, `"Error: ..."`
    pub error: Option<String>,
}

impl ViewerSession {
    /// A session with nothing loaded.
    #[must_use]
    pub fn new(client: ShowroomClient) -> Self {
        Self {
            client,
            model: None,
            config: MeshActionConfig::new(),
            error: None,
        }
    }

    async fn fetch(&self, entity: &str) -> Result<(ModelData, MeshActionConfig)> {
        let info = if entity == SHOP_ENTITY {
            self.client.shop_model().await?
        } else {
            self.client.model_info(Some(entity)).await?
        };
        let config = self.client.get_config().await?;
        let model = ModelData {
            entity: entity.to_string(),
            gltf_url: self.client.asset_url(entity, &info.gltf_file),
            bin_url: self.client.asset_url(entity, &info.bin_file),
            textures: TextureSet::classify(&self.client, entity, &info.textures),
        };
        Ok((model, config))
    }

    /// Loads model info and config for `entity` (default `model`).
    /// Returns whether the load succeeded.
    pub async fn load(&mut self, entity: Option<&str>) -> bool {
        let entity = entity.unwrap_or(DEFAULT_MODEL_ENTITY);
        match self.fetch(entity).await {
            Ok((model, config)) => {
                self.model = Some(model);
                self.config = config;
                self.error = None;
                true
            }
            Err(e) => {
                warn!("Failed to load '{}': {}", entity, e);
                self.error = Some(format!("Error: {e}"));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        api::{AppState, router},
        config::ServerConfig,
        store::{AnyStore, FileStore},
        test_utils::{sample_config, test_entry},
        models::Vec3Triple,
    };
    use tempfile::TempDir;

    /// Serves a fresh file-backed app on an ephemeral port.
    async fn spawn_server() -> (TempDir, ShowroomClient) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("uploads"), dir.path());
        let app = router(AppState::new(
            AnyStore::File(store),
            ServerConfig::rooted_at(dir.path()),
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let client = ShowroomClient::new(&format!("http://{addr}")).unwrap();
        (dir, client)
    }

    fn chair_files() -> (FilePart, FilePart, Vec<FilePart>) {
        (
            FilePart::new("chair.gltf", b"{\"asset\":{}}".to_vec()),
            FilePart::new("chair.bin", vec![0_u8, 1, 2, 3]),
            vec![FilePart::new("wood_baseColor.png", vec![0x89_u8, b'P'])],
        )
    }

    #[test]
    fn test_asset_urls_escape_segments() {
        let client = ShowroomClient::new("http://localhost:3000").unwrap();
        assert_eq!(
            client.asset_url("chair", "chair.gltf").as_str(),
            "http://localhost:3000/uploads/chair/chair.gltf"
        );
        assert_eq!(
            client.texture_url("Oak Table", "top_normal.png").as_str(),
            "http://localhost:3000/uploads/Oak%20Table/textures/top_normal.png"
        );
    }

    #[test]
    fn test_rejects_unusable_base_url() {
        assert!(matches!(
            ShowroomClient::new("not a url"),
            Err(Error::Config { .. })
        ));
        assert!(matches!(
            ShowroomClient::new("mailto:admin@example.com"),
            Err(Error::Config { .. })
        ));
    }

    #[test]
    fn test_texture_classification() {
        let client = ShowroomClient::new("http://localhost:3000").unwrap();
        let textures = vec![
            "wood_baseColor.png".to_string(),
            "wood_metallicRoughness.png".to_string(),
            "wood_normal.png".to_string(),
            "wood_occlusion.png".to_string(),
        ];
        let set = TextureSet::classify(&client, "chair", &textures);
        assert_eq!(
            set.base_color.unwrap().as_str(),
            "http://localhost:3000/uploads/chair/textures/wood_baseColor.png"
        );
        assert!(set.normal.unwrap().as_str().ends_with("wood_normal.png"));
        assert!(
            set.metallic_roughness
                .unwrap()
                .as_str()
                .ends_with("wood_metallicRoughness.png")
        );
    }

    #[test]
    fn test_texture_classification_prefers_first_match() {
        let client = ShowroomClient::new("http://localhost:3000").unwrap();
        let textures = vec![
            "a_baseColor.png".to_string(),
            "b_baseColor.png".to_string(),
        ];
        let set = TextureSet::classify(&client, "chair", &textures);
        assert!(set.base_color.unwrap().as_str().ends_with("/a_baseColor.png"));
        assert_eq!(set.normal, None);
        assert_eq!(set.metallic_roughness, None);
    }

    #[test]
    fn test_one_texture_fills_several_roles() {
        let client = ShowroomClient::new("http://localhost:3000").unwrap();
        let textures = vec!["x_baseColor_normal.png".to_string()];
        let set = TextureSet::classify(&client, "chair", &textures);
        assert_eq!(set.base_color, set.normal);
        assert!(set.base_color.is_some());
        assert_eq!(set.metallic_roughness, None);
    }

    #[tokio::test]
    async fn test_upload_then_model_info() -> Result<()> {
        let (_dir, client) = spawn_server().await;
        let (gltf, bin, textures) = chair_files();

        let uploaded = client.upload_model(Some("chair"), gltf, bin, textures).await?;
        assert_eq!(uploaded.gltf_file, "chair.gltf");

        let info = client.model_info(Some("chair")).await?;
        assert_eq!(info.bin_file, "chair.bin");
        assert_eq!(info.textures, vec!["wood_baseColor.png".to_string()]);

        let missing = client.model_info(None).await;
        assert!(matches!(missing, Err(Error::Status { status: 404 })));

        let listed = client.models().await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "chair");
        assert_eq!(listed[0].info, info);
        Ok(())
    }

    #[tokio::test]
    async fn test_product_layout_and_config_round_trip() -> Result<()> {
        let (_dir, client) = spawn_server().await;
        let (gltf, bin, textures) = chair_files();

        let product = client.upload_product("chair", gltf, bin, textures).await?;
        assert_eq!(product.product.name, "chair");

        let mut entries = client.products().await?;
        assert_eq!(entries.len(), 1);
        entries.push(test_entry("table", Vec3Triple::new(2.0, 0.0, -1.0)));
        assert_eq!(client.save_layout(&entries).await?.count, 2);
        assert_eq!(client.products().await?, entries);

        assert_eq!(client.get_config().await?, MeshActionConfig::new());
        client.save_config(&sample_config()).await?;
        assert_eq!(client.get_config().await?, sample_config());

        let empty = client.save_config(&MeshActionConfig::new()).await;
        assert!(matches!(empty, Err(Error::Status { status: 400 })));
        Ok(())
    }

    #[tokio::test]
    async fn test_session_keeps_last_good_state() -> Result<()> {
        let (_dir, client) = spawn_server().await;
        let (gltf, bin, textures) = chair_files();
        client.upload_shop(gltf, bin, textures).await?;
        client.save_config(&sample_config()).await?;

        let mut session = ViewerSession::new(client);
        assert!(session.load(Some(SHOP_ENTITY)).await);
        let loaded = session.model.clone().unwrap();
        assert!(loaded.gltf_url.as_str().ends_with("/uploads/shop/chair.gltf"));
        assert!(loaded.textures.base_color.is_some());
        assert_eq!(session.config, sample_config());

        assert!(!session.load(Some("sofa")).await);
        assert_eq!(
            session.error.as_deref(),
            Some("Error: HTTP error! status: 404")
        );
        assert_eq!(session.model, Some(loaded));
        assert_eq!(session.config, sample_config());
        Ok(())
    }

    #[tokio::test]
    async fn test_uploaded_asset_is_served() -> Result<()> {
        let (_dir, client) = spawn_server().await;
        let (gltf, bin, textures) = chair_files();
        client.upload_model(None, gltf, bin, textures).await?;

        let url = client.asset_url(DEFAULT_MODEL_ENTITY, "chair.bin");
        let bytes = reqwest::get(url).await?.bytes().await?;
        assert_eq!(bytes.as_ref(), &[0_u8, 1, 2, 3]);
        Ok(())
    }
}
