//! Upload routing - turns a buffered multipart form into files on disk.
//!
//! A form is collected completely, then resolved into an [`UploadPlan`]:
//! which entity it belongs to and which parts are the GLTF, the BIN and the
//! textures. Only a valid plan ever touches the filesystem, so a rejected
//! upload leaves no directory behind.

use crate::{
    core::registry::{self, TEXTURES_DIR},
    errors::{Error, Result},
    models::{EntityName, ModelEntry, ModelInfo, has_extension, sanitize_file_name},
    store::KeyValueStore,
};
use std::path::Path;
use tracing::{debug, info};

/// Which upload endpoint a form came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// A single model (`/upload`)
    Model,
    /// The shop scene (`/upload-shop`)
    Shop,
    /// A named product (`/upload-product`)
    Product,
}

/// Multipart field names used by one upload kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadFields {
    /// Field carrying the GLTF (and, for sniffing, possibly the BIN)
    pub model: &'static str,
    /// Field carrying the BIN
    pub binary: &'static str,
    /// Field carrying texture images
    pub textures: &'static str,
    /// Text field naming the entity, if the kind has one
    pub name: Option<&'static str>,
}

impl UploadKind {
    /// The field names this kind reads.
    #[must_use]
    pub const fn fields(self) -> UploadFields {
        match self {
            Self::Model => UploadFields {
                model: "gltf",
                binary: "bin",
                textures: "textures",
                name: Some("name"),
            },
            Self::Shop => UploadFields {
                model: "shop",
                binary: "shopBin",
                textures: "shopTextures",
                name: None,
            },
            Self::Product => UploadFields {
                model: "product",
                binary: "productBin",
                textures: "productTextures",
                name: Some("productName"),
            },
        }
    }
}

/// One file part of a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Multipart field name
    pub field: String,
    /// Sanitized filename the part will be stored under
    pub file_name: String,
    /// File contents
    pub data: Vec<u8>,
}

/// A fully buffered multipart form.
#[derive(Debug, Clone)]
pub struct UploadForm {
    kind: UploadKind,
    files: Vec<UploadedFile>,
    texts: Vec<(String, String)>,
}

impl UploadForm {
    /// An empty form for `kind`.
    #[must_use]
    pub const fn new(kind: UploadKind) -> Self {
        Self {
            kind,
            files: Vec::new(),
            texts: Vec::new(),
        }
    }

    /// Adds a file part.
    ///
    /// Browsers send an unnamed, empty part for a file input left blank;
    /// such parts are dropped.
    ///
    /// # Errors
    /// Returns `Error::InvalidUpload` when the filename is unusable.
    pub fn push_file(&mut self, field: &str, file_name: &str, data: Vec<u8>) -> Result<()> {
        if file_name.trim().is_empty() && data.is_empty() {
            debug!("Ignoring empty file part in field '{}'", field);
            return Ok(());
        }
        self.files.push(UploadedFile {
            field: field.to_string(),
            file_name: sanitize_file_name(file_name)?,
            data,
        });
        Ok(())
    }

    /// Adds a text part. Only the first value sent for a field is read;
    /// a blank one counts as absent.
    pub fn push_text(&mut self, field: &str, value: String) {
        self.texts.push((field.to_string(), value));
    }

    fn text(&self, field: &str) -> Option<&str> {
        self.texts
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
            .filter(|value| !value.trim().is_empty())
    }

    fn entity(&self) -> Result<EntityName> {
        let name = self.kind.fields().name.and_then(|field| self.text(field));
        match self.kind {
            UploadKind::Shop => Ok(EntityName::shop()),
            UploadKind::Model => {
                name.map_or_else(|| Ok(EntityName::default_model()), EntityName::parse)
            }
            UploadKind::Product => {
                let raw = name.ok_or_else(|| Error::MissingUpload {
                    message: "Product name is required".to_string(),
                })?;
                EntityName::parse(raw)
            }
        }
    }

    /// Resolves the form into a plan, without touching the filesystem.
    ///
    /// The GLTF is the first model-field file ending in `.gltf`, falling back
    /// to the first model-field file that is not a `.bin`. The BIN is the
    /// first binary-field file, falling back to the first model-field file
    /// ending in `.bin`.
    ///
    /// # Errors
    /// - `Error::MissingUpload` without a GLTF, a BIN or a required name
    /// - `Error::InvalidName` for a bad entity name
    /// - `Error::InvalidUpload` for too many textures or clashing filenames
    pub fn into_plan(self, max_textures: usize) -> Result<UploadPlan> {
        let fields = self.kind.fields();
        let entity = self.entity()?;

        let in_field = |name: &'static str| {
            self.files
                .iter()
                .enumerate()
                .filter(move |(_, f)| f.field == name)
        };

        let gltf_index = in_field(fields.model)
            .find(|(_, f)| has_extension(&f.file_name, "gltf"))
            .or_else(|| in_field(fields.model).find(|(_, f)| !has_extension(&f.file_name, "bin")))
            .map(|(i, _)| i);
        let bin_index = in_field(fields.binary)
            .next()
            .or_else(|| in_field(fields.model).find(|(_, f)| has_extension(&f.file_name, "bin")))
            .map(|(i, _)| i);

        let (Some(gltf_index), Some(bin_index)) = (gltf_index, bin_index) else {
            return Err(Error::MissingUpload {
                message: "Both GLTF and BIN files are required".to_string(),
            });
        };

        let texture_count = in_field(fields.textures).count();
        if texture_count > max_textures {
            return Err(Error::InvalidUpload {
                message: format!(
                    "at most {max_textures} texture files are accepted, got {texture_count}"
                ),
            });
        }

        let mut gltf = None;
        let mut bin = None;
        let mut textures = Vec::with_capacity(texture_count);
        for (index, file) in self.files.into_iter().enumerate() {
            if index == gltf_index {
                gltf = Some(file);
            } else if index == bin_index {
                bin = Some(file);
            } else if file.field == fields.textures {
                textures.push(file);
            } else {
                debug!(
                    "Ignoring extra part '{}' in field '{}'",
                    file.file_name, file.field
                );
            }
        }

        let (Some(gltf), Some(bin)) = (gltf, bin) else {
            return Err(Error::MissingUpload {
                message: "Both GLTF and BIN files are required".to_string(),
            });
        };
        if gltf.file_name == bin.file_name {
            return Err(Error::InvalidUpload {
                message: format!("GLTF and BIN share the file name '{}'", gltf.file_name),
            });
        }

        Ok(UploadPlan {
            kind: self.kind,
            entity,
            gltf,
            bin,
            textures,
        })
    }
}

/// A validated upload, ready to be written.
#[derive(Debug, Clone)]
pub struct UploadPlan {
    /// Upload kind
    pub kind: UploadKind,
    /// Target entity (directory name)
    pub entity: EntityName,
    /// The GLTF part
    pub gltf: UploadedFile,
    /// The BIN part
    pub bin: UploadedFile,
    /// Texture parts in submission order
    pub textures: Vec<UploadedFile>,
}

impl UploadPlan {
    /// The filenames this plan will store.
    #[must_use]
    pub fn info(&self) -> ModelInfo {
        ModelInfo {
            gltf_file: self.gltf.file_name.clone(),
            bin_file: self.bin.file_name.clone(),
            textures: self.textures.iter().map(|t| t.file_name.clone()).collect(),
        }
    }
}

/// Result of a stored upload.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredUpload {
    /// Entity the files were stored under
    pub entity: EntityName,
    /// Stored filenames
    pub info: ModelInfo,
    /// Registry entry, for product uploads
    pub product: Option<ModelEntry>,
}

/// Writes the plan's files under `uploads_dir/<entity>/`, records the
/// sidecar and, for products, registers the product.
///
/// Same-named files from an earlier upload are overwritten; other files in
/// the directory are left alone. Textures go to the `textures/`
/// subdirectory, which is only created when there are textures.
///
/// # Errors
/// - an I/O error if a directory or file cannot be written
/// - a store error if the sidecar or the product record cannot be written
pub async fn store_upload<S: KeyValueStore>(
    store: &S,
    uploads_dir: &Path,
    plan: UploadPlan,
) -> Result<StoredUpload> {
    let info = plan.info();
    let entity_dir = uploads_dir.join(plan.entity.as_str());
    tokio::fs::create_dir_all(&entity_dir).await?;

    tokio::fs::write(entity_dir.join(&plan.gltf.file_name), &plan.gltf.data).await?;
    tokio::fs::write(entity_dir.join(&plan.bin.file_name), &plan.bin.data).await?;

    if !plan.textures.is_empty() {
        let textures_dir = entity_dir.join(TEXTURES_DIR);
        tokio::fs::create_dir_all(&textures_dir).await?;
        for texture in &plan.textures {
            tokio::fs::write(textures_dir.join(&texture.file_name), &texture.data).await?;
        }
    }

    registry::record_upload(store, &plan.entity, &info).await?;

    let product = if plan.kind == UploadKind::Product {
        Some(registry::upsert_product(store, &plan.entity, &info).await?)
    } else {
        None
    };

    info!(
        entity = %plan.entity,
        gltf = %info.gltf_file,
        bin = %info.bin_file,
        textures = info.textures.len(),
        "Stored upload"
    );

    Ok(StoredUpload {
        entity: plan.entity,
        info,
        product,
    })
}
