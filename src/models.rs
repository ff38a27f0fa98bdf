//! Record shapes shared by the server, the stores and the viewer client.
//!
//! All JSON is camelCase to stay wire-compatible with the browser front-end.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt, path::Path};

/// Entity reserved for the shop scene.
pub const SHOP_ENTITY: &str = "shop";
/// Entity used by `/upload` when the form carries no `name`.
pub const DEFAULT_MODEL_ENTITY: &str = "model";

const MAX_NAME_LEN: usize = 64;

/// A validated, directory-safe entity name.
///
/// Only ASCII alphanumerics, `-`, `_`, `.` and inner spaces are allowed and
/// the name may not start with `.`, so it can never escape the uploads root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityName(String);

impl EntityName {
    /// Validates `raw` (after trimming) as a product or model name.
    ///
    /// # Errors
    /// Returns `Error::InvalidName` when a rule is broken or the name is the
    /// reserved shop entity.
    pub fn parse(raw: &str) -> Result<Self> {
        let name = Self::parse_any(raw)?;
        if name.0 == SHOP_ENTITY {
            return Err(invalid_name(raw, "name is reserved for the shop scene"));
        }
        Ok(name)
    }

    /// The shop scene entity.
    #[must_use]
    pub fn shop() -> Self {
        Self(SHOP_ENTITY.to_string())
    }

    /// The default single-model entity.
    #[must_use]
    pub fn default_model() -> Self {
        Self(DEFAULT_MODEL_ENTITY.to_string())
    }

    /// Validates without the reserved-name check. Used for lookups.
    ///
    /// # Errors
    /// Returns `Error::InvalidName` when a character or length rule is broken.
    pub fn parse_any(raw: &str) -> Result<Self> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(invalid_name(raw, "name cannot be empty"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(invalid_name(
                raw,
                &format!("name is longer than {MAX_NAME_LEN} characters"),
            ));
        }
        if name.starts_with('.') {
            return Err(invalid_name(raw, "name must not start with '.'"));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ' ')))
        {
            return Err(invalid_name(raw, &format!("character '{bad}' is not allowed")));
        }
        Ok(Self(name.to_string()))
    }

    /// Borrow the name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn invalid_name(raw: &str, reason: &str) -> Error {
    Error::InvalidName {
        name: raw.to_string(),
        reason: reason.to_string(),
    }
}

/// Reduces a client-supplied filename to a safe final path component.
///
/// Browsers on Windows may send `C:\fakepath\x.gltf`, so both separators are
/// stripped before the remainder is checked.
///
/// # Errors
/// Returns `Error::InvalidUpload` for empty, `.` or `..` names.
pub fn sanitize_file_name(raw: &str) -> Result<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    let valid = !last.is_empty()
        && last != "."
        && last != ".."
        && !last.contains('\0')
        && Path::new(last).file_name().is_some();
    if valid {
        Ok(last.to_string())
    } else {
        Err(Error::InvalidUpload {
            message: format!("unusable file name '{raw}'"),
        })
    }
}

/// True when `file_name` ends with `.ext`, ignoring ASCII case.
#[must_use]
pub fn has_extension(file_name: &str, ext: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// An `{x, y, z}` float triple used for position and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3Triple {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3Triple {
    /// Origin, the default position.
    pub const ZERO: Self = Self::splat(0.0);
    /// Unit scale.
    pub const ONE: Self = Self::splat(1.0);

    /// Builds a triple from its components.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Builds a triple with all components equal.
    #[must_use]
    pub const fn splat(v: f32) -> Self {
        Self { x: v, y: v, z: v }
    }

    /// True when every component is finite.
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

impl From<Vec3Triple> for glam::Vec3 {
    fn from(v: Vec3Triple) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

const fn default_scale() -> Vec3Triple {
    Vec3Triple::ONE
}

const fn default_position() -> Vec3Triple {
    Vec3Triple::ZERO
}

/// A product placed in the showroom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelEntry {
    /// Unique, directory-safe name; equals the upload directory name
    pub name: String,
    /// Stored GLTF filename
    pub gltf_file: String,
    /// Stored BIN filename
    pub bin_file: String,
    /// Stored texture filenames in submission order
    #[serde(default)]
    pub texture_files: Vec<String>,
    /// Placement in the shop scene
    #[serde(default = "default_position")]
    pub position: Vec3Triple,
    /// Scale in the shop scene
    #[serde(default = "default_scale")]
    pub scale: Vec3Triple,
    /// Table the product stands on, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_number: Option<i64>,
}

impl ModelEntry {
    /// A freshly uploaded product at the origin with unit scale.
    #[must_use]
    pub fn new(name: &EntityName, info: &ModelInfo) -> Self {
        Self {
            name: name.to_string(),
            gltf_file: info.gltf_file.clone(),
            bin_file: info.bin_file.clone(),
            texture_files: info.textures.clone(),
            position: Vec3Triple::ZERO,
            scale: Vec3Triple::ONE,
            table_number: None,
        }
    }
}

/// Stored filenames of one uploaded entity; the `info.json` sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    /// GLTF filename
    pub gltf_file: String,
    /// BIN filename
    pub bin_file: String,
    /// Texture filenames, in submission order
    #[serde(default)]
    pub textures: Vec<String>,
}

/// One uploaded entity as listed by `/models`: its name and stored filenames.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelListing {
    /// Entity (directory) name
    pub name: String,
    /// Stored filenames
    #[serde(flatten)]
    pub info: ModelInfo,
}

/// Actions configured for one mesh.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshAction {
    /// Label of the hover action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hover: Option<String>,
    /// Label of the click action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click: Option<String>,
}

impl MeshAction {
    /// The hover label, treating an empty string as unset.
    #[must_use]
    pub fn hover_action(&self) -> Option<&str> {
        self.hover.as_deref().filter(|s| !s.is_empty())
    }

    /// The click label, treating an empty string as unset.
    #[must_use]
    pub fn click_action(&self) -> Option<&str> {
        self.click.as_deref().filter(|s| !s.is_empty())
    }
}

/// Mesh name → configured actions.
pub type MeshActionConfig = BTreeMap<String, MeshAction>;

/// Response body of `/upload` and `/upload-shop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Status line
    pub message: String,
    /// Stored GLTF filename
    pub gltf_file: String,
    /// Stored BIN filename
    pub bin_file: String,
    /// Stored texture filenames
    pub texture_files: Vec<String>,
}

/// Response body of `/upload-product`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUploadResponse {
    /// Status line
    pub message: String,
    /// The registered product
    pub product: ModelEntry,
}

/// Response body of the save endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    /// Status line
    pub message: String,
    /// Number of records written
    pub count: usize,
}
