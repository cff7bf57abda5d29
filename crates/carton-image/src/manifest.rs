//! Image manifest parsing.
//!
//! An image archive's root contains `manifest.json`: a JSON array of
//! manifest objects. Only the first entry is consulted. Layer paths are
//! relative to the archive root and ordered bottom-to-top.

use std::path::Path;

use serde::{Deserialize, Serialize};

use carton_common::error::{CartonError, Result};

/// Name of the manifest file at the archive root.
pub const MANIFEST_FILE: &str = "manifest.json";

/// One entry of an image archive's `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageManifest {
    /// Path of the image configuration blob inside the archive.
    #[serde(rename = "Config")]
    pub config: String,
    /// Repository tags naming this image.
    #[serde(rename = "RepoTags", default)]
    pub repo_tags: Vec<String>,
    /// Archive-relative paths of the layer tarballs, bottom-to-top.
    #[serde(rename = "Layers")]
    pub layers: Vec<String>,
}

/// Reads and parses the first manifest entry from an unpacked archive
/// root.
///
/// # Errors
///
/// Returns an `Extraction` error when `manifest.json` is missing,
/// unparseable, or empty.
pub fn read_manifest(archive_root: &Path) -> Result<ImageManifest> {
    let manifest_path = archive_root.join(MANIFEST_FILE);
    let data = std::fs::read(&manifest_path).map_err(|e| CartonError::Extraction {
        path: manifest_path.clone(),
        message: format!("reading manifest: {e}"),
    })?;
    let mut entries: Vec<ImageManifest> =
        serde_json::from_slice(&data).map_err(|e| CartonError::Extraction {
            path: manifest_path.clone(),
            message: format!("parsing manifest: {e}"),
        })?;
    if entries.is_empty() {
        return Err(CartonError::Extraction {
            path: manifest_path,
            message: "manifest contains no entries".into(),
        });
    }
    Ok(entries.swap_remove(0))
}
