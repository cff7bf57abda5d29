//! Image commit: packaging a merged rootfs into an image archive.

use std::fs::File;
use std::path::Path;

use carton_common::error::{CartonError, Result};

/// Packages the contents of `merged_dir` into a gzip-compressed tar
/// archive at `archive_path`.
///
/// Refuses to overwrite an existing archive so a commit cannot clobber
/// a published image.
///
/// # Errors
///
/// Returns a `Config` error when the target archive already exists, or
/// an `Io` error when reading the rootfs or writing the archive fails.
pub fn commit_image(merged_dir: &Path, archive_path: &Path) -> Result<()> {
    if archive_path.exists() {
        return Err(CartonError::Config {
            message: format!("image archive {} already exists", archive_path.display()),
        });
    }
    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| CartonError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    let io_err = |path: &Path, source: std::io::Error| CartonError::Io {
        path: path.to_path_buf(),
        source,
    };

    let file = File::create(archive_path).map_err(|e| io_err(archive_path, e))?;
    let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder
        .append_dir_all(".", merged_dir)
        .map_err(|e| io_err(merged_dir, e))?;
    let encoder = builder.into_inner().map_err(|e| io_err(archive_path, e))?;
    let _ = encoder.finish().map_err(|e| io_err(archive_path, e))?;

    tracing::info!(
        rootfs = %merged_dir.display(),
        archive = %archive_path.display(),
        "image committed"
    );
    Ok(())
}
