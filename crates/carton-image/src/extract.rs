//! Multi-layer image extraction.
//!
//! The image archive is unpacked whole into a scratch directory, its
//! manifest is read, and each listed layer tarball is then unpacked into
//! the lower directory in manifest order. Sequential extraction into the
//! shared directory gives last-writer-wins precedence, approximating
//! union-mount layering without nested mounts.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use carton_common::error::{CartonError, Result};

use crate::manifest;

/// Extracts an image archive into `lower_dir`.
///
/// Layer order is bottom-to-top: a later layer's file at a given path
/// overwrites an earlier layer's file at that same path.
///
/// On failure no partial extraction is cleaned up; the caller decides
/// whether the half-built lower directory is worth keeping.
///
/// # Errors
///
/// Returns an `Extraction` error when the archive, its manifest, or any
/// listed layer cannot be read, parsed, or unpacked.
pub fn unpack_image(archive: &Path, lower_dir: &Path) -> Result<()> {
    let scratch = tempfile::tempdir().map_err(|e| CartonError::Extraction {
        path: archive.to_path_buf(),
        message: format!("creating scratch directory: {e}"),
    })?;

    tracing::info!(
        archive = %archive.display(),
        lower = %lower_dir.display(),
        "extracting image"
    );
    unpack_tar(archive, scratch.path())?;

    let manifest = manifest::read_manifest(scratch.path())?;
    tracing::debug!(layers = manifest.layers.len(), "manifest parsed");

    std::fs::create_dir_all(lower_dir).map_err(|e| CartonError::Io {
        path: lower_dir.to_path_buf(),
        source: e,
    })?;

    for (index, layer) in manifest.layers.iter().enumerate() {
        let layer_path = scratch.path().join(layer);
        if !layer_path.exists() {
            return Err(CartonError::Extraction {
                path: layer_path,
                message: format!("layer {layer} listed in manifest but absent from archive"),
            });
        }
        tracing::debug!(index, layer, "unpacking layer");
        unpack_tar(&layer_path, lower_dir)?;
    }

    tracing::info!(lower = %lower_dir.display(), "image extracted");
    Ok(())
}

/// Unpacks one tar archive (gzip-compressed or plain) into `target`.
///
/// Compression is detected from the gzip magic bytes rather than the
/// file name, since committed images keep the `.tar` extension while
/// being gzip-compressed.
fn unpack_tar(archive: &Path, target: &Path) -> Result<()> {
    let extraction_err = |message: String| CartonError::Extraction {
        path: archive.to_path_buf(),
        message,
    };

    let mut file = File::open(archive).map_err(|e| extraction_err(format!("opening: {e}")))?;
    let mut magic = [0_u8; 2];
    let read = file
        .read(&mut magic)
        .map_err(|e| extraction_err(format!("reading header: {e}")))?;
    let is_gzip = read == 2 && magic == [0x1f, 0x8b];

    let file = File::open(archive).map_err(|e| extraction_err(format!("reopening: {e}")))?;
    if is_gzip {
        let decoder = flate2::read::GzDecoder::new(file);
        tar::Archive::new(decoder)
            .unpack(target)
            .map_err(|e| extraction_err(format!("unpacking: {e}")))?;
    } else {
        tar::Archive::new(file)
            .unpack(target)
            .map_err(|e| extraction_err(format!("unpacking: {e}")))?;
    }
    Ok(())
}
