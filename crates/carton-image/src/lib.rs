//! # carton-image
//!
//! Image archive handling for the Carton runtime.
//!
//! - **Manifest**: parses the `manifest.json` found at an image
//!   archive's root, which names the ordered layer archives.
//! - **Extraction**: unpacks a multi-layer image into a single lower
//!   directory with last-writer-wins layer precedence.
//! - **Commit**: packages a running container's merged rootfs back into
//!   an image archive.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod commit;
pub mod extract;
pub mod manifest;

pub use commit::commit_image;
pub use extract::unpack_image;
pub use manifest::ImageManifest;
