//! On-disk path layout for container workspaces and images.
//!
//! All components receive a [`Layout`] at construction instead of reading
//! global path state, so tests can point the whole runtime at temporary
//! directories.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants;
use crate::types::ContainerId;

/// Resolved directory layout for a Carton installation.
///
/// Per-container overlay directories live under
/// `<root_dir>/<container-id>/{lower,upper,work,merged}` and image
/// archives under `<image_dir>/<name>.tar`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    /// Base directory holding one subdirectory per container.
    pub root_dir: PathBuf,
    /// Directory holding image tar archives.
    pub image_dir: PathBuf,
    /// Directory holding container records and logs.
    pub state_dir: PathBuf,
}

impl Layout {
    /// Creates a layout rooted at the given base directory, using the
    /// conventional `overlay/`, `images/`, and `containers/` subtrees.
    #[must_use]
    pub fn rooted_at(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            root_dir: base.join("overlay"),
            image_dir: base.join("images"),
            state_dir: base.join("containers"),
        }
    }

    /// Per-container root directory.
    #[must_use]
    pub fn container_root(&self, id: &ContainerId) -> PathBuf {
        self.root_dir.join(id.as_str())
    }

    /// Read-only base layer directory of a container's overlay.
    #[must_use]
    pub fn lower_dir(&self, id: &ContainerId) -> PathBuf {
        self.container_root(id).join("lower")
    }

    /// Writable layer directory of a container's overlay.
    #[must_use]
    pub fn upper_dir(&self, id: &ContainerId) -> PathBuf {
        self.container_root(id).join("upper")
    }

    /// Kernel scratch directory required by the overlay mount.
    #[must_use]
    pub fn work_dir(&self, id: &ContainerId) -> PathBuf {
        self.container_root(id).join("work")
    }

    /// Union mount point of a container's overlay.
    #[must_use]
    pub fn merged_dir(&self, id: &ContainerId) -> PathBuf {
        self.container_root(id).join("merged")
    }

    /// Path of a named image archive.
    #[must_use]
    pub fn image_archive(&self, image_name: &str) -> PathBuf {
        self.image_dir
            .join(format!("{image_name}.{}", constants::IMAGE_ARCHIVE_EXT))
    }

    /// Directory holding a container's persisted record and log.
    #[must_use]
    pub fn record_dir(&self, id: &ContainerId) -> PathBuf {
        self.state_dir.join(id.as_str())
    }

    /// Path of a container's persisted record file.
    #[must_use]
    pub fn record_file(&self, id: &ContainerId) -> PathBuf {
        self.record_dir(id).join(constants::RECORD_FILE_NAME)
    }

    /// Path of a container's log file.
    #[must_use]
    pub fn log_file(&self, id: &ContainerId) -> PathBuf {
        self.record_dir(id).join(constants::LOG_FILE_NAME)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self::rooted_at(constants::DEFAULT_DATA_DIR)
    }
}
