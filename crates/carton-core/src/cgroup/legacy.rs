//! Legacy (cgroup v1) hierarchy driver.
//!
//! On v1 every controller has its own mountpoint. The driver discovers
//! them by scanning `/proc/self/mountinfo` for `cgroup` filesystem
//! entries whose superblock options list the controller name, and caches
//! the result per controller for the process lifetime (the kernel mount
//! table is assumed stable).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use carton_common::constants;
use carton_common::error::{CartonError, Result};

fn mount_cache() -> &'static Mutex<HashMap<String, PathBuf>> {
    static CACHE: OnceLock<Mutex<HashMap<String, PathBuf>>> = OnceLock::new();
    CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Driver for per-controller cgroup v1 mountpoints.
#[derive(Debug, Clone, Default)]
pub struct LegacyHierarchy {
    /// Fixed controller-to-mountpoint table for tests; `None` means
    /// discover from the host mount table.
    fixed_mounts: Option<HashMap<String, PathBuf>>,
}

impl LegacyHierarchy {
    /// Creates a driver that discovers mountpoints from the host.
    #[must_use]
    pub fn discover() -> Self {
        Self { fixed_mounts: None }
    }

    /// Creates a driver with a fixed mountpoint table, bypassing host
    /// discovery and the process-wide cache.
    #[must_use]
    pub fn with_mounts(mounts: HashMap<String, PathBuf>) -> Self {
        Self {
            fixed_mounts: Some(mounts),
        }
    }

    /// Resolves the mountpoint of the given controller.
    ///
    /// # Errors
    ///
    /// Returns a `Hierarchy` error when no mount entry carries the
    /// controller, or when the mount table cannot be read.
    pub fn mountpoint(&self, controller: &'static str) -> Result<PathBuf> {
        if let Some(mounts) = &self.fixed_mounts {
            return mounts
                .get(controller)
                .cloned()
                .ok_or_else(|| CartonError::Hierarchy {
                    subsystem: controller,
                    message: "no mountpoint configured".into(),
                });
        }

        if let Ok(cache) = mount_cache().lock() {
            if let Some(path) = cache.get(controller) {
                return Ok(path.clone());
            }
        }

        let content = std::fs::read_to_string(constants::PROC_SELF_MOUNTINFO).map_err(|e| {
            CartonError::Hierarchy {
                subsystem: controller,
                message: format!("reading mountinfo: {e}"),
            }
        })?;
        let path =
            find_controller_mount(&content, controller).ok_or_else(|| CartonError::Hierarchy {
                subsystem: controller,
                message: "controller mountpoint not found".into(),
            })?;

        if let Ok(mut cache) = mount_cache().lock() {
            let _ = cache.insert(controller.to_owned(), path.clone());
        }
        tracing::debug!(controller, path = %path.display(), "legacy mountpoint resolved");
        Ok(path)
    }

    /// Resolves the cgroup directory for `id` under the controller's
    /// mountpoint, creating it on first use when `create` is set. An
    /// empty `id` addresses the hierarchy root.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for an id that would escape the
    /// mountpoint, or an error if the mountpoint cannot be resolved or
    /// the directory cannot be created.
    pub fn cgroup_path(&self, controller: &'static str, id: &str, create: bool) -> Result<PathBuf> {
        super::validate_id(id)?;
        let path = self.mountpoint(controller)?.join(id);
        if create && !id.is_empty() && !path.exists() {
            std::fs::create_dir_all(&path).map_err(|e| CartonError::Io {
                path: path.clone(),
                source: e,
            })?;
            tracing::debug!(controller, path = %path.display(), "cgroup created");
        }
        Ok(path)
    }
}

/// Scans mountinfo content for a `cgroup` filesystem entry whose
/// superblock options list `controller` as a comma-separated token.
///
/// Mountinfo lines have the shape
/// `ID PARENT MAJ:MIN ROOT MOUNTPOINT OPTS [optional...] - FSTYPE SOURCE SUPEROPTS`.
fn find_controller_mount(mountinfo: &str, controller: &str) -> Option<PathBuf> {
    for line in mountinfo.lines() {
        let Some((mount_fields, fs_fields)) = line.split_once(" - ") else {
            continue;
        };
        let Some(mountpoint) = mount_fields.split_whitespace().nth(4) else {
            continue;
        };
        let mut fs_parts = fs_fields.split_whitespace();
        if fs_parts.next() != Some("cgroup") {
            continue;
        }
        let super_opts = fs_parts.nth(1).unwrap_or("");
        if super_opts.split(',').any(|opt| opt == controller) {
            return Some(PathBuf::from(mountpoint));
        }
    }
    None
}
