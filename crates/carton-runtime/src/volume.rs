//! Host-directory volumes grafted into a container's merged rootfs.

use std::path::{Path, PathBuf};

use carton_common::error::{CartonError, Result};

use crate::mount::Mounter;

/// A parsed `host:container` volume specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    /// Host-side directory that is exposed inside the container.
    pub host_path: PathBuf,
    /// Container-side path, interpreted relative to the merged rootfs.
    pub container_path: PathBuf,
}

impl VolumeSpec {
    /// Parses a `host:container` specification.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error unless splitting on `:` yields exactly
    /// two non-empty components.
    pub fn parse(spec: &str) -> Result<Self> {
        let mut parts = spec.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(host), Some(container), None) if !host.is_empty() && !container.is_empty() => {
                Ok(Self {
                    host_path: PathBuf::from(host),
                    container_path: PathBuf::from(container),
                })
            }
            _ => Err(CartonError::Config {
                message: format!("invalid volume {spec:?}, expected \"host:container\""),
            }),
        }
    }

    /// Resolves the container-side path under the merged rootfs.
    #[must_use]
    pub fn target_in(&self, merged_root: &Path) -> PathBuf {
        let relative = self
            .container_path
            .strip_prefix("/")
            .unwrap_or(&self.container_path);
        merged_root.join(relative)
    }
}

/// Creates the container-side directory under `merged_root` if absent,
/// then bind-mounts the host directory onto it.
///
/// # Errors
///
/// Returns an error when the target directory cannot be created or the
/// bind mount fails.
pub fn mount_volume(mounter: &dyn Mounter, merged_root: &Path, spec: &VolumeSpec) -> Result<()> {
    let target = spec.target_in(merged_root);
    std::fs::create_dir_all(&target).map_err(|e| CartonError::Io {
        path: target.clone(),
        source: e,
    })?;
    mounter.bind_mount(&spec.host_path, &target)
}

/// Unmounts the volume's bind mount under `merged_root`.
///
/// # Errors
///
/// Returns an error when the unmount fails; callers treat this as a
/// recorded teardown failure, not a fatal one.
pub fn unmount_volume(mounter: &dyn Mounter, merged_root: &Path, spec: &VolumeSpec) -> Result<()> {
    mounter.unbind(&spec.target_in(merged_root))
}
