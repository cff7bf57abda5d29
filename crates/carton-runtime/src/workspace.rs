//! Overlay workspace build and teardown.
//!
//! A workspace moves through `lower prepared → dirs created → overlay
//! mounted → volume mounted` on build, and through the exact reverse on
//! teardown. The reverse order matters: the volume bind mount is layered
//! on top of the overlay mount point, so it must come off first, and no
//! directory may be removed while either mount is still active.

use std::path::PathBuf;

use carton_common::config::Layout;
use carton_common::error::{CartonError, CleanupReport, Result};
use carton_common::types::ContainerId;

use crate::mount::{Mounter, SystemMounter};
use crate::volume::{self, VolumeSpec};

/// A built container workspace: the four overlay directories plus the
/// optional volume grafted into the merged view.
///
/// The merged directory holds the kernel-computed union of lower and
/// upper only while the overlay mount is active.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Container this workspace belongs to.
    pub container_id: ContainerId,
    /// Image the lower layer was extracted from.
    pub image_name: String,
    /// Read-only base layer.
    pub lower_dir: PathBuf,
    /// Writable layer.
    pub upper_dir: PathBuf,
    /// Kernel scratch directory for the overlay mount.
    pub work_dir: PathBuf,
    /// Union mount point, used as the container's rootfs.
    pub merged_dir: PathBuf,
    /// Volume grafted into the merged view, if any.
    pub volume: Option<VolumeSpec>,
}

/// Builds and tears down container workspaces under a [`Layout`].
pub struct WorkspaceManager {
    layout: Layout,
    mounter: Box<dyn Mounter>,
}

impl WorkspaceManager {
    /// Creates a manager using the host mount utilities.
    #[must_use]
    pub fn new(layout: Layout) -> Self {
        Self::with_mounter(layout, Box::new(SystemMounter))
    }

    /// Creates a manager with an explicit mounter (tests use a
    /// recording double).
    #[must_use]
    pub fn with_mounter(layout: Layout, mounter: Box<dyn Mounter>) -> Self {
        Self { layout, mounter }
    }

    /// Builds the container's union rootfs.
    ///
    /// Steps, in order: parse the volume spec (fail fast, before any
    /// side effect), prepare the lower layer from the image archive if
    /// it does not exist yet, create the upper/work/merged directories,
    /// mount the overlay, and bind-mount the volume if one was given.
    ///
    /// # Errors
    ///
    /// Any step's failure aborts the build and must abort container
    /// startup. A failed image extraction leaves the partial lower
    /// directory in place.
    pub fn build(
        &self,
        container_id: &ContainerId,
        image_name: &str,
        volume: Option<&str>,
    ) -> Result<Workspace> {
        let volume = volume.map(VolumeSpec::parse).transpose()?;

        let lower_dir = self.layout.lower_dir(container_id);
        if lower_dir.exists() {
            tracing::debug!(lower = %lower_dir.display(), "lower layer already prepared");
        } else {
            let archive = self.layout.image_archive(image_name);
            if let Err(e) = carton_image::unpack_image(&archive, &lower_dir) {
                tracing::error!(
                    image = image_name,
                    lower = %lower_dir.display(),
                    error = %e,
                    "image extraction failed, leaving partial lower layer"
                );
                return Err(e);
            }
        }

        let upper_dir = self.layout.upper_dir(container_id);
        let work_dir = self.layout.work_dir(container_id);
        let merged_dir = self.layout.merged_dir(container_id);
        for dir in [&upper_dir, &work_dir, &merged_dir] {
            std::fs::create_dir_all(dir).map_err(|e| CartonError::Io {
                path: dir.clone(),
                source: e,
            })?;
        }

        self.mounter
            .mount_overlay(&lower_dir, &upper_dir, &work_dir, &merged_dir)?;

        if let Some(spec) = &volume {
            volume::mount_volume(self.mounter.as_ref(), &merged_dir, spec)?;
        }

        tracing::info!(id = %container_id, image = image_name, "workspace built");
        Ok(Workspace {
            container_id: container_id.clone(),
            image_name: image_name.to_owned(),
            lower_dir,
            upper_dir,
            work_dir,
            merged_dir,
            volume,
        })
    }

    /// Tears the workspace down in strict reverse build order,
    /// best-effort: volume unbind, overlay unmount (with one forced
    /// retry), then directory removal.
    ///
    /// Every sub-step failure is recorded in the report and never
    /// blocks the remaining steps, since stopping cleanup early
    /// guarantees resource leakage.
    #[must_use]
    pub fn teardown(&self, container_id: &ContainerId, volume: Option<&str>) -> CleanupReport {
        let mut report = CleanupReport::new();
        let merged_dir = self.layout.merged_dir(container_id);

        if let Some(raw) = volume {
            match VolumeSpec::parse(raw) {
                Ok(spec) => {
                    if let Err(e) =
                        volume::unmount_volume(self.mounter.as_ref(), &merged_dir, &spec)
                    {
                        report.record(e);
                    }
                }
                Err(e) => report.record(e),
            }
        }

        if merged_dir.exists() {
            if let Err(first) = self.mounter.unmount_overlay(&merged_dir) {
                tracing::warn!(
                    merged = %merged_dir.display(),
                    error = %first,
                    "overlay unmount failed, retrying forced"
                );
                if let Err(second) = self.mounter.unmount_overlay_forced(&merged_dir) {
                    report.record(first);
                    report.record(second);
                }
            }
        }

        for dir in [
            merged_dir,
            self.layout.upper_dir(container_id),
            self.layout.work_dir(container_id),
            self.layout.lower_dir(container_id),
            self.layout.container_root(container_id),
        ] {
            if !dir.exists() {
                continue;
            }
            if let Err(e) = std::fs::remove_dir_all(&dir) {
                report.record(CartonError::Io {
                    path: dir.clone(),
                    source: e,
                });
            }
        }

        tracing::info!(
            id = %container_id,
            clean = report.is_clean(),
            "workspace torn down"
        );
        report
    }
}
