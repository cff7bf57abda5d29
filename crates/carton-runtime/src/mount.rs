//! Mount command abstraction.
//!
//! The overlay mount and unmount go through the host `mount`/`umount`
//! utilities; volume bind mounts use the `mount(2)` syscall directly.
//! Everything is behind the [`Mounter`] trait so tests can substitute a
//! recording double and assert on call ordering.

use std::path::Path;
use std::process::Command;

use carton_common::error::{CartonError, Result};

/// Performs the mount operations of a container workspace.
pub trait Mounter {
    /// Mounts an overlay union at `merged` from the three backing
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns a `Mount` error when the mount cannot be established.
    fn mount_overlay(&self, lower: &Path, upper: &Path, work: &Path, merged: &Path) -> Result<()>;

    /// Unmounts the overlay at `merged`.
    ///
    /// # Errors
    ///
    /// Returns a `Mount` error when the unmount fails (e.g. the mount
    /// is busy).
    fn unmount_overlay(&self, merged: &Path) -> Result<()>;

    /// Forced unmount fallback for a busy overlay mount.
    ///
    /// # Errors
    ///
    /// Returns a `Mount` error when even the forced unmount fails.
    fn unmount_overlay_forced(&self, merged: &Path) -> Result<()>;

    /// Bind-mounts `source` onto `target`.
    ///
    /// # Errors
    ///
    /// Returns a `Mount` error when the bind mount fails.
    fn bind_mount(&self, source: &Path, target: &Path) -> Result<()>;

    /// Unmounts a bind mount at `target`.
    ///
    /// # Errors
    ///
    /// Returns a `Mount` error when the unmount fails.
    fn unbind(&self, target: &Path) -> Result<()>;
}

/// Production mounter backed by the host utilities and `nix`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMounter;

impl SystemMounter {
    fn run(target: &Path, command: &mut Command) -> Result<()> {
        let output = command.output().map_err(|e| CartonError::Mount {
            target: target.to_path_buf(),
            message: format!("spawning {:?}: {e}", command.get_program()),
        })?;
        if !output.status.success() {
            return Err(CartonError::Mount {
                target: target.to_path_buf(),
                message: format!(
                    "{:?} exited with {}: {}",
                    command.get_program(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }
        Ok(())
    }
}

impl Mounter for SystemMounter {
    fn mount_overlay(&self, lower: &Path, upper: &Path, work: &Path, merged: &Path) -> Result<()> {
        let options = format!(
            "lowerdir={},upperdir={},workdir={}",
            lower.display(),
            upper.display(),
            work.display()
        );
        tracing::info!(merged = %merged.display(), options, "mounting overlay");
        Self::run(
            merged,
            Command::new("mount")
                .args(["-t", "overlay", "overlay", "-o"])
                .arg(&options)
                .arg(merged),
        )
    }

    fn unmount_overlay(&self, merged: &Path) -> Result<()> {
        tracing::info!(merged = %merged.display(), "unmounting overlay");
        Self::run(merged, Command::new("umount").arg(merged))
    }

    fn unmount_overlay_forced(&self, merged: &Path) -> Result<()> {
        tracing::warn!(merged = %merged.display(), "forcing overlay unmount");
        Self::run(merged, Command::new("umount").arg("-f").arg(merged))
    }

    #[cfg(target_os = "linux")]
    fn bind_mount(&self, source: &Path, target: &Path) -> Result<()> {
        use nix::mount::{mount, MsFlags};

        tracing::info!(
            source = %source.display(),
            target = %target.display(),
            "bind-mounting volume"
        );
        mount(
            Some(source),
            target,
            None::<&str>,
            MsFlags::MS_BIND,
            None::<&str>,
        )
        .map_err(|e| CartonError::Mount {
            target: target.to_path_buf(),
            message: format!("bind mount from {} failed: {e}", source.display()),
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn bind_mount(&self, _source: &Path, target: &Path) -> Result<()> {
        Err(CartonError::Mount {
            target: target.to_path_buf(),
            message: "Linux required for bind mounts".into(),
        })
    }

    #[cfg(target_os = "linux")]
    fn unbind(&self, target: &Path) -> Result<()> {
        tracing::info!(target = %target.display(), "unmounting volume");
        nix::mount::umount(target).map_err(|e| CartonError::Mount {
            target: target.to_path_buf(),
            message: format!("unmount failed: {e}"),
        })
    }

    #[cfg(not(target_os = "linux"))]
    fn unbind(&self, target: &Path) -> Result<()> {
        Err(CartonError::Mount {
            target: target.to_path_buf(),
            message: "Linux required for bind mounts".into(),
        })
    }
}
