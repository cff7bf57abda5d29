//! Unified (cgroup v2) hierarchy driver.
//!
//! All controllers share one mountpoint. Before a new cgroup may use a
//! controller, every ancestor on the path from the mountpoint down to
//! its parent must list that controller in `cgroup.subtree_control`, so
//! directory creation walks the whole ancestor chain and enables the
//! required controllers idempotently at each level.

use std::path::{Path, PathBuf};

use carton_common::constants;
use carton_common::error::{CartonError, Result};

/// Controllers this runtime enables on the unified hierarchy.
const REQUIRED_CONTROLLERS: [&str; 3] = ["cpu", "cpuset", "memory"];

/// Driver for the single cgroup v2 mountpoint.
#[derive(Debug, Clone)]
pub struct UnifiedHierarchy {
    mountpoint: PathBuf,
}

impl UnifiedHierarchy {
    /// Creates a driver for the host's unified mountpoint.
    #[must_use]
    pub fn host() -> Self {
        Self::at(constants::CGROUP_UNIFIED_MOUNTPOINT)
    }

    /// Creates a driver rooted at an explicit mountpoint.
    #[must_use]
    pub fn at(mountpoint: impl Into<PathBuf>) -> Self {
        Self {
            mountpoint: mountpoint.into(),
        }
    }

    /// Returns the hierarchy mountpoint.
    #[must_use]
    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }

    /// Resolves the cgroup directory for `id`, creating it and enabling
    /// the required controllers on first use when `create` is set. An
    /// empty `id` addresses the hierarchy root.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for an id that would escape the
    /// mountpoint, or an error if directory creation or controller
    /// enablement fails.
    pub fn cgroup_path(&self, id: &str, create: bool) -> Result<PathBuf> {
        super::validate_id(id)?;
        let path = self.mountpoint.join(id);
        if !create || id.is_empty() || path.exists() {
            return Ok(path);
        }

        std::fs::create_dir_all(&path).map_err(|e| CartonError::Io {
            path: path.clone(),
            source: e,
        })?;
        self.enable_controllers(&path)?;
        tracing::debug!(path = %path.display(), "unified cgroup created");
        Ok(path)
    }

    /// Enables the required controllers for a freshly created cgroup.
    ///
    /// Walks every ancestor between the mountpoint and the cgroup's
    /// parent (inclusive), appending `+<controller>` to each level's
    /// `cgroup.subtree_control` for any controller not already listed,
    /// then writes the combined enablement to the cgroup's own
    /// `cgroup.subtree_control`.
    fn enable_controllers(&self, cgroup: &Path) -> Result<()> {
        let relative = cgroup
            .strip_prefix(&self.mountpoint)
            .map_err(|_| CartonError::Hierarchy {
                subsystem: "unified",
                message: format!("{} is outside the unified mountpoint", cgroup.display()),
            })?;

        let mut ancestor = self.mountpoint.clone();
        ensure_subtree_controllers(&ancestor)?;
        for component in relative.iter().take(relative.iter().count() - 1) {
            ancestor.push(component);
            ensure_subtree_controllers(&ancestor)?;
        }

        let own = cgroup.join(constants::CGROUP_SUBTREE_CONTROL);
        let combined = REQUIRED_CONTROLLERS
            .iter()
            .map(|c| format!("+{c}"))
            .collect::<Vec<_>>()
            .join(" ");
        std::fs::write(&own, combined).map_err(|e| CartonError::Hierarchy {
            subsystem: "unified",
            message: format!("writing {}: {e}", own.display()),
        })
    }
}

impl Default for UnifiedHierarchy {
    fn default() -> Self {
        Self::host()
    }
}

/// Idempotently enables the required controllers in one ancestor's
/// `cgroup.subtree_control`.
fn ensure_subtree_controllers(dir: &Path) -> Result<()> {
    use std::io::Write as _;

    let control = dir.join(constants::CGROUP_SUBTREE_CONTROL);
    let listed = match std::fs::read_to_string(&control) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(CartonError::Hierarchy {
                subsystem: "unified",
                message: format!("reading {}: {e}", control.display()),
            })
        }
    };

    for controller in REQUIRED_CONTROLLERS {
        if lists_controller(&listed, controller) {
            continue;
        }
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&control)
            .map_err(|e| CartonError::Hierarchy {
                subsystem: controller,
                message: format!("opening {}: {e}", control.display()),
            })?;
        writeln!(file, "+{controller}").map_err(|e| CartonError::Hierarchy {
            subsystem: controller,
            message: format!("enabling {controller} in {}: {e}", control.display()),
        })?;
        tracing::debug!(controller, path = %control.display(), "controller enabled");
    }
    Ok(())
}

/// Checks whether a control file's space-separated token list contains
/// the controller name. Token equality avoids false positives between
/// controller names that are substrings of each other.
#[must_use]
pub fn lists_controller(content: &str, controller: &str) -> bool {
    content.split_whitespace().any(|token| token == controller)
}
