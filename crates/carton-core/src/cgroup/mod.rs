//! Cgroup resource management across both kernel hierarchy models.
//!
//! [`CgroupManager`] drives the memory, CPU-share, and cpuset subsystems
//! against a [`HierarchyDriver`], which is either the legacy
//! per-controller layout or the unified single-mountpoint layout.

pub mod legacy;
pub mod subsystem;
pub mod unified;

use std::path::{Path, PathBuf};

use carton_common::constants;
use carton_common::error::{CartonError, CleanupReport, Result};
use carton_common::types::ResourceConfig;

pub use legacy::LegacyHierarchy;
pub use subsystem::{CgroupVersion, Subsystem};
pub use unified::UnifiedHierarchy;

/// Hierarchy model the manager operates against.
#[derive(Debug, Clone)]
pub enum HierarchyDriver {
    /// Per-controller mountpoints (cgroup v1).
    Legacy(LegacyHierarchy),
    /// Single unified mountpoint (cgroup v2).
    Unified(UnifiedHierarchy),
}

impl HierarchyDriver {
    /// Detects the hierarchy model of the host.
    ///
    /// The unified mountpoint is identified by the presence of its
    /// `cgroup.controllers` file; anything else falls back to legacy
    /// discovery.
    #[must_use]
    pub fn detect() -> Self {
        let marker = Path::new(constants::CGROUP_UNIFIED_MOUNTPOINT)
            .join(constants::CGROUP_CONTROLLERS_FILE);
        if marker.exists() {
            Self::Unified(UnifiedHierarchy::host())
        } else {
            Self::Legacy(LegacyHierarchy::discover())
        }
    }

    /// Which control-group model this driver speaks.
    #[must_use]
    pub fn version(&self) -> CgroupVersion {
        match self {
            Self::Legacy(_) => CgroupVersion::Legacy,
            Self::Unified(_) => CgroupVersion::Unified,
        }
    }

    /// Resolves the cgroup directory `id` maps to for one subsystem.
    fn resolve(&self, subsystem: Subsystem, id: &str, create: bool) -> Result<PathBuf> {
        match self {
            Self::Legacy(driver) => driver.cgroup_path(subsystem.controller(), id, create),
            Self::Unified(driver) => driver.cgroup_path(id, create),
        }
    }

    /// Process-membership files `pid` must be written to for `id`.
    ///
    /// The unified hierarchy has a single shared path; legacy
    /// hierarchies need one write per controller mountpoint.
    fn membership_files(&self, id: &str, create: bool) -> Result<Vec<PathBuf>> {
        match self {
            Self::Legacy(driver) => Subsystem::ALL
                .iter()
                .map(|sub| {
                    driver
                        .cgroup_path(sub.controller(), id, create)
                        .map(|p| p.join(constants::CGROUP_TASKS_FILE))
                })
                .collect(),
            Self::Unified(driver) => Ok(vec![driver
                .cgroup_path(id, create)?
                .join(constants::CGROUP_PROCS_FILE)]),
        }
    }

    /// Cgroup directories removed when `id` is destroyed.
    fn owned_dirs(&self, id: &str) -> Vec<Result<PathBuf>> {
        match self {
            Self::Legacy(driver) => Subsystem::ALL
                .iter()
                .map(|sub| driver.cgroup_path(sub.controller(), id, false))
                .collect(),
            Self::Unified(driver) => vec![driver.cgroup_path(id, false)],
        }
    }
}

/// Rejects identifiers that would resolve outside a hierarchy
/// mountpoint: an absolute path replaces the mountpoint entirely under
/// `Path::join`, and `..` components climb out of it.
pub(crate) fn validate_id(id: &str) -> Result<()> {
    let path = Path::new(id);
    if path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(CartonError::Config {
            message: format!("invalid cgroup id {id:?}: must be a relative path without `..`"),
        });
    }
    Ok(())
}

/// Orchestrates resource subsystems for one container's cgroup.
#[derive(Debug)]
pub struct CgroupManager {
    /// Cgroup name, unique per running container. Empty addresses the
    /// hierarchy root.
    id: String,
    driver: HierarchyDriver,
}

impl CgroupManager {
    /// Creates a manager for `id` against the host's detected hierarchy.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_driver(id, HierarchyDriver::detect())
    }

    /// Creates a manager against an explicit hierarchy driver.
    #[must_use]
    pub fn with_driver(id: impl Into<String>, driver: HierarchyDriver) -> Self {
        Self {
            id: id.into(),
            driver,
        }
    }

    /// Returns the cgroup identifier this manager owns.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Writes the limits present in `config` into each subsystem's
    /// control file, creating the cgroup directory on first use.
    ///
    /// Absent fields are skipped; a failure is fatal to container
    /// startup and carries the subsystem and path it happened at.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for a malformed limit string, or a
    /// `Hierarchy`/`Io` error when the cgroup path cannot be prepared
    /// or written.
    pub fn set(&self, config: &ResourceConfig) -> Result<()> {
        let version = self.driver.version();
        for subsystem in Subsystem::ALL {
            let Some(value) = subsystem.limit_value(config)? else {
                continue;
            };
            let dir = self.driver.resolve(subsystem, &self.id, true)?;
            let file = dir.join(subsystem.limit_file(version));
            std::fs::write(&file, &value).map_err(|e| CartonError::Io {
                path: file.clone(),
                source: e,
            })?;
            tracing::info!(
                cgroup = %self.id,
                subsystem = subsystem.controller(),
                value,
                "resource limit set"
            );
        }
        Ok(())
    }

    /// Moves `pid` (and, per kernel semantics, its threads) into this
    /// cgroup by writing it to the process-membership file(s).
    ///
    /// An empty cgroup identifier resolves to the hierarchy root,
    /// releasing the process from any specific limit.
    ///
    /// # Errors
    ///
    /// Returns an error if a membership file cannot be resolved or
    /// written; such a failure is fatal to container startup.
    pub fn apply(&self, pid: u32) -> Result<()> {
        for file in self.driver.membership_files(&self.id, true)? {
            std::fs::write(&file, pid.to_string()).map_err(|e| CartonError::Io {
                path: file.clone(),
                source: e,
            })?;
        }
        tracing::info!(cgroup = %self.id, pid, "process applied to cgroup");
        Ok(())
    }

    /// Removes this container's cgroup directories, best-effort.
    ///
    /// A directory that is already absent is a no-op success. A
    /// directory the kernel refuses to delete (a still-populated
    /// cgroup) is recorded in the report, and the remaining removals
    /// still run. The hierarchy root (empty id) is never removed.
    #[must_use]
    pub fn destroy(&self) -> CleanupReport {
        let mut report = CleanupReport::new();
        if self.id.is_empty() {
            return report;
        }
        for resolved in self.driver.owned_dirs(&self.id) {
            let dir = match resolved {
                Ok(dir) => dir,
                Err(e) => {
                    report.record(e);
                    continue;
                }
            };
            if !dir.exists() {
                continue;
            }
            // rmdir, not a recursive delete: the kernel rejects removal
            // of a cgroup that still has member processes, and that
            // rejection must surface.
            if let Err(e) = std::fs::remove_dir(&dir) {
                report.record(CartonError::Io {
                    path: dir.clone(),
                    source: e,
                });
            } else {
                tracing::info!(path = %dir.display(), "cgroup removed");
            }
        }
        report
    }
}
