//! System-wide constants and default paths.

/// Unified (cgroup v2) hierarchy mount point.
pub const CGROUP_UNIFIED_MOUNTPOINT: &str = "/sys/fs/cgroup";

/// Mount metadata consulted for legacy (cgroup v1) mountpoint discovery.
pub const PROC_SELF_MOUNTINFO: &str = "/proc/self/mountinfo";

/// Marker file whose presence identifies a unified hierarchy mountpoint.
pub const CGROUP_CONTROLLERS_FILE: &str = "cgroup.controllers";

/// Per-cgroup controller enablement file on the unified hierarchy.
pub const CGROUP_SUBTREE_CONTROL: &str = "cgroup.subtree_control";

/// Process membership file on the unified hierarchy.
pub const CGROUP_PROCS_FILE: &str = "cgroup.procs";

/// Process membership file on legacy hierarchies.
pub const CGROUP_TASKS_FILE: &str = "tasks";

/// Default base directory for Carton data.
pub const DEFAULT_DATA_DIR: &str = "/var/lib/carton";

/// File name of a persisted container record.
pub const RECORD_FILE_NAME: &str = "config.json";

/// File name of a container's captured log output.
pub const LOG_FILE_NAME: &str = "container.log";

/// Extension used for image archives in the image directory.
pub const IMAGE_ARCHIVE_EXT: &str = "tar";
