//! Domain primitive types used across the Carton workspace.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unique identifier for a container instance.
///
/// An empty identifier is legal in cgroup operations and addresses the
/// hierarchy root, which is how a process is released from isolation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerId(String);

impl ContainerId {
    /// Creates a container ID from a string value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a random container ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Returns the inner string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resource limits requested for a container's cgroup.
///
/// Values are human-readable limit strings interpreted per subsystem
/// (`"1000m"` for memory, `"512"` for CPU shares, `"0-1"` for a cpuset).
/// An absent field means that dimension stays unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Memory limit string, e.g. `"1000m"` or `"2g"`.
    pub memory_limit: Option<String>,
    /// Relative CPU share as a raw integer string.
    pub cpu_share: Option<String>,
    /// CPU core list or range string, e.g. `"0-1"` or `"0,2"`.
    pub cpu_set: Option<String>,
}

impl ResourceConfig {
    /// Returns `true` when no dimension is constrained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.memory_limit.is_none() && self.cpu_share.is_none() && self.cpu_set.is_none()
    }
}

/// Lifecycle state of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerState {
    /// Container has been created but not yet started.
    Created,
    /// Container is actively running.
    Running,
    /// Container has been stopped.
    Stopped,
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}
