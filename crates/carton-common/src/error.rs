//! Unified error types for the Carton workspace.
//!
//! Setup-path failures (resource limits, overlay build) propagate through
//! [`Result`] and abort container startup. Teardown paths are best-effort
//! and collect their sub-step failures into a [`CleanupReport`] instead of
//! stopping at the first error.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum CartonError {
    /// An I/O operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid (malformed limit string, bad
    /// volume specification, unsupported platform).
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// A cgroup hierarchy could not be resolved or prepared.
    #[error("cgroup hierarchy error for subsystem {subsystem}: {message}")]
    Hierarchy {
        /// Controller name the failure relates to.
        subsystem: &'static str,
        /// Description of the failure.
        message: String,
    },

    /// A mount or unmount operation failed.
    #[error("mount error at {target}: {message}")]
    Mount {
        /// Mount target the operation was directed at.
        target: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// An image archive, its manifest, or one of its layers could not
    /// be read or parsed.
    #[error("image extraction error at {path}: {message}")]
    Extraction {
        /// Archive or layer path involved.
        path: PathBuf,
        /// Description of the failure.
        message: String,
    },

    /// A required resource was not found.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Type of the missing resource.
        kind: &'static str,
        /// Identifier of the missing resource.
        id: String,
    },

    /// Serialization or deserialization failed.
    #[error("serialization error: {source}")]
    Serialization {
        /// Underlying serialization error.
        #[from]
        source: serde_json::Error,
    },
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CartonError>;

/// Outcome of a best-effort teardown pass.
///
/// Each sub-step that fails pushes its error here; the caller can log,
/// inspect, or assert on the collected failures. An empty report means
/// every step succeeded.
#[derive(Debug, Default)]
pub struct CleanupReport {
    /// Failures recorded during teardown, in the order they occurred.
    pub failures: Vec<CartonError>,
}

impl CleanupReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a sub-step failure.
    pub fn record(&mut self, err: CartonError) {
        tracing::warn!(error = %err, "teardown step failed");
        self.failures.push(err);
    }

    /// Returns `true` when no sub-step failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Merges another report's failures into this one.
    pub fn absorb(&mut self, other: Self) {
        self.failures.extend(other.failures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_is_clean() {
        assert!(CleanupReport::new().is_clean());
    }

    #[test]
    fn recorded_failure_is_retained() {
        let mut report = CleanupReport::new();
        report.record(CartonError::Config {
            message: "bad".into(),
        });
        assert!(!report.is_clean());
        assert_eq!(report.failures.len(), 1);
    }

    #[test]
    fn absorb_merges_failures() {
        let mut a = CleanupReport::new();
        a.record(CartonError::Config {
            message: "first".into(),
        });
        let mut b = CleanupReport::new();
        b.record(CartonError::Config {
            message: "second".into(),
        });
        a.absorb(b);
        assert_eq!(a.failures.len(), 2);
    }
}
