//! Container log file access.

use std::fs::OpenOptions;
use std::io::Write as _;

use carton_common::config::Layout;
use carton_common::error::{CartonError, Result};
use carton_common::types::ContainerId;

/// Reads a container's captured log output.
///
/// # Errors
///
/// Returns `NotFound` when the container has no log file, or an `Io`
/// error when it cannot be read.
pub fn read_logs(layout: &Layout, id: &ContainerId) -> Result<String> {
    let file = layout.log_file(id);
    std::fs::read_to_string(&file).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CartonError::NotFound {
                kind: "container log",
                id: id.to_string(),
            }
        } else {
            CartonError::Io { path: file, source: e }
        }
    })
}

/// Appends a line to a container's log file, creating it on first use.
///
/// # Errors
///
/// Returns an error when the log directory or file cannot be written.
pub fn append_log(layout: &Layout, id: &ContainerId, line: &str) -> Result<()> {
    let dir = layout.record_dir(id);
    std::fs::create_dir_all(&dir).map_err(|e| CartonError::Io {
        path: dir,
        source: e,
    })?;
    let path = layout.log_file(id);
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(&path)
        .map_err(|e| CartonError::Io {
            path: path.clone(),
            source: e,
        })?;
    writeln!(file, "{line}").map_err(|e| CartonError::Io { path, source: e })
}
