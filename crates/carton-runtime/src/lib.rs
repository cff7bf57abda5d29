//! # carton-runtime
//!
//! Overlay workspace lifecycle for the Carton runtime.
//!
//! Builds a container's union root filesystem from an image archive
//! (lower layer), a writable layer (upper + work), and a merged mount
//! point; optionally grafts a host directory into it as a volume; and
//! reverses every step in the correct order on teardown.
//!
//! Also carries the metadata glue around a container: persisted JSON
//! records and log file access.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod logs;
pub mod mount;
pub mod record;
pub mod volume;
pub mod workspace;

pub use mount::{Mounter, SystemMounter};
pub use volume::VolumeSpec;
pub use workspace::{Workspace, WorkspaceManager};
