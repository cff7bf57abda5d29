//! # carton-core
//!
//! Cgroup resource control for the Carton runtime.
//!
//! Works uniformly across the two incompatible kernel control-group
//! models:
//! - **Legacy hierarchies** (cgroup v1): one mountpoint per controller,
//!   discovered from `/proc/self/mountinfo`.
//! - **Unified hierarchy** (cgroup v2): a single mountpoint with
//!   per-path controller enablement through `cgroup.subtree_control`.
//!
//! The [`cgroup::CgroupManager`] orchestrates the memory, CPU-share, and
//! cpuset subsystems against whichever hierarchy the host runs.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod cgroup;
