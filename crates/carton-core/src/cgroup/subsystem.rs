//! Resource subsystems and limit-string translation.
//!
//! Each subsystem knows its controller name, its limit control file on
//! both hierarchy models, and how to translate the human-readable limit
//! string from a [`ResourceConfig`] into the value the kernel expects.

use carton_common::error::{CartonError, Result};
use carton_common::types::ResourceConfig;

/// Which kernel control-group model a hierarchy driver speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupVersion {
    /// Per-controller mount layout (cgroup v1).
    Legacy,
    /// Single mountpoint with per-path enablement (cgroup v2).
    Unified,
}

/// A resource controller applied to a container's cgroup.
///
/// The variant set is closed and exhaustively matched at every call
/// site; adding a controller means extending every match below.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subsystem {
    /// Hard memory limit.
    Memory,
    /// Relative CPU time share under contention.
    CpuShare,
    /// CPU core affinity set.
    CpuSet,
}

impl Subsystem {
    /// All subsystems, in the order they are applied.
    pub const ALL: [Self; 3] = [Self::Memory, Self::CpuShare, Self::CpuSet];

    /// Kernel controller name, as it appears in mount options and in
    /// `cgroup.subtree_control`.
    #[must_use]
    pub fn controller(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::CpuShare => "cpu",
            Self::CpuSet => "cpuset",
        }
    }

    /// Control file the limit value is written to.
    #[must_use]
    pub fn limit_file(self, version: CgroupVersion) -> &'static str {
        match (self, version) {
            (Self::Memory, CgroupVersion::Legacy) => "memory.limit_in_bytes",
            (Self::Memory, CgroupVersion::Unified) => "memory.max",
            (Self::CpuShare, CgroupVersion::Legacy) => "cpu.shares",
            (Self::CpuShare, CgroupVersion::Unified) => "cpu.weight",
            (Self::CpuSet, _) => "cpuset.cpus",
        }
    }

    /// Translates this subsystem's field of `cfg` into the raw value
    /// written to the limit file. `Ok(None)` means the dimension is
    /// unconstrained and the write is skipped.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error for a malformed memory limit string.
    pub fn limit_value(self, cfg: &ResourceConfig) -> Result<Option<String>> {
        match self {
            Self::Memory => cfg
                .memory_limit
                .as_deref()
                .map(|s| parse_memory_limit(s).map(|bytes| bytes.to_string()))
                .transpose(),
            // Share and cpuset strings pass through verbatim.
            Self::CpuShare => Ok(cfg.cpu_share.clone()),
            Self::CpuSet => Ok(cfg.cpu_set.clone()),
        }
    }
}

/// Parses a memory limit string into a raw byte count.
///
/// The format is an integer with an optional case-insensitive magnitude
/// suffix (`k`, `m`, `g`) denoting 1024-based multiples; a bare integer
/// is a byte count.
///
/// # Errors
///
/// Returns a `Config` error when the string is empty, the integer part
/// is missing or unparseable, or the suffix is unknown.
pub fn parse_memory_limit(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let malformed = || CartonError::Config {
        message: format!("malformed memory limit {input:?}"),
    };

    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((idx, suffix)) if suffix.is_ascii_alphabetic() => {
            let factor: u64 = match suffix.to_ascii_lowercase() {
                'k' => 1024,
                'm' => 1024 * 1024,
                'g' => 1024 * 1024 * 1024,
                _ => return Err(malformed()),
            };
            (&trimmed[..idx], factor)
        }
        Some(_) => (trimmed, 1),
        None => return Err(malformed()),
    };

    let base: u64 = digits.parse().map_err(|_| malformed())?;
    base.checked_mul(multiplier).ok_or_else(malformed)
}
