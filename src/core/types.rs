/*!
 * Core Types
 * Capabilities, operation kinds, and path decisions
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Named dangerous capabilities that can be disabled for a scope's duration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Filesystem access. Never disabled outright; it is routed through
    /// path confinement instead.
    FileIo,
    /// Dynamic code evaluation (an eval-equivalent)
    DynamicEval,
    /// Dynamic compilation/execution of a code block (an exec-equivalent)
    DynamicExec,
    /// Process/subprocess spawning
    ProcessSpawn,
}

impl Capability {
    #[inline]
    #[must_use]
    pub const fn bit(self) -> u8 {
        match self {
            Capability::FileIo => 1 << 0,
            Capability::DynamicEval => 1 << 1,
            Capability::DynamicExec => 1 << 2,
            Capability::ProcessSpawn => 1 << 3,
        }
    }

    /// The capabilities a scope disables on entry
    #[must_use]
    pub const fn dangerous() -> CapabilitySet {
        CapabilitySet(
            Capability::DynamicEval.bit()
                | Capability::DynamicExec.bit()
                | Capability::ProcessSpawn.bit(),
        )
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Capability::FileIo => write!(f, "FileIo"),
            Capability::DynamicEval => write!(f, "DynamicEval"),
            Capability::DynamicExec => write!(f, "DynamicExec"),
            Capability::ProcessSpawn => write!(f, "ProcessSpawn"),
        }
    }
}

/// Set of capabilities stored as a bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CapabilitySet(u8);

impl CapabilitySet {
    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, cap: Capability) -> bool {
        self.0 & cap.bit() != 0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    #[must_use]
    pub const fn union(self, other: CapabilitySet) -> Self {
        Self(self.0 | other.0)
    }

    #[inline]
    #[must_use]
    pub const fn with(self, cap: Capability) -> Self {
        Self(self.0 | cap.bit())
    }

    #[inline]
    pub fn insert(&mut self, cap: Capability) {
        self.0 |= cap.bit();
    }
}

/// Kind of filesystem operation submitted for a decision
///
/// Confinement is uniform across kinds; the kind feeds error messages and
/// the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Write,
    Create,
    Delete,
    List,
    ChangeDir,
}

impl OperationKind {
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            OperationKind::Read => "read",
            OperationKind::Write => "write",
            OperationKind::Create => "create",
            OperationKind::Delete => "delete",
            OperationKind::List => "list",
            OperationKind::ChangeDir => "chdir",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a candidate path was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// The candidate was empty
    EmptyPath,
    /// The canonical result falls outside the sandbox root
    OutsideRoot,
    /// A symlink along the path could not be resolved to a real target
    UnresolvableSymlink,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            DenyReason::EmptyPath => write!(f, "empty path"),
            DenyReason::OutsideRoot => write!(f, "outside sandbox root"),
            DenyReason::UnresolvableSymlink => write!(f, "unresolvable symlink"),
        }
    }
}

/// Outcome of resolving a candidate path against the sandbox root
///
/// Computed synchronously and statelessly; never cached, never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Access granted; carries the canonical, symlink-free path the
    /// operation must use
    Allow(PathBuf),
    /// Access denied
    Deny {
        attempted: PathBuf,
        reason: DenyReason,
    },
}

impl Decision {
    #[inline]
    #[must_use]
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow(_))
    }
}
