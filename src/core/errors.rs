/*!
 * Error Types
 * Centralized error handling with thiserror and serde support
 */

use crate::core::types::{Capability, OperationKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Sandbox operation result
///
/// # Must Use
/// Sandbox operations can fail and must be handled to prevent vulnerabilities
#[must_use = "sandbox operations can fail and must be handled"]
pub type SandboxResult<T> = Result<T, SandboxError>;

/// Unified sandbox error type
///
/// Violations are deliberate denials, not transient failures; nothing here
/// is ever retried.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "error", content = "details")]
pub enum SandboxError {
    #[error("{operation} not allowed outside sandbox root: attempted {attempted:?}, root {root:?}")]
    PathEscape {
        operation: OperationKind,
        attempted: PathBuf,
        root: PathBuf,
    },

    #[error("capability {0} is disabled in this execution context")]
    CapabilityDenied(Capability),

    #[error("restoration failed: {0}")]
    Restoration(String),

    #[error("invalid sandbox root: {0}")]
    InvalidRoot(String),

    #[error("another sandbox scope is already active in this process")]
    ScopeAlreadyActive,

    #[error("io error: {0}")]
    Io(String),
}

// Allow conversion from std::io::Error
impl From<std::io::Error> for SandboxError {
    fn from(err: std::io::Error) -> Self {
        SandboxError::Io(err.to_string())
    }
}

impl SandboxError {
    /// Whether this error means the sandbox boundary may already be
    /// compromised and the enclosing operation must treat it as fatal
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, SandboxError::Restoration(_))
    }
}
