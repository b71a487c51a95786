/*!
 * Core Module
 * Shared types and error taxonomy
 */

pub mod errors;
pub mod types;

// Re-export for convenience
pub use errors::{SandboxError, SandboxResult};
pub use types::{Capability, CapabilitySet, Decision, DenyReason, OperationKind};
