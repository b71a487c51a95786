/*!
 * Toucan Sandbox Library
 * Path-confined, capability-gated execution scopes for generated tool code
 */

pub mod core;
pub mod sandbox;

// Re-exports
pub use crate::core::{
    Capability, CapabilitySet, Decision, DenyReason, OperationKind, SandboxError, SandboxResult,
};
pub use sandbox::{
    scan_source, ActiveScope, CapabilityGate, EventLog, GuardedFs, SafeExecutionScope, SandboxRoot,
    ScanReport, SecurityEvent,
};
