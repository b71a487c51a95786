/*!
 * Sandboxed Execution Context
 *
 * Confines the filesystem effects of generated tool code to a root directory
 * and disables dangerous capabilities for the duration of a scoped block:
 * - Canonicalized, symlink-free path decisions before every filesystem call
 * - Explicit capability gate for dynamic evaluation/execution and spawning
 * - Scoped acquisition with exact state restoration on every exit path
 */

pub mod audit;
pub mod capability;
pub mod fs;
pub mod path;
pub mod scan;
pub mod scope;

// Re-export for convenience
pub use audit::{EventLog, SecurityEvent};
pub use capability::{evaluate, execute, spawn_process, CapabilityGate, RestoreToken};
pub use fs::GuardedFs;
pub use path::{PathResolver, SandboxRoot};
pub use scan::{scan_source, Finding, FindingKind, ScanReport};
pub use scope::{ActiveScope, SafeExecutionScope};
