/*!
 * Capability Gate
 * Process-wide switch for dangerous operations, scoped to a sandbox lifetime
 *
 * The gate is consulted explicitly before each effectful call instead of
 * rebinding runtime entry points, so the guarded surface is exhaustive by
 * construction.
 */

use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::types::{Capability, CapabilitySet};
use log::{info, warn};
use parking_lot::Mutex;
use std::process::{Child, Command};

// Shared by every scope in the process; only the active scope may mutate it.
static DISABLED: Mutex<CapabilitySet> = Mutex::new(CapabilitySet::empty());

/// Token capturing the exact pre-sandbox gate state
///
/// Consumed exactly once on restore; not clonable, so nested or sequential
/// scopes cannot leak one another's state. Restoration is LIFO: the gate
/// must still hold the state this token's `disable` installed.
#[derive(Debug)]
pub struct RestoreToken {
    prior: CapabilitySet,
    expected: CapabilitySet,
}

/// Gates dynamic evaluation, dynamic execution, and process spawning
pub struct CapabilityGate;

impl CapabilityGate {
    /// Disable the given capabilities, returning a token that restores the
    /// exact prior state
    pub fn disable(set: CapabilitySet) -> RestoreToken {
        let mut disabled = DISABLED.lock();
        let prior = *disabled;
        *disabled = prior.union(set);
        info!("capability gate disabled {:?} (was {:?})", set, prior);
        RestoreToken {
            prior,
            expected: *disabled,
        }
    }

    /// Reinstate the exact state captured by the token.
    ///
    /// If the gate was mutated since the token was issued, the token's
    /// snapshot is still applied (the best-known pre-scope state), but the
    /// invariant violation surfaces as a `Restoration` error the caller
    /// must treat as fatal.
    pub fn restore(token: RestoreToken) -> SandboxResult<()> {
        let mut disabled = DISABLED.lock();
        let observed = *disabled;
        *disabled = token.prior;
        if observed != token.expected {
            return Err(SandboxError::Restoration(format!(
                "capability gate mutated since scope entry: expected {:?}, found {:?}",
                token.expected, observed
            )));
        }
        info!("capability gate restored to {:?}", token.prior);
        Ok(())
    }

    /// Check that a capability is currently enabled.
    ///
    /// This is the check every effectful call consults before executing.
    pub fn ensure(cap: Capability) -> SandboxResult<()> {
        if DISABLED.lock().contains(cap) {
            warn!("capability {} denied", cap);
            return Err(SandboxError::CapabilityDenied(cap));
        }
        Ok(())
    }

    /// Currently disabled capabilities
    #[must_use]
    pub fn disabled() -> CapabilitySet {
        *DISABLED.lock()
    }
}

/// Spawn a subprocess, subject to the gate
pub fn spawn_process(command: &mut Command) -> SandboxResult<Child> {
    CapabilityGate::ensure(Capability::ProcessSpawn)?;
    command.spawn().map_err(SandboxError::from)
}

/// Run a caller-supplied dynamic evaluator (eval-equivalent), subject to
/// the gate. The closure never runs when the capability is disabled.
pub fn evaluate<T>(f: impl FnOnce() -> T) -> SandboxResult<T> {
    CapabilityGate::ensure(Capability::DynamicEval)?;
    Ok(f())
}

/// Run a caller-supplied dynamic executor (exec-equivalent), subject to
/// the gate
pub fn execute<T>(f: impl FnOnce() -> T) -> SandboxResult<T> {
    CapabilityGate::ensure(Capability::DynamicExec)?;
    Ok(f())
}
