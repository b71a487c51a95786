/*!
 * Safe Execution Scope
 * Scoped acquisition: guards installed on entry, prior state restored on
 * every exit path, including unwinding
 */

use super::audit::{EventLog, SecurityEvent};
use super::capability::{CapabilityGate, RestoreToken};
use super::fs::GuardedFs;
use super::path::{PathResolver, SandboxRoot};
use crate::core::errors::{SandboxError, SandboxResult};
use crate::core::types::Capability;
use log::{error, info};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

// The capability gate is process-wide, so only one scope may hold the
// activation slot at a time. Concurrent sandboxing needs separate processes.
static ACTIVE: Mutex<bool> = Mutex::new(false);

/// A validated sandbox scope that has not been entered yet
///
/// Lifecycle is `new` (root validated) -> `enter` (guards installed) ->
/// `exit`/drop (guards removed). `enter` consumes the scope, so a closed
/// scope cannot be re-entered.
pub struct SafeExecutionScope {
    root: SandboxRoot,
}

impl SafeExecutionScope {
    /// Validate and canonicalize the root directory
    pub fn new(root: impl AsRef<Path>) -> SandboxResult<Self> {
        Ok(Self {
            root: SandboxRoot::new(root.as_ref())?,
        })
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    /// Install the guards: take the process activation slot and disable
    /// dynamic evaluation, dynamic execution, and process spawning
    pub fn enter(self) -> SandboxResult<ActiveScope> {
        {
            let mut active = ACTIVE.lock();
            if *active {
                return Err(SandboxError::ScopeAlreadyActive);
            }
            *active = true;
        }

        let token = CapabilityGate::disable(Capability::dangerous());
        let resolver = Arc::new(PathResolver::new(self.root.clone()));
        let events = EventLog::new();
        events.record(SecurityEvent::ScopeEntered {
            root: self.root.as_path().to_path_buf(),
        });
        info!("entered sandbox scope at {:?}", self.root.as_path());

        Ok(ActiveScope {
            root: self.root,
            resolver,
            events,
            token: Some(token),
        })
    }
}

/// An entered scope
///
/// Restores the pre-entry state exactly once, on explicit `exit` or on
/// drop, whichever comes first. A body error or panic propagates unchanged;
/// restoration still runs.
pub struct ActiveScope {
    root: SandboxRoot,
    resolver: Arc<PathResolver>,
    events: EventLog,
    token: Option<RestoreToken>,
}

impl ActiveScope {
    /// A guarded filesystem handle confined to this scope's root
    #[must_use]
    pub fn fs(&self) -> GuardedFs {
        GuardedFs::new(self.resolver.clone(), self.events.clone())
    }

    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Run a body against this scope's guarded handle. The body's own
    /// error type propagates unchanged.
    pub fn run<T, E>(&self, body: impl FnOnce(&GuardedFs) -> Result<T, E>) -> Result<T, E> {
        body(&self.fs())
    }

    /// Exit explicitly, surfacing restoration failures to the caller
    pub fn exit(mut self) -> SandboxResult<()> {
        self.restore()
    }

    fn restore(&mut self) -> SandboxResult<()> {
        let Some(token) = self.token.take() else {
            return Ok(());
        };
        let result = CapabilityGate::restore(token);
        // Release the slot even when restoration reports a violation; the
        // pre-scope snapshot has been applied and holding the slot would
        // only wedge the process.
        *ACTIVE.lock() = false;
        self.events.record(SecurityEvent::ScopeExited {
            root: self.root.as_path().to_path_buf(),
        });
        info!("exited sandbox scope at {:?}", self.root.as_path());
        result
    }
}

impl Drop for ActiveScope {
    fn drop(&mut self) {
        if let Err(err) = self.restore() {
            // The boundary may already be compromised; this must not pass
            // silently.
            error!("sandbox restoration failed on drop: {}", err);
            if !std::thread::panicking() {
                panic!("sandbox restoration failed: {}", err);
            }
        }
    }
}
