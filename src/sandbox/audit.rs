/*!
 * Security Audit Events
 * Bounded in-memory record of denials and scope lifecycle
 */

use crate::core::types::{Capability, OperationKind};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Maximum retained events per scope
const MAX_EVENT_HISTORY: usize = 4096;

/// Security audit event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum SecurityEvent {
    PathDenied {
        operation: OperationKind,
        attempted: PathBuf,
    },
    CapabilityDenied {
        capability: Capability,
    },
    ScopeEntered {
        root: PathBuf,
    },
    ScopeExited {
        root: PathBuf,
    },
}

/// Event log shared by a scope and the guarded handles it vends
#[derive(Clone, Default)]
pub struct EventLog {
    inner: Arc<Mutex<Vec<SecurityEvent>>>,
}

impl EventLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: SecurityEvent) {
        let mut events = self.inner.lock();
        if events.len() == MAX_EVENT_HISTORY {
            events.remove(0);
        }
        events.push(event);
    }

    /// The most recent `n` events, oldest first
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<SecurityEvent> {
        let events = self.inner.lock();
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}
