//! Identity state used by the dispatch gate.

use crate::types::Properties;
use parking_lot::RwLock;
use serde_json::Value;
use uuid::Uuid;

/// Source of the identity fields stamped on every outgoing mutation.
pub trait IdentityProvider: Send + Sync {
    /// Current distinct id (anonymous until identified).
    fn distinct_id(&self) -> String;

    /// Registered super property such as `$device_id` or `$user_id`.
    fn property(&self, name: &str) -> Option<Value>;

    /// Whether a stable profile identity has been established.
    fn is_identified(&self) -> bool;
}

/// Identify state machine. Moves forward exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityState {
    Unidentified,
    Identified,
}

struct IdentityInner {
    state: IdentityState,
    distinct_id: String,
    properties: Properties,
}

/// In-process identity provider.
pub struct Identity {
    inner: RwLock<IdentityInner>,
}

impl Identity {
    /// Start unidentified under an anonymous distinct id.
    pub fn new(anonymous_id: impl Into<String>) -> Self {
        Self {
            inner: RwLock::new(IdentityInner {
                state: IdentityState::Unidentified,
                distinct_id: anonymous_id.into(),
                properties: Properties::new(),
            }),
        }
    }

    pub fn state(&self) -> IdentityState {
        self.inner.read().state
    }

    /// Transition to `Identified` under `distinct_id`.
    ///
    /// Returns `true` only for the transition itself; once identified the
    /// call is ignored.
    pub fn identify(&self, distinct_id: impl Into<String>) -> bool {
        let mut inner = self.inner.write();
        if inner.state == IdentityState::Identified {
            tracing::debug!("already identified, ignoring identify");
            return false;
        }
        inner.distinct_id = distinct_id.into();
        inner.state = IdentityState::Identified;
        tracing::debug!(distinct_id = %inner.distinct_id, "identity established");
        true
    }

    /// Register a property read at dispatch time (`$device_id`, `$user_id`, ...).
    pub fn register(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner.write().properties.insert(name.into(), value.into());
    }
}

impl IdentityProvider for Identity {
    fn distinct_id(&self) -> String {
        self.inner.read().distinct_id.clone()
    }

    fn property(&self, name: &str) -> Option<Value> {
        self.inner.read().properties.get(name).cloned()
    }

    fn is_identified(&self) -> bool {
        self.state() == IdentityState::Identified
    }
}

/// A random (v4) anonymous distinct id.
pub fn anonymous_id() -> String {
    Uuid::new_v4().to_string()
}
