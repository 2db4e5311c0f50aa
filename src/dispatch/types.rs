//! Types exchanged with the batching dispatcher.

use crate::types::Callback;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which request batcher a mutation is grouped into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Batcher {
    People,
    Groups,
}

/// Entity a mutation applies to.
#[derive(Clone, Debug, PartialEq)]
pub enum Target {
    /// The current user's profile.
    People,
    /// A shared entity addressed by group key and id.
    Group { key: String, id: Value },
}

impl Target {
    pub fn batcher(&self) -> Batcher {
        match self {
            Target::People => Batcher::People,
            Target::Group { .. } => Batcher::Groups,
        }
    }

    /// Path appended to the configured api host.
    pub fn endpoint_path(&self) -> &'static str {
        match self {
            Target::People => "/engage/",
            Target::Group { .. } => "/groups/",
        }
    }
}

/// One request handed to the batching dispatcher.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub endpoint: String,
    /// Action key plus identity and auth fields.
    pub payload: Value,
    pub batcher: Batcher,
}

/// External network layer that groups and sends requests.
///
/// The callback receives `1` when the network layer accepted the request and
/// `0` on network error or rejection. Any other code is passed through to
/// the caller unchanged.
pub trait RequestDispatcher: Send + Sync {
    fn send(&self, request: BatchRequest, callback: Option<Callback>);
}

/// What happened to a mutation at dispatch time.
#[derive(Clone, Debug, PartialEq)]
pub enum Dispatched {
    /// Buffered in the pending queue; identity not yet known.
    Deferred(Value),
    /// Handed to the batching dispatcher.
    Sent(Value),
}

impl Dispatched {
    /// The enriched payload.
    pub fn payload(&self) -> &Value {
        match self {
            Dispatched::Deferred(payload) | Dispatched::Sent(payload) => payload,
        }
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Dispatched::Deferred(_))
    }
}
