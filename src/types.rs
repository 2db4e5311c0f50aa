//! Core types shared by the builder, queue and dispatch gate.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Property name to value mapping carried by a mutation.
pub type Properties = serde_json::Map<String, Value>;

/// Response code: accepted by the network layer.
pub const RESPONSE_ACCEPTED: i64 = 1;

/// Response code: network error or rejected request.
pub const RESPONSE_FAILED: i64 = 0;

/// Response code: buffered locally, not yet sent.
pub const RESPONSE_DEFERRED: i64 = -1;

/// Mutation semantics applied to a profile property.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionKind {
    Set,
    SetOnce,
    Unset,
    Add,
    Append,
    Remove,
    Union,
    /// Deletes the whole profile or group. Never buffered.
    Delete,
}

impl ActionKind {
    /// Kinds whose buffered mutations coalesce into one record.
    pub const MERGE_CAPABLE: [ActionKind; 5] = [
        ActionKind::Set,
        ActionKind::SetOnce,
        ActionKind::Unset,
        ActionKind::Add,
        ActionKind::Union,
    ];

    /// Kinds buffered as ordered sequences, one send per item.
    pub const LISTS: [ActionKind; 2] = [ActionKind::Append, ActionKind::Remove];

    /// Reserved payload key naming this action on the wire.
    pub fn action_key(self) -> &'static str {
        match self {
            ActionKind::Set => "$set",
            ActionKind::SetOnce => "$set_once",
            ActionKind::Unset => "$unset",
            ActionKind::Add => "$add",
            ActionKind::Append => "$append",
            ActionKind::Remove => "$remove",
            ActionKind::Union => "$union",
            ActionKind::Delete => "$delete",
        }
    }

    pub fn is_merge_capable(self) -> bool {
        Self::MERGE_CAPABLE.contains(&self)
    }

    pub fn is_list(self) -> bool {
        Self::LISTS.contains(&self)
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action_key())
    }
}

/// Property names injected at send time and never accepted from callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReservedProperty {
    DistinctId,
    Token,
    DeviceId,
    UserId,
    HadPersistedDistinctId,
    GroupKey,
    GroupId,
}

impl ReservedProperty {
    pub const ALL: [ReservedProperty; 7] = [
        ReservedProperty::DistinctId,
        ReservedProperty::Token,
        ReservedProperty::DeviceId,
        ReservedProperty::UserId,
        ReservedProperty::HadPersistedDistinctId,
        ReservedProperty::GroupKey,
        ReservedProperty::GroupId,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReservedProperty::DistinctId => "$distinct_id",
            ReservedProperty::Token => "$token",
            ReservedProperty::DeviceId => "$device_id",
            ReservedProperty::UserId => "$user_id",
            ReservedProperty::HadPersistedDistinctId => "$had_persisted_distinct_id",
            ReservedProperty::GroupKey => "$group_key",
            ReservedProperty::GroupId => "$group_id",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

/// Whether `name` is one of the reserved identity/auth property names.
pub fn is_reserved_property(name: &str) -> bool {
    ReservedProperty::from_name(name).is_some()
}

/// Response delivered to a mutation callback.
///
/// The shape follows the `verbose` configuration: a bare status code, or a
/// status object carrying an optional error message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Code(i64),
    Status { status: i64, error: Option<String> },
}

impl Response {
    /// Build a response in the configured shape.
    pub fn new(status: i64, error: Option<String>, verbose: bool) -> Self {
        if verbose {
            Response::Status { status, error }
        } else {
            Response::Code(status)
        }
    }

    /// "Accepted locally, not yet sent".
    pub fn deferred(verbose: bool) -> Self {
        Self::new(RESPONSE_DEFERRED, None, verbose)
    }

    pub fn status(&self) -> i64 {
        match self {
            Response::Code(code) => *code,
            Response::Status { status, .. } => *status,
        }
    }

    /// True only for the failure code; deferred and pass-through codes are not failures.
    pub fn is_failure(&self) -> bool {
        self.status() == RESPONSE_FAILED
    }

    pub fn is_deferred(&self) -> bool {
        self.status() == RESPONSE_DEFERRED
    }
}

/// One-shot callback for a single mutation.
pub type Callback = Box<dyn FnOnce(Response, Option<Value>) + Send + 'static>;

/// Callback shared across several replays (e.g. every queued append item).
pub type SharedCallback = Arc<dyn Fn(Response, Option<Value>) + Send + Sync + 'static>;
