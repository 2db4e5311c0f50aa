//! Mutations on group profiles (companies, teams, ...).

use crate::dispatch::{DispatchGate, Dispatched, Target};
use crate::error::Result;
use crate::mutation::{
    delete_action, remove_action, set_action, set_once_action, union_action, unset_action,
    MutationRecord, PropertyInput,
};
use crate::types::Callback;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Profile API for one group, addressed by `$group_key` and `$group_id`.
///
/// Group mutations do not depend on the user's identity and are never
/// buffered.
#[derive(Clone)]
pub struct Group {
    gate: Arc<DispatchGate>,
    target: Target,
    client_name: String,
}

impl Group {
    pub(crate) fn new(
        gate: Arc<DispatchGate>,
        group_key: impl Into<String>,
        group_id: impl Into<Value>,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            target: Target::Group {
                key: group_key.into(),
                id: group_id.into(),
            },
            client_name: client_name.into(),
        }
    }

    pub fn set(
        &self,
        input: impl Into<PropertyInput>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        self.send(set_action(input), callback)
    }

    pub fn set_once(
        &self,
        input: impl Into<PropertyInput>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        self.send(set_once_action(input), callback)
    }

    pub fn unset<I, S>(&self, names: I, callback: Option<Callback>) -> Result<Dispatched>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(unset_action(names), callback)
    }

    pub fn union(
        &self,
        input: impl Into<PropertyInput>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        self.send(union_action(input), callback)
    }

    pub fn remove(
        &self,
        input: impl Into<PropertyInput>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        self.send(remove_action(input), callback)
    }

    /// Permanently delete the group.
    pub fn delete(&self, callback: Option<Callback>) -> Result<Dispatched> {
        self.send(delete_action(), callback)
    }

    fn send(&self, record: MutationRecord, callback: Option<Callback>) -> Result<Dispatched> {
        self.gate.dispatch(&self.target, record, callback)
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Target::Group { key, id } = &self.target else {
            return write!(f, "{}.group", self.client_name);
        };
        match id {
            Value::String(id) => write!(f, "{}.group.{}.{}", self.client_name, key, id),
            other => write!(f, "{}.group.{}.{}", self.client_name, key, other),
        }
    }
}
