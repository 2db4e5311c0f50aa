//! Mutations on the current user's profile.

use crate::dispatch::{DispatchGate, Dispatched, Target};
use crate::error::{EngageError, Result};
use crate::flush::{FlushCallbacks, FlushCoordinator, FlushReport};
use crate::mutation::{
    add_action, append_action, coerce_number, delete_action, remove_action, set_action,
    set_once_action, union_action, unset_action, MutationRecord, PropertyInput,
};
use crate::queue::PendingQueue;
use crate::types::{is_reserved_property, Callback, Properties};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Default properties merged under every `$set`.
pub trait ProfileDefaults: Send + Sync {
    /// Platform properties (library version, OS, ...).
    fn people_properties(&self) -> Properties;

    /// Refresh stored referrer info before a `$set`.
    fn update_referrer_info(&self) {}

    /// Stored referrer properties.
    fn referrer_info(&self) -> Properties;
}

/// Adds nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProfileDefaults;

impl ProfileDefaults for NoProfileDefaults {
    fn people_properties(&self) -> Properties {
        Properties::new()
    }

    fn referrer_info(&self) -> Properties {
        Properties::new()
    }
}

/// Profile API for the current user.
///
/// Before identify, every call is buffered in the pending queue and its
/// callback receives the deferred response.
#[derive(Clone)]
pub struct People {
    gate: Arc<DispatchGate>,
    defaults: Arc<dyn ProfileDefaults>,
    client_name: String,
}

impl People {
    pub(crate) fn new(
        gate: Arc<DispatchGate>,
        defaults: Arc<dyn ProfileDefaults>,
        client_name: impl Into<String>,
    ) -> Self {
        Self {
            gate,
            defaults,
            client_name: client_name.into(),
        }
    }

    /// Set properties, overwriting existing values.
    ///
    /// Default people properties (and referrer info when `save_referrer` is
    /// on) are merged underneath; caller keys win.
    pub fn set(
        &self,
        input: impl Into<PropertyInput>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        let mut record = set_action(input);

        if let MutationRecord::Set(props) = &mut record {
            let mut merged = self.defaults.people_properties();
            if self.gate.config().save_referrer {
                self.defaults.update_referrer_info();
                merged.extend(self.defaults.referrer_info());
            }
            merged.extend(std::mem::take(props));
            merged.retain(|name, _| !is_reserved_property(name));
            *props = merged;
        }

        self.send(record, callback)
    }

    /// Set properties only if they do not exist yet.
    pub fn set_once(
        &self,
        input: impl Into<PropertyInput>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        self.send(set_once_action(input), callback)
    }

    /// Permanently remove properties from the profile.
    pub fn unset<I, S>(&self, names: I, callback: Option<Callback>) -> Result<Dispatched>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(unset_action(names), callback)
    }

    /// Increment numeric properties. Non-numeric values are logged and skipped.
    pub fn increment(
        &self,
        input: impl Into<PropertyInput>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        self.send(add_action(input), callback)
    }

    /// Increment a single counter by one.
    pub fn increment_one(
        &self,
        name: impl Into<String>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        let name: String = name.into();
        self.increment((name, 1), callback)
    }

    /// Append a value to a list property.
    pub fn append(
        &self,
        input: impl Into<PropertyInput>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        self.send(append_action(input), callback)
    }

    /// Remove a value from a list property.
    pub fn remove(
        &self,
        input: impl Into<PropertyInput>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        self.send(remove_action(input), callback)
    }

    /// Merge values into a list property, excluding duplicates server side.
    pub fn union(
        &self,
        input: impl Into<PropertyInput>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        self.send(union_action(input), callback)
    }

    /// Record a charge by appending `{$amount, ...properties}` to `$transactions`.
    pub fn track_charge(
        &self,
        amount: impl Into<Value>,
        properties: Option<Properties>,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        let amount = amount.into();
        let Some(amount) = coerce_number(&amount) else {
            tracing::error!(value = %amount, "invalid charge amount, must be a number");
            return Err(EngageError::InvalidNumber {
                property: "$amount".into(),
                value: amount.to_string(),
            });
        };

        let mut transaction = Properties::new();
        transaction.insert("$amount".into(), amount);
        transaction.extend(properties.unwrap_or_default());

        self.append(("$transactions", Value::Object(transaction)), callback)
    }

    /// Clear all recorded charges.
    pub fn clear_charges(&self, callback: Option<Callback>) -> Result<Dispatched> {
        self.set(("$transactions", Value::Array(Vec::new())), callback)
    }

    /// Permanently delete the current profile. Requires identify.
    pub fn delete_user(&self) -> Result<Dispatched> {
        if !self.gate.identity().is_identified() {
            tracing::error!("delete_user requires identify to be called first");
            return Err(EngageError::NotIdentified("delete_user"));
        }
        self.send(delete_action(), None)
    }

    /// Drain the pending queue through the normal send path.
    pub fn flush(&self, callbacks: &FlushCallbacks) -> FlushReport {
        FlushCoordinator::new(self).drain_all(callbacks)
    }

    pub fn queue(&self) -> &Arc<PendingQueue> {
        self.gate.queue()
    }

    /// Send a drained record through the public method for its kind.
    pub(crate) fn replay(&self, record: MutationRecord, callback: Callback) -> Result<Dispatched> {
        let callback = Some(callback);
        match record {
            MutationRecord::Set(props) => self.set(props, callback),
            MutationRecord::SetOnce(props) => self.set_once(props, callback),
            MutationRecord::Unset(names) => self.unset(names, callback),
            MutationRecord::Add(props) => self.increment(props, callback),
            MutationRecord::Append(props) => self.append(props, callback),
            MutationRecord::Remove(props) => self.remove(props, callback),
            MutationRecord::Union(props) => self.union(props, callback),
            MutationRecord::Delete => self.send(MutationRecord::Delete, callback),
        }
    }

    fn send(&self, record: MutationRecord, callback: Option<Callback>) -> Result<Dispatched> {
        self.gate.dispatch(&Target::People, record, callback)
    }
}

impl fmt::Display for People {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.people", self.client_name)
    }
}
