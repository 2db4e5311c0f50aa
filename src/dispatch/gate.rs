//! The dispatch gate: send now, or buffer until identify.

use crate::client::ClientConfig;
use crate::dispatch::types::{BatchRequest, Dispatched, RequestDispatcher, Target};
use crate::error::Result;
use crate::identity::IdentityProvider;
use crate::mutation::MutationRecord;
use crate::queue::PendingQueue;
use crate::types::{ActionKind, Callback, Properties, ReservedProperty, Response};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Identity properties copied onto people payloads when set.
const IDENTITY_PROPERTIES: [ReservedProperty; 3] = [
    ReservedProperty::DeviceId,
    ReservedProperty::UserId,
    ReservedProperty::HadPersistedDistinctId,
];

/// Decides per mutation whether to send immediately or enqueue.
///
/// People mutations are deferred while the identity is unknown. Group
/// mutations are addressed by group key and id and always go out.
pub struct DispatchGate {
    config: Arc<ClientConfig>,
    identity: Arc<dyn IdentityProvider>,
    dispatcher: Arc<dyn RequestDispatcher>,
    queue: Arc<PendingQueue>,

    /// Held shared across "unidentified? then enqueue" and exclusively
    /// across the identify flip, so no deferral lands after the drain.
    transition: RwLock<()>,
}

impl DispatchGate {
    pub fn new(
        config: Arc<ClientConfig>,
        identity: Arc<dyn IdentityProvider>,
        dispatcher: Arc<dyn RequestDispatcher>,
        queue: Arc<PendingQueue>,
    ) -> Self {
        Self {
            config,
            identity,
            dispatcher,
            queue,
            transition: RwLock::new(()),
        }
    }

    /// Stamp identity/auth fields, then defer or forward.
    ///
    /// Deferred mutations invoke `callback` synchronously with the deferred
    /// response. Forwarded mutations get whatever the dispatcher reports.
    pub fn dispatch(
        &self,
        target: &Target,
        record: MutationRecord,
        callback: Option<Callback>,
    ) -> Result<Dispatched> {
        if *target == Target::People {
            let guard = self.transition.read();
            if !self.identity.is_identified() {
                let payload = self.envelope(target, &record);
                self.queue.enqueue(&record)?;
                drop(guard);
                if let Some(callback) = callback {
                    callback(Response::deferred(self.config.verbose), None);
                }
                return Ok(Dispatched::Deferred(payload));
            }
        }

        // Identity only moves forward, so the stamp below cannot go stale.
        let payload = self.envelope(target, &record);
        let request = BatchRequest {
            endpoint: format!(
                "{}{}",
                self.config.api_host.trim_end_matches('/'),
                target.endpoint_path()
            ),
            payload: payload.clone(),
            batcher: target.batcher(),
        };
        tracing::debug!(
            action = %record.kind(),
            endpoint = %request.endpoint,
            "forwarding mutation to dispatcher"
        );
        self.dispatcher.send(request, callback);

        Ok(Dispatched::Sent(payload))
    }

    /// Run the identity flip exclusively of any deferral in progress.
    ///
    /// Once `flip` returns, every deferred mutation is already in the queue
    /// and every later people mutation sees the new identity.
    pub fn transition<F>(&self, flip: F) -> bool
    where
        F: FnOnce() -> bool,
    {
        let _guard = self.transition.write();
        flip()
    }

    /// Wire payload: the action key plus the fields injected at send time.
    pub fn envelope(&self, target: &Target, record: &MutationRecord) -> Value {
        let mut data = Properties::new();

        match target {
            Target::People => {
                let distinct_id = self.identity.distinct_id();
                let action = match record.kind() {
                    ActionKind::Delete => Value::String(distinct_id.clone()),
                    _ => record.payload_value(),
                };
                data.insert(record.kind().action_key().into(), action);
                data.insert(
                    ReservedProperty::Token.as_str().into(),
                    Value::String(self.config.token.clone()),
                );
                data.insert(
                    ReservedProperty::DistinctId.as_str().into(),
                    Value::String(distinct_id),
                );
                for prop in IDENTITY_PROPERTIES {
                    if let Some(value) = self.identity.property(prop.as_str()).filter(is_truthy) {
                        data.insert(prop.as_str().into(), value);
                    }
                }
            }
            Target::Group { key, id } => {
                let action = match record.kind() {
                    ActionKind::Delete => Value::String(String::new()),
                    _ => record.payload_value(),
                };
                data.insert(record.kind().action_key().into(), action);
                data.insert(
                    ReservedProperty::GroupKey.as_str().into(),
                    Value::String(key.clone()),
                );
                data.insert(ReservedProperty::GroupId.as_str().into(), id.clone());
                data.insert(
                    ReservedProperty::Token.as_str().into(),
                    Value::String(self.config.token.clone()),
                );
            }
        }

        Value::Object(data)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    pub fn queue(&self) -> &Arc<PendingQueue> {
        &self.queue
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::String(s) => !s.is_empty(),
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::Array(_) | Value::Object(_) => true,
    }
}
