//! Client facade tying identity, queue and dispatch together.

use crate::dispatch::{DispatchGate, RequestDispatcher};
use crate::error::{EngageError, Result};
use crate::flush::{FlushCallbacks, FlushReport};
use crate::group::Group;
use crate::identity::{anonymous_id, Identity, IdentityProvider};
use crate::people::{NoProfileDefaults, People, ProfileDefaults};
use crate::queue::{FileQueueStorage, MemoryQueueStorage, PendingQueue, QueueStorage};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Default collection host.
pub const DEFAULT_API_HOST: &str = "https://api.greenfinch.io";

/// Client configuration.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Instance name used in display strings.
    pub name: String,

    /// Project auth token sent as `$token`.
    pub token: String,

    /// Base URL of the collection endpoints.
    pub api_host: String,

    /// Deliver callback responses as `{status, error}` instead of a bare code.
    pub verbose: bool,

    /// Enrich `$set` payloads with referrer info.
    pub save_referrer: bool,

    /// Directory for the durable pending queue (None = in memory).
    pub queue_path: Option<PathBuf>,

    /// Whether to create the queue directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Distinct id used until identify (None = generated).
    pub anonymous_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            name: "greenfinch".to_string(),
            token: String::new(),
            api_host: DEFAULT_API_HOST.to_string(),
            verbose: false,
            save_referrer: true,
            queue_path: None,
            create_if_missing: true,
            anonymous_id: None,
        }
    }
}

impl ClientConfig {
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = token.into();
        self
    }

    pub fn with_api_host(mut self, api_host: impl Into<String>) -> Self {
        self.api_host = api_host.into();
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_save_referrer(mut self, save_referrer: bool) -> Self {
        self.save_referrer = save_referrer;
        self
    }

    pub fn with_queue_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.queue_path = Some(path.into());
        self
    }

    pub fn with_create_if_missing(mut self, create_if_missing: bool) -> Self {
        self.create_if_missing = create_if_missing;
        self
    }

    pub fn with_anonymous_id(mut self, id: impl Into<String>) -> Self {
        self.anonymous_id = Some(id.into());
        self
    }
}

/// One tracking client instance.
///
/// Owns the pending queue exclusively; the queue is never shared across
/// instances.
pub struct Client {
    config: Arc<ClientConfig>,
    identity: Arc<Identity>,
    gate: Arc<DispatchGate>,
    people: People,
}

impl Client {
    /// Create a client whose queue lives at `config.queue_path` (or in memory).
    pub fn new(config: ClientConfig, dispatcher: Arc<dyn RequestDispatcher>) -> Result<Self> {
        let storage: Box<dyn QueueStorage> = match &config.queue_path {
            Some(path) if !path.exists() && !config.create_if_missing => {
                return Err(EngageError::NotInitialized);
            }
            Some(path) => Box::new(FileQueueStorage::open(path)?),
            None => Box::new(MemoryQueueStorage::new()),
        };
        Self::with_storage(config, storage, dispatcher)
    }

    /// Create a client over an explicit queue storage.
    pub fn with_storage(
        config: ClientConfig,
        storage: Box<dyn QueueStorage>,
        dispatcher: Arc<dyn RequestDispatcher>,
    ) -> Result<Self> {
        let queue = Arc::new(PendingQueue::open(storage)?);
        let identity = Arc::new(Identity::new(
            config.anonymous_id.clone().unwrap_or_else(anonymous_id),
        ));
        let config = Arc::new(config);

        let gate = Arc::new(DispatchGate::new(
            Arc::clone(&config),
            Arc::clone(&identity) as Arc<dyn IdentityProvider>,
            dispatcher,
            queue,
        ));
        let people = People::new(
            Arc::clone(&gate),
            Arc::new(NoProfileDefaults),
            config.name.clone(),
        );

        Ok(Self {
            config,
            identity,
            gate,
            people,
        })
    }

    /// Use `defaults` for the properties merged under every `$set`.
    pub fn with_profile_defaults(mut self, defaults: Arc<dyn ProfileDefaults>) -> Self {
        self.people = People::new(Arc::clone(&self.gate), defaults, self.config.name.clone());
        self
    }

    pub fn people(&self) -> &People {
        &self.people
    }

    /// Handle for a group profile.
    pub fn group(&self, group_key: impl Into<String>, group_id: impl Into<Value>) -> Group {
        Group::new(
            Arc::clone(&self.gate),
            group_key,
            group_id,
            self.config.name.clone(),
        )
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Register `$device_id`, `$user_id` or similar identity properties.
    pub fn register(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.identity.register(name, value);
    }

    /// Establish identity and drain the pending queue.
    ///
    /// Safe against people mutations on other threads: each one is either
    /// queued before the flip (and drained here) or sent directly.
    ///
    /// Returns `None` if the client was already identified; the queue is
    /// then left for an explicit [`flush`](Self::flush).
    pub fn identify(&self, distinct_id: impl Into<String>) -> Option<FlushReport> {
        let distinct_id = distinct_id.into();
        if !self.gate.transition(|| self.identity.identify(distinct_id)) {
            return None;
        }
        Some(self.people.flush(&FlushCallbacks::default()))
    }

    /// Host-driven drain with per-kind callbacks.
    pub fn flush(&self, callbacks: &FlushCallbacks) -> FlushReport {
        self.people.flush(callbacks)
    }

    pub fn queue(&self) -> &PendingQueue {
        self.gate.queue()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl fmt::Display for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.config.name)
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        // Best-effort save on drop
        if let Err(e) = self.gate.queue().save() {
            tracing::warn!(error = %e, "failed to save pending queue on drop");
        }
    }
}
