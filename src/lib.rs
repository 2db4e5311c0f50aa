//! # Greenfinch Profiles
//!
//! Property mutations on people and group profiles, shipped to a collection
//! endpoint through a host-provided batching dispatcher.
//!
//! ## Core Concepts
//!
//! - **Mutations**: `$set`, `$set_once`, `$unset`, `$add`, `$append`,
//!   `$remove`, `$union` (and `$delete`) records built from call arguments
//! - **Dispatch gate**: stamps identity/auth fields and either forwards a
//!   mutation or, before identify, buffers it
//! - **Pending queue**: durable per-kind buffer; same-kind mutations merge,
//!   list mutations queue item by item
//! - **Flush**: once identified, the queue is drained and replayed; failed
//!   replays are put back for the next drain
//!
//! ## Example
//!
//! ```ignore
//! use greenfinch_profiles::{ChannelDispatcher, Client, ClientConfig};
//!
//! let (dispatcher, transport) = ChannelDispatcher::bounded(256, false);
//! let client = Client::new(
//!     ClientConfig::default().with_token("project-token").with_queue_path("./queue"),
//!     Arc::new(dispatcher),
//! )?;
//!
//! // Buffered: identity unknown
//! client.people().set(("Plan", "gold"), None)?;
//!
//! // Drains the queue through the dispatcher
//! client.identify("user-42");
//! ```

pub mod client;
pub mod dispatch;
pub mod error;
pub mod flush;
pub mod group;
pub mod identity;
pub mod mutation;
pub mod people;
pub mod queue;
pub mod types;

// Re-exports
pub use client::{Client, ClientConfig, DEFAULT_API_HOST};
pub use dispatch::{
    BatchRequest, Batcher, ChannelDispatcher, DispatchGate, Dispatched, PendingRequest,
    RequestDispatcher, Target,
};
pub use error::{EngageError, Result};
pub use flush::{FlushCallbacks, FlushCoordinator, FlushReport};
pub use group::Group;
pub use identity::{anonymous_id, Identity, IdentityProvider, IdentityState};
pub use mutation::{MutationRecord, PropertyInput};
pub use people::{NoProfileDefaults, People, ProfileDefaults};
pub use queue::{FileQueueStorage, MemoryQueueStorage, PendingQueue, QueueState, QueueStorage};
pub use types::*;
