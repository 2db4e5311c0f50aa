//! Dispatch of mutations to the network layer.
//!
//! The [`DispatchGate`] stamps identity and auth fields on each mutation and
//! either forwards it to a [`RequestDispatcher`] or, for people mutations
//! made before identify, buffers it in the pending queue.

mod channel;
mod gate;
mod types;

pub use channel::{ChannelDispatcher, PendingRequest};
pub use gate::DispatchGate;
pub use types::{BatchRequest, Batcher, Dispatched, RequestDispatcher, Target};
