//! Channel hand-off to a host transport.

use crate::dispatch::types::{BatchRequest, RequestDispatcher};
use crate::error::EngageError;
use crate::types::{Callback, Response, RESPONSE_FAILED};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use serde_json::Value;
use std::fmt;

/// A request waiting for the transport, plus the callback to complete it.
pub struct PendingRequest {
    pub request: BatchRequest,
    callback: Option<Callback>,
}

impl PendingRequest {
    /// Report the network outcome back to the caller.
    pub fn complete(self, response: Response, data: Option<Value>) {
        if let Some(callback) = self.callback {
            callback(response, data);
        }
    }

    pub fn has_callback(&self) -> bool {
        self.callback.is_some()
    }
}

impl fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingRequest")
            .field("request", &self.request)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Dispatcher that queues requests on a bounded channel.
///
/// The host's transport thread receives [`PendingRequest`]s and calls
/// [`PendingRequest::complete`] when the round trip ends. A full or closed
/// channel completes the request at once with the failure code.
pub struct ChannelDispatcher {
    sender: Sender<PendingRequest>,
    verbose: bool,
}

impl ChannelDispatcher {
    /// Create a dispatcher and the receiving end for the transport.
    pub fn bounded(capacity: usize, verbose: bool) -> (Self, Receiver<PendingRequest>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender, verbose }, receiver)
    }
}

impl RequestDispatcher for ChannelDispatcher {
    fn send(&self, request: BatchRequest, callback: Option<Callback>) {
        let pending = PendingRequest { request, callback };

        let (reason, pending) = match self.sender.try_send(pending) {
            Ok(()) => return,
            Err(TrySendError::Full(p)) => ("transport buffer full", p),
            Err(TrySendError::Disconnected(p)) => ("transport disconnected", p),
        };

        tracing::warn!(
            endpoint = %pending.request.endpoint,
            reason,
            "request not handed to transport"
        );
        let error = EngageError::DispatcherClosed(reason.to_string()).to_string();
        pending.complete(Response::new(RESPONSE_FAILED, Some(error), self.verbose), None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::types::Batcher;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn request() -> BatchRequest {
        BatchRequest {
            endpoint: "https://example.test/engage/".into(),
            payload: json!({"$set": {"a": 1}}),
            batcher: Batcher::People,
        }
    }

    fn recorder() -> (Arc<Mutex<Vec<Response>>>, Callback) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: Callback = Box::new(move |response: Response, _: Option<Value>| {
            sink.lock().push(response)
        });
        (seen, callback)
    }

    #[test]
    fn test_transport_completes_request() {
        let (dispatcher, receiver) = ChannelDispatcher::bounded(4, false);
        let (seen, callback) = recorder();

        dispatcher.send(request(), Some(callback));
        assert!(seen.lock().is_empty());

        let pending = receiver.try_recv().unwrap();
        assert_eq!(pending.request, request());
        pending.complete(Response::Code(1), Some(json!({"ok": true})));

        assert_eq!(*seen.lock(), vec![Response::Code(1)]);
    }

    #[test]
    fn test_full_channel_fails_immediately() {
        let (dispatcher, _receiver) = ChannelDispatcher::bounded(1, true);
        dispatcher.send(request(), None);

        let (seen, callback) = recorder();
        dispatcher.send(request(), Some(callback));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].is_failure());
        assert!(matches!(&seen[0], Response::Status { error: Some(_), .. }));
    }

    #[test]
    fn test_disconnected_transport_fails_immediately() {
        let (dispatcher, receiver) = ChannelDispatcher::bounded(4, false);
        drop(receiver);

        let (seen, callback) = recorder();
        dispatcher.send(request(), Some(callback));
        assert_eq!(*seen.lock(), vec![Response::Code(0)]);
    }
}
