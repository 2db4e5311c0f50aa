//! Draining the pending queue once identity is known.
//!
//! Each merge-capable slot is copied-and-cleared, then replayed through the
//! public people method for its kind so the payload has the normal shape.
//! `$append` and `$remove` items are taken as a whole sequence (saved once)
//! and replayed one request per item, newest first. Any replay answered with
//! the failure code is put back for the next drain; nothing is retried
//! within the same drain.

use crate::mutation::MutationRecord;
use crate::people::People;
use crate::types::{ActionKind, Callback, Response, SharedCallback};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-kind callbacks invoked for every replayed request.
#[derive(Clone, Default)]
pub struct FlushCallbacks {
    callbacks: HashMap<ActionKind, SharedCallback>,
}

impl FlushCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the callback for one action kind.
    pub fn on<F>(mut self, kind: ActionKind, callback: F) -> Self
    where
        F: Fn(Response, Option<Value>) + Send + Sync + 'static,
    {
        self.callbacks.insert(kind, Arc::new(callback));
        self
    }

    fn get(&self, kind: ActionKind) -> Option<SharedCallback> {
        self.callbacks.get(&kind).cloned()
    }
}

/// What a drain handed to the dispatch path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Merge-capable slots replayed (one request each).
    pub slots_replayed: usize,
    /// `$append`/`$remove` items replayed (one request each).
    pub items_replayed: usize,
    /// Replays that could not be dispatched and were put straight back.
    pub replay_errors: usize,
}

impl FlushReport {
    pub fn requests(&self) -> usize {
        self.slots_replayed + self.items_replayed
    }
}

/// Replays the pending queue of one people client.
///
/// Overlapping drains of the same queue are not guarded against.
pub struct FlushCoordinator<'a> {
    people: &'a People,
}

impl<'a> FlushCoordinator<'a> {
    pub fn new(people: &'a People) -> Self {
        Self { people }
    }

    /// Visit every slot and sequence once.
    ///
    /// Mutations enqueued while this runs stay queued for the next drain.
    pub fn drain_all(&self, callbacks: &FlushCallbacks) -> FlushReport {
        let mut report = FlushReport::default();

        for kind in ActionKind::MERGE_CAPABLE {
            self.flush_one_queue(kind, callbacks.get(kind), &mut report);
        }

        // No server-side concat, so each item goes out on its own.
        for kind in ActionKind::LISTS {
            self.flush_sequence(kind, callbacks.get(kind), &mut report);
        }

        tracing::debug!(
            slots = report.slots_replayed,
            items = report.items_replayed,
            errors = report.replay_errors,
            "pending queue drained"
        );
        report
    }

    fn flush_one_queue(
        &self,
        kind: ActionKind,
        callback: Option<SharedCallback>,
        report: &mut FlushReport,
    ) {
        let Some(record) = self.people.queue().pop_from_queue(kind) else {
            return;
        };

        if self.replay(record, callback) {
            report.slots_replayed += 1;
        } else {
            report.replay_errors += 1;
        }
    }

    fn flush_sequence(
        &self,
        kind: ActionKind,
        callback: Option<SharedCallback>,
        report: &mut FlushReport,
    ) {
        let items = self.people.queue().take_sequence(kind);

        // Items race each other on the network anyway; replay newest first.
        for record in items.into_iter().rev() {
            if record.is_empty() {
                continue;
            }
            if self.replay(record, callback.clone()) {
                report.items_replayed += 1;
            } else {
                report.replay_errors += 1;
            }
        }
    }

    /// Replay one record, re-queuing exactly it if the response is a failure.
    fn replay(&self, record: MutationRecord, callback: Option<SharedCallback>) -> bool {
        let kind = record.kind();
        let queue = Arc::clone(self.people.queue());
        let sent = record.clone();

        let on_response: Callback = Box::new(move |response: Response, data: Option<Value>| {
            if response.is_failure() {
                queue.restore(sent);
            }
            if let Some(callback) = callback {
                callback(response, data);
            }
        });

        match self.people.replay(record.clone(), on_response) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(action = %kind, error = %e, "replay could not be dispatched");
                self.people.queue().restore(record);
                false
            }
        }
    }
}
