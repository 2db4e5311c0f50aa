//! The pending action queue.

use crate::error::{EngageError, Result};
use crate::mutation::MutationRecord;
use crate::queue::state::QueueState;
use crate::queue::storage::{MemoryQueueStorage, QueueStorage};
use crate::types::{ActionKind, Properties};
use parking_lot::Mutex;

/// Per-action-kind buffer of mutations made before identify.
///
/// Each enqueue, pop, take and restore is atomic under one lock. The lock is
/// never held across a dispatch. Ordering deferrals against the identify
/// flip is the dispatch gate's job.
pub struct PendingQueue {
    /// Durable backing store.
    storage: Box<dyn QueueStorage>,

    /// In-memory copy; authoritative if a save fails.
    state: Mutex<QueueState>,
}

impl PendingQueue {
    /// Open a queue hydrated from `storage`.
    pub fn open(storage: Box<dyn QueueStorage>) -> Result<Self> {
        let state = storage.load()?.unwrap_or_default();
        tracing::debug!(buffered = state.len(), "pending queue opened");

        Ok(Self {
            storage,
            state: Mutex::new(state),
        })
    }

    /// A queue that does not outlive the process.
    pub fn in_memory() -> Self {
        Self {
            storage: Box::new(MemoryQueueStorage::new()),
            state: Mutex::new(QueueState::default()),
        }
    }

    /// Buffer a mutation.
    ///
    /// Merge-capable kinds are shallow-merged into their slot with the new
    /// keys winning. `$append`/`$remove` items are pushed onto their sequence.
    /// `$delete` cannot be buffered; the queue is left untouched.
    pub fn enqueue(&self, record: &MutationRecord) -> Result<()> {
        let kind = record.kind();

        let Some(payload) = record.clone().into_slot() else {
            tracing::error!(action = %kind, "invalid enqueue, action cannot be buffered");
            return Err(EngageError::NotQueueable(kind));
        };

        if payload.is_empty() {
            tracing::debug!(action = %kind, "nothing to enqueue");
            return Ok(());
        }

        let mut state = self.state.lock();
        if !Self::buffer(&mut state, kind, payload) {
            tracing::error!(action = %kind, "invalid enqueue, no queue for action");
            return Err(EngageError::NotQueueable(kind));
        }
        tracing::debug!(action = %kind, buffered = state.len(), "mutation enqueued");
        self.persist_or_warn(&state);

        Ok(())
    }

    /// Alias of [`enqueue`](Self::enqueue) under the persistence-store name.
    pub fn add_to_queue(&self, record: &MutationRecord) -> Result<()> {
        self.enqueue(record)
    }

    /// Read (without clearing) what is buffered for `kind`.
    pub fn get_queue(&self, kind: ActionKind) -> Vec<MutationRecord> {
        let state = self.state.lock();

        if let Some(slot) = state.slot(kind) {
            if slot.is_empty() {
                return Vec::new();
            }
            return MutationRecord::from_slot(kind, slot.clone())
                .into_iter()
                .collect();
        }

        state
            .sequence(kind)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| MutationRecord::from_slot(kind, item.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Copy and clear the slot of a merge-capable kind in one step.
    ///
    /// Returns `None` for an empty slot or a list kind.
    pub fn pop_from_queue(&self, kind: ActionKind) -> Option<MutationRecord> {
        let mut state = self.state.lock();

        let slot = state.slot_mut(kind)?;
        if slot.is_empty() {
            return None;
        }
        let taken = std::mem::take(slot);
        self.persist_or_warn(&state);

        MutationRecord::from_slot(kind, taken)
    }

    /// Take the whole sequence of a list kind, in arrival order, saving once.
    pub fn take_sequence(&self, kind: ActionKind) -> Vec<MutationRecord> {
        let mut state = self.state.lock();

        let Some(sequence) = state.sequence_mut(kind) else {
            return Vec::new();
        };
        if sequence.is_empty() {
            return Vec::new();
        }
        let taken = std::mem::take(sequence);
        self.persist_or_warn(&state);

        taken
            .into_iter()
            .filter_map(|item| MutationRecord::from_slot(kind, item))
            .collect()
    }

    /// Put back a record whose replay failed.
    ///
    /// A merge slot gets the exact record back, with any keys enqueued since
    /// the drain layered on top so they are not lost. List items are pushed
    /// back individually.
    pub fn restore(&self, record: MutationRecord) {
        let kind = record.kind();
        let Some(restored) = record.into_slot() else {
            tracing::error!(action = %kind, "cannot restore action into queue");
            return;
        };

        let mut state = self.state.lock();
        if let Some(slot) = state.slot_mut(kind) {
            let newer = std::mem::replace(slot, restored);
            slot.extend(newer);
        } else if let Some(sequence) = state.sequence_mut(kind) {
            sequence.push(restored);
        }
        tracing::warn!(action = %kind, "replay failed, mutation re-queued");
        self.persist_or_warn(&state);
    }

    /// Save the current contents to storage.
    pub fn save(&self) -> Result<()> {
        let state = self.state.lock();
        self.storage.persist(&state)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> QueueState {
        self.state.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.state.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    fn buffer(state: &mut QueueState, kind: ActionKind, payload: Properties) -> bool {
        if let Some(slot) = state.slot_mut(kind) {
            slot.extend(payload);
            return true;
        }
        if let Some(sequence) = state.sequence_mut(kind) {
            sequence.push(payload);
            return true;
        }
        false
    }

    fn persist_or_warn(&self, state: &QueueState) {
        if let Err(e) = self.storage.persist(state) {
            tracing::warn!(error = %e, "failed to persist pending queue, keeping in memory");
        }
    }
}
