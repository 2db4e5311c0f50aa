//! Serializable queue contents.

use crate::types::{ActionKind, Properties};
use serde::{Deserialize, Serialize};

/// Everything buffered before identify.
///
/// Merge-capable kinds hold one coalesced map each (an empty map means the
/// slot is absent). `$append` and `$remove` hold ordered sequences because
/// every item has to be replayed as its own request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueState {
    #[serde(default)]
    pub set: Properties,
    #[serde(default)]
    pub set_once: Properties,
    #[serde(default)]
    pub unset: Properties,
    #[serde(default)]
    pub add: Properties,
    #[serde(default)]
    pub union: Properties,
    #[serde(default)]
    pub append: Vec<Properties>,
    #[serde(default)]
    pub remove: Vec<Properties>,
}

impl QueueState {
    /// Slot for a merge-capable kind.
    pub fn slot(&self, kind: ActionKind) -> Option<&Properties> {
        match kind {
            ActionKind::Set => Some(&self.set),
            ActionKind::SetOnce => Some(&self.set_once),
            ActionKind::Unset => Some(&self.unset),
            ActionKind::Add => Some(&self.add),
            ActionKind::Union => Some(&self.union),
            ActionKind::Append | ActionKind::Remove | ActionKind::Delete => None,
        }
    }

    pub fn slot_mut(&mut self, kind: ActionKind) -> Option<&mut Properties> {
        match kind {
            ActionKind::Set => Some(&mut self.set),
            ActionKind::SetOnce => Some(&mut self.set_once),
            ActionKind::Unset => Some(&mut self.unset),
            ActionKind::Add => Some(&mut self.add),
            ActionKind::Union => Some(&mut self.union),
            ActionKind::Append | ActionKind::Remove | ActionKind::Delete => None,
        }
    }

    /// Ordered sequence for a list kind.
    pub fn sequence(&self, kind: ActionKind) -> Option<&Vec<Properties>> {
        match kind {
            ActionKind::Append => Some(&self.append),
            ActionKind::Remove => Some(&self.remove),
            _ => None,
        }
    }

    pub fn sequence_mut(&mut self, kind: ActionKind) -> Option<&mut Vec<Properties>> {
        match kind {
            ActionKind::Append => Some(&mut self.append),
            ActionKind::Remove => Some(&mut self.remove),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
            && self.set_once.is_empty()
            && self.unset.is_empty()
            && self.add.is_empty()
            && self.union.is_empty()
            && self.append.is_empty()
            && self.remove.is_empty()
    }

    /// Buffered records: one per non-empty slot plus one per list item.
    pub fn len(&self) -> usize {
        let slots = ActionKind::MERGE_CAPABLE
            .into_iter()
            .filter(|kind| self.slot(*kind).is_some_and(|s| !s.is_empty()))
            .count();
        slots + self.append.len() + self.remove.len()
    }
}
