//! Mutation records and the pure functions that build them.
//!
//! Every profile call turns its arguments into a [`MutationRecord`]: one
//! action kind plus a payload with reserved names already filtered out.
//! Identity and auth fields are never part of a record; the dispatch gate
//! stamps them at send time.

mod builder;

pub use builder::{
    add_action, append_action, coerce_number, delete_action, remove_action, set_action,
    set_once_action, union_action, unset_action, MutationRecord, PropertyInput,
};
