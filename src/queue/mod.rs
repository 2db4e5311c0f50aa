//! Durable buffer for profile mutations made before identify.
//!
//! Merge-capable kinds (`$set`, `$set_once`, `$unset`, `$add`, `$union`)
//! coalesce into a single slot each. `$append` and `$remove` keep every item
//! in arrival order since the server has no concatenate primitive.
//!
//! # Example
//!
//! ```ignore
//! let queue = PendingQueue::open(Box::new(FileQueueStorage::open("./queue")?))?;
//! queue.enqueue(&set_action(("Plan", "gold")))?;
//! let record = queue.pop_from_queue(ActionKind::Set);
//! ```

mod pending;
mod state;
mod storage;

pub use pending::PendingQueue;
pub use state::QueueState;
pub use storage::{FileQueueStorage, MemoryQueueStorage, QueueStorage};
