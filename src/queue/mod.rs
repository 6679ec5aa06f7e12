//! Call queue: contact priority, retry spacing and the coordinator that
//! combines them over an agent's lead pool.

mod coordinator;
mod priority;
mod retry;

pub use coordinator::{CallQueueCoordinator, QueueStatus};
pub use priority::{RankedLead, rank, score};
pub use retry::{ceiling, next_delay};
