//! Sales lead lifecycle: status transitions with their side effects applied
//! atomically, plus a prioritized call queue with escalating retries.

pub mod config;
pub mod error;
pub mod logging;
pub mod notify;
pub mod orchestrator;
pub mod pipeline;
pub mod queue;
pub mod response;
pub mod store;

pub use error::{FailureKind, OrchestratorError};
pub use orchestrator::{LifecycleOrchestrator, UpdateOutcome};
pub use queue::CallQueueCoordinator;
pub use response::Envelope;
