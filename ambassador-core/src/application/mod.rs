//! Application layer: orchestration over domain logic and infrastructure capabilities.

pub mod coordinator;
pub mod finalizer;
pub mod lifecycle;
pub mod monitoring;
pub mod workflow;

pub use coordinator::{sign_candidate, SignatureCoordinator};
pub use finalizer::{FinalizedTransition, Finalizer};
pub use lifecycle::{CompositeObserver, LifecycleObserver, LoggingObserver, NoopObserver};
pub use monitoring::SyncMonitor;
pub use workflow::{session_store_from_config, AmbassadorWorkflow, PendingTransition, WorkflowServices};
