pub mod aggregator;
pub mod audit;
pub mod cache;
pub mod coordinator;
pub mod handlers;
pub mod limiter;
pub mod orchestrator;
pub mod registry;
pub mod store;

pub use orchestrator::{AnalysisError, AnalysisOutcome, Orchestrator, OrchestratorSettings};
