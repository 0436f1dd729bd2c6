//! Application layer - Generic services that use ports.

pub mod orchestrator;
pub mod pipeline;
pub mod scheduler;
pub mod workspace;

#[cfg(test)]
pub(crate) mod test_support;

pub use orchestrator::{BatchOrchestrator, SweepError};
pub use pipeline::{ItemPipeline, PipelineError};
pub use scheduler::{Scheduler, SchedulerHandle};
