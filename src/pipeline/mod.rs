// Batch cleaning pipeline: stage implementations and the run orchestrator

pub mod processing;
pub mod run;

pub use run::{report_only, CleanOutcome, Pipeline, PipelineOptions, RunReport};
