pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;

// Domain data shapes shared across stages
pub mod domain;

pub use domain::{Column, DateValue, Record, Table};
pub use error::{CleanerError, Result, Stage, StageError};
pub use pipeline::{Pipeline, PipelineOptions, RunReport};
