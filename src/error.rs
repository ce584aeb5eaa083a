use std::fmt;

use thiserror::Error;

use crate::domain::Column;

#[derive(Error, Debug)]
pub enum CleanerError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: expected {expected} fields, found {found}")]
    MalformedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("row {row}: column {column} has invalid value {value:?}")]
    InvalidValue {
        row: usize,
        column: Column,
        value: String,
    },

    #[error("expected header [{expected}], found [{found}]")]
    HeaderMismatch { expected: String, found: String },

    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Config(String),

    #[error("{0}")]
    Toml(#[from] toml::de::Error),
}

impl CleanerError {
    /// Taxonomy name printed in the `<stage>: <ErrorKind>: <detail>` line.
    pub fn kind(&self) -> &'static str {
        match self {
            CleanerError::Io(_) => "IOError",
            CleanerError::Csv(e) if e.is_io_error() => "IOError",
            CleanerError::Csv(_) => "CsvError",
            CleanerError::MalformedRow { .. } => "MalformedRowError",
            CleanerError::InvalidValue { .. } => "InvalidValueError",
            CleanerError::HeaderMismatch { .. } => "HeaderMismatchError",
            CleanerError::Json(_) => "ReportError",
            CleanerError::Config(_) | CleanerError::Toml(_) => "ConfigError",
        }
    }
}

pub type Result<T> = std::result::Result<T, CleanerError>;

/// Pipeline stage that raised a fatal error. The in-memory stages between
/// loading and export cannot fail and have no variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Config,
    Loader,
    Exporter,
    Report,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Config => "config",
            Stage::Loader => "loader",
            Stage::Exporter => "exporter",
            Stage::Report => "report",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("{stage}: {}: {error}", .error.kind())]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub error: CleanerError,
}

impl StageError {
    pub fn new(stage: Stage, error: impl Into<CleanerError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

/// Attach the failing stage to a library result.
pub trait StageContext<T> {
    fn at_stage(self, stage: Stage) -> std::result::Result<T, StageError>;
}

impl<T, E: Into<CleanerError>> StageContext<T> for std::result::Result<T, E> {
    fn at_stage(self, stage: Stage) -> std::result::Result<T, StageError> {
        self.map_err(|e| StageError::new(stage, e))
    }
}
