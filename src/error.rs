use std::path::PathBuf;

#[cfg(feature = "python")]
use pyo3::exceptions::PyRuntimeError;
#[cfg(feature = "python")]
use pyo3::PyErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Failed to load {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Cannot parse {column} value '{value}': {reason}")]
    Parse {
        column: String,
        value: String,
        reason: String,
    },

    #[error("Zone label '{label}' of feature {feature} is not a valid zone key")]
    ZoneKey { feature: usize, label: String },

    #[error("Invalid period range [{lo}, {hi}]")]
    Range { lo: i64, hi: i64 },

    #[error("Zone {zone} in column {column} is missing from the zone index")]
    UnknownZone { column: String, zone: i64 },

    #[error("Config: {0}")]
    Config(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SurveyError {
    pub(crate) fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SurveyError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(column: &str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        SurveyError::Parse {
            column: column.to_string(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(feature = "python")]
impl From<SurveyError> for PyErr {
    fn from(err: SurveyError) -> PyErr {
        PyRuntimeError::new_err(err.to_string())
    }
}
