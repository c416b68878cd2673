//! ## Custom Errors for the piezo feature pipeline
//!
//! This module defines the error type shared by every transformer and by the pipeline.
//! It uses the `thiserror` crate to derive the `Error` trait.
//!
//! Malformed values (unparseable dates or numbers) are never errors: they become missing values.
//! Errors are reserved for schema violations (a required column is absent or has the wrong type),
//! invalid configuration, and failures reported by DataFusion or Arrow.
//!
//! ### Example
//!
//! ```rust
//! use piezo_features::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
//!
//! fn check_rate(rate: f64) -> PiezoFeaturesResult<()> {
//!     if !(0.0..=1.0).contains(&rate) {
//!         return Err(PiezoFeaturesError::InvalidParameter(format!("rate {} out of range", rate)));
//!     }
//!     Ok(())
//! }
//! ```

use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use thiserror::Error;

/// Errors raised while fitting or applying the feature pipeline.
#[derive(Debug, Error)]
pub enum PiezoFeaturesError {
    /// Wraps errors from DataFusion.
    #[error("DataFusion error: {0}")]
    DataFusionError(#[from] DataFusionError),

    /// Wraps errors from Arrow.
    #[error("Arrow error: {0}")]
    ArrowError(#[from] ArrowError),

    /// An invalid parameter was provided (out-of-range rate, empty pipeline, and so on).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A column the transformer depends on does not exist in the DataFrame.
    #[error("Missing column: {0}")]
    MissingColumn(String),

    /// A column selected for standardization does not hold numeric values.
    #[error("Non-numeric column in standardization set: {0}")]
    NonNumericColumn(String),

    /// The transform method was called before fit for a stateful transformer.
    #[error("Transform called before fit for stateful transformer")]
    FitNotCalled,

    /// A pipeline stage failed; `source` holds the stage's own error.
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: Box<PiezoFeaturesError>,
    },
}

impl PiezoFeaturesError {
    /// Wraps an error with the name of the pipeline stage that produced it.
    pub fn in_stage(stage: &str, source: PiezoFeaturesError) -> Self {
        PiezoFeaturesError::Stage {
            stage: stage.to_string(),
            source: Box::new(source),
        }
    }

    /// Returns the innermost error, looking through `Stage` wrappers.
    pub fn root_cause(&self) -> &PiezoFeaturesError {
        match self {
            PiezoFeaturesError::Stage { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// A convenient result type for pipeline operations.
pub type PiezoFeaturesResult<T> = std::result::Result<T, PiezoFeaturesError>;
