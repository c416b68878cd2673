//! # Transformer Implementations
//!
//! The submodules contain the stages of the groundwater feature pipeline, grouped by task.

pub mod categorical_encoding;
pub mod datetime;
pub mod feature_selection;
pub mod geography;
pub mod imputation;
pub mod outlier_handling;
pub mod scaling;
