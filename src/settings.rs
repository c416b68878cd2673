//! ## Pipeline configuration
//!
//! [`PipelineConfig`] gathers the constructor-level options of every stage of the canonical
//! groundwater pipeline (see [`crate::presets::piezo_pipeline`]). Defaults reproduce the reference
//! cleaning policy; builder methods override individual options.

use crate::columns;
use crate::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use crate::transformers::categorical_encoding::VocabularyMode;
use crate::transformers::imputation::ImputationMode;
use crate::transformers::scaling::ColumnSelection;

/// Options of the canonical pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Columns missing in a larger fraction of the reference rows are dropped.
    pub missing_rate_threshold: f64,
    /// Rainfall and INSEE columns imputed by department (and month for rainfall).
    pub clean_feature_columns: Vec<String>,
    /// Whether the per-department medians are recomputed on every table or frozen at fit.
    pub imputation_mode: ImputationMode,
    /// Meteorological columns imputed by (department, date), then by date.
    pub meteo_threshold_columns: Vec<String>,
    /// Meteorological columns missing in a larger fraction of the transformed table are dropped.
    pub meteo_max_missing_rate: f64,
    pub altitude_columns: Vec<String>,
    pub primary_date_column: String,
    pub apply_distance_threshold: bool,
    /// Fixed "near weather station" distance; learned as the 95th percentile when `None`.
    pub distance_threshold: Option<f64>,
    pub geo_drop_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
    pub vocabulary_mode: VocabularyMode,
    /// Identifier columns dropped before encoding and scaling.
    pub drop_columns: Vec<String>,
    pub scale_columns: ColumnSelection,
    pub with_mean: bool,
    pub with_std: bool,
    /// Materialize the table between stages.
    pub checkpoints: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            missing_rate_threshold: 0.5,
            clean_feature_columns: columns::clean_feature_columns(),
            imputation_mode: ImputationMode::Local,
            meteo_threshold_columns: columns::meteo_threshold_columns(),
            meteo_max_missing_rate: 0.6,
            altitude_columns: columns::altitude_columns(),
            primary_date_column: columns::METEO_DATE.to_string(),
            apply_distance_threshold: true,
            distance_threshold: None,
            geo_drop_columns: columns::redundant_geo_columns(),
            categorical_columns: columns::categorical_columns(),
            vocabulary_mode: VocabularyMode::PerCall,
            drop_columns: columns::identifier_columns(),
            scale_columns: ColumnSelection::All,
            with_mean: true,
            with_std: true,
            checkpoints: true,
        }
    }
}

impl PipelineConfig {
    pub fn with_missing_rate_threshold(mut self, rate: f64) -> Self {
        self.missing_rate_threshold = rate;
        self
    }

    pub fn with_imputation_mode(mut self, mode: ImputationMode) -> Self {
        self.imputation_mode = mode;
        self
    }

    pub fn with_vocabulary_mode(mut self, mode: VocabularyMode) -> Self {
        self.vocabulary_mode = mode;
        self
    }

    pub fn with_distance_threshold(mut self, threshold: Option<f64>) -> Self {
        self.distance_threshold = threshold;
        self
    }

    pub fn with_categorical_columns(mut self, columns: Vec<String>) -> Self {
        self.categorical_columns = columns;
        self
    }

    pub fn with_drop_columns(mut self, columns: Vec<String>) -> Self {
        self.drop_columns = columns;
        self
    }

    pub fn with_scale_columns(mut self, selection: ColumnSelection) -> Self {
        self.scale_columns = selection;
        self
    }

    pub fn with_checkpoints(mut self, enabled: bool) -> Self {
        self.checkpoints = enabled;
        self
    }

    /// Checks rates and thresholds before any stage is built.
    pub fn validate(&self) -> PiezoFeaturesResult<()> {
        for (name, rate) in [
            ("missing_rate_threshold", self.missing_rate_threshold),
            ("meteo_max_missing_rate", self.meteo_max_missing_rate),
        ] {
            if !(0.0..=1.0).contains(&rate) {
                return Err(PiezoFeaturesError::InvalidParameter(format!(
                    "{} {} must be between 0 and 1",
                    name, rate
                )));
            }
        }
        if let Some(threshold) = self.distance_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(PiezoFeaturesError::InvalidParameter(format!(
                    "distance threshold {} must be a finite, non-negative number",
                    threshold
                )));
            }
        }
        if !self.with_mean && !self.with_std {
            tracing::warn!("standardization disabled: with_mean and with_std are both false");
        }
        Ok(())
    }
}
