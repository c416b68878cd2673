//! ## Geographic normalization
//!
//! The weather-station coordinates of the upstream table are stored transposed: `meteo_latitude`
//! holds longitudes and `meteo_longitude` holds latitudes. [`GeoNormalizer`] swaps them back,
//! replaces the piezometer-to-station distance with a binary "near weather station" indicator and
//! drops the coordinate columns the indicator makes redundant.

use crate::columns::{self, DISTANCE_PIEZO_METEO, METEO_LATITUDE, METEO_LONGITUDE};
use crate::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use crate::frame::{
    as_float, collect_float_column, column, drop_existing, has_column, project_with,
    validate_columns,
};
use crate::impl_transformer;
use crate::stats;
use datafusion::logical_expr::{lit, Case as DFCase, Expr};
use datafusion::prelude::*;
use std::collections::HashMap;

/// Quantile of the distance distribution used as the default "near" threshold.
pub const NEAR_STATION_QUANTILE: f64 = 0.95;

/// Swaps the transposed station coordinates, thresholds the distance column and drops redundant
/// coordinates.
///
/// A row is "near" (`1`) when its distance is at most the threshold, `0` otherwise; a missing distance
/// stays missing. The threshold is the 95th percentile of the reference distances unless fixed with
/// [`GeoNormalizer::with_threshold`].
pub struct GeoNormalizer {
    pub distance_column: String,
    pub apply_threshold: bool,
    pub drop_columns: Vec<String>,
    fixed_threshold: Option<f64>,
    threshold: Option<f64>,
    fitted: bool,
}

impl Default for GeoNormalizer {
    fn default() -> Self {
        Self::new(columns::redundant_geo_columns())
    }
}

impl GeoNormalizer {
    /// The coordinate swap is only visible in the output when `drop_columns` keeps
    /// `meteo_latitude` and `meteo_longitude`; the default drop list removes both.
    pub fn new(drop_columns: Vec<String>) -> Self {
        Self {
            distance_column: DISTANCE_PIEZO_METEO.to_string(),
            apply_threshold: true,
            drop_columns,
            fixed_threshold: None,
            threshold: None,
            fitted: false,
        }
    }

    pub fn with_threshold(mut self, threshold: Option<f64>) -> Self {
        self.fixed_threshold = threshold;
        self
    }

    pub fn with_apply_threshold(mut self, apply: bool) -> Self {
        self.apply_threshold = apply;
        self
    }

    /// Threshold in use after fit (fixed or learned).
    pub fn threshold(&self) -> Option<f64> {
        self.threshold
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PiezoFeaturesResult<()> {
        self.threshold = None;
        if self.apply_threshold {
            let threshold = match self.fixed_threshold {
                Some(t) => t,
                None => {
                    let distances =
                        stats::present(&collect_float_column(df, &self.distance_column).await?);
                    stats::quantile(&distances, NEAR_STATION_QUANTILE).ok_or_else(|| {
                        PiezoFeaturesError::InvalidParameter(format!(
                            "Column '{}' has no distance to learn a threshold from",
                            self.distance_column
                        ))
                    })?
                }
            };
            tracing::debug!(column = %self.distance_column, threshold, "near weather station threshold");
            self.threshold = Some(threshold);
        }
        self.fitted = true;
        Ok(())
    }

    fn near_expr(&self, threshold: f64) -> Expr {
        let distance = as_float(column(&self.distance_column));
        Expr::Case(DFCase {
            expr: None,
            when_then_expr: vec![
                (
                    Box::new(distance.clone().lt_eq(lit(threshold))),
                    Box::new(lit(1i32)),
                ),
                (Box::new(distance.gt(lit(threshold))), Box::new(lit(0i32))),
            ],
            else_expr: None,
        })
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        if !self.fitted {
            return Err(PiezoFeaturesError::FitNotCalled);
        }
        let mut replacements: HashMap<String, Expr> = HashMap::new();
        if has_column(&df, METEO_LATITUDE) && has_column(&df, METEO_LONGITUDE) {
            replacements.insert(METEO_LATITUDE.to_string(), column(METEO_LONGITUDE));
            replacements.insert(METEO_LONGITUDE.to_string(), column(METEO_LATITUDE));
        } else {
            tracing::debug!("station coordinates absent; nothing to swap");
        }
        if let Some(threshold) = self.threshold {
            validate_columns(&df, &[self.distance_column.clone()])?;
            replacements.insert(self.distance_column.clone(), self.near_expr(threshold));
        }
        let df = project_with(df, &replacements, &[])?;
        drop_existing(df, &self.drop_columns)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(GeoNormalizer);
