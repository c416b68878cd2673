//! ## Feature Selection Transformers
//!
//! This module provides transformers that remove whole columns from the table.
//!
//! ### Available Transformers
//!
//! - [`DropFeatures`]: Removes a fixed list of columns (identifiers, free text).
//! - [`DropHighMissingRate`]: Removes the columns whose missing fraction on the reference table exceeds
//!   a threshold.
//!
//! Both tolerate schema drift: a column listed for removal but absent from the table is ignored.

use crate::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use crate::frame::{column_names, drop_existing, missing_fractions};
use crate::impl_transformer;
use datafusion::dataframe::DataFrame;

/// Removes the specified columns from the DataFrame.
pub struct DropFeatures {
    pub features: Vec<String>,
}

impl DropFeatures {
    pub fn new(features: Vec<String>) -> Self {
        Self { features }
    }

    pub async fn fit(&mut self, _df: &DataFrame) -> PiezoFeaturesResult<()> {
        Ok(())
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        let df = drop_existing(df, &self.features)?;
        tracing::debug!(columns = ?self.features, "dropped listed columns");
        Ok(df)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Removes the columns whose fraction of missing values on the reference table exceeds `rate`.
///
/// The set of columns is frozen at fit; `transform` drops exactly that set.
pub struct DropHighMissingRate {
    pub rate: f64,
    drop_columns: Vec<String>,
    fitted: bool,
}

impl DropHighMissingRate {
    pub fn new(rate: f64) -> Self {
        Self {
            rate,
            drop_columns: Vec::new(),
            fitted: false,
        }
    }

    /// Columns recorded at fit for removal, in table order.
    pub fn drop_columns(&self) -> &[String] {
        &self.drop_columns
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PiezoFeaturesResult<()> {
        if !(0.0..=1.0).contains(&self.rate) {
            return Err(PiezoFeaturesError::InvalidParameter(format!(
                "Missing rate threshold {} must be between 0 and 1",
                self.rate
            )));
        }
        let fractions = missing_fractions(df, &column_names(df)).await?;
        self.drop_columns = fractions
            .into_iter()
            .filter(|(_, fraction)| *fraction > self.rate)
            .map(|(name, _)| name)
            .collect();
        tracing::debug!(rate = self.rate, columns = ?self.drop_columns, "columns over the missing rate");
        self.fitted = true;
        Ok(())
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        if !self.fitted {
            return Err(PiezoFeaturesError::FitNotCalled);
        }
        drop_existing(df, &self.drop_columns)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(DropFeatures);
impl_transformer!(DropHighMissingRate);
