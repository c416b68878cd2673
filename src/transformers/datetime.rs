//! ## Cyclical encoding of date and time columns
//!
//! Calendar and clock values are cyclical: day 365 is next to day 1 and hour 23 is next to hour 0.
//! The [`CyclicalDateEncoder`] replaces them by their cosine on the matching cycle:
//!
//! - the primary date column becomes `cos(2π · day_of_year / 365.25)`;
//! - every other column whose name contains `"date"` is dropped;
//! - every column whose name contains `"time"` becomes `cos(2π · hour / 24)`.
//!
//! Values that cannot be parsed as dates or numbers become nulls instead of failing the query.

use crate::columns::METEO_DATE;
use crate::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use crate::frame::{as_float, column, date_part_of};
use crate::impl_transformer;
use datafusion::dataframe::DataFrame;
use datafusion_expr::{lit, Expr};
use datafusion_functions::math;
use std::f64::consts::PI;

pub const DAYS_PER_YEAR: f64 = 365.25;
pub const HOURS_PER_DAY: f64 = 24.0;

/// Builds `cos(2π · value / period)`.
fn cosine_expr(value: Expr, period: f64) -> Expr {
    math::cos().call(vec![value * lit(2.0 * PI / period)])
}

/// Encodes the primary date column and `time` columns on their cycle, drops the other date columns.
///
/// The date and time columns are recorded at fit; `transform` only touches recorded columns that are
/// still present.
pub struct CyclicalDateEncoder {
    pub primary_date_column: String,
    pub output_name: Option<String>,
    date_columns: Vec<String>,
    time_columns: Vec<String>,
    fitted: bool,
}

impl Default for CyclicalDateEncoder {
    fn default() -> Self {
        Self::new(METEO_DATE)
    }
}

impl CyclicalDateEncoder {
    pub fn new(primary_date_column: &str) -> Self {
        Self {
            primary_date_column: primary_date_column.to_string(),
            output_name: None,
            date_columns: Vec::new(),
            time_columns: Vec::new(),
            fitted: false,
        }
    }

    /// Renames the encoded primary date column (for instance to `"date"`).
    pub fn with_output_name(mut self, name: &str) -> Self {
        self.output_name = Some(name.to_string());
        self
    }

    pub fn date_columns(&self) -> &[String] {
        &self.date_columns
    }

    pub fn time_columns(&self) -> &[String] {
        &self.time_columns
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PiezoFeaturesResult<()> {
        self.date_columns.clear();
        self.time_columns.clear();
        for field in df.schema().fields() {
            let name = field.name();
            if name.contains("date") {
                self.date_columns.push(name.to_string());
            } else if name.contains("time") {
                self.time_columns.push(name.to_string());
            }
        }
        tracing::debug!(
            dates = ?self.date_columns,
            times = ?self.time_columns,
            "recorded date and time columns"
        );
        self.fitted = true;
        Ok(())
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        if !self.fitted {
            return Err(PiezoFeaturesError::FitNotCalled);
        }
        let mut exprs: Vec<Expr> = Vec::new();
        for field in df.schema().fields() {
            let name = field.name();
            if self.date_columns.contains(name) {
                if name == &self.primary_date_column {
                    let output = self.output_name.as_deref().unwrap_or(name);
                    let day_of_year = date_part_of("doy", column(name));
                    exprs.push(cosine_expr(day_of_year, DAYS_PER_YEAR).alias(output));
                }
            } else if self.time_columns.contains(name) {
                exprs.push(cosine_expr(as_float(column(name)), HOURS_PER_DAY).alias(name));
            } else {
                exprs.push(column(name));
            }
        }
        if exprs.is_empty() {
            return Err(PiezoFeaturesError::InvalidParameter(
                "Encoding dates would result in an empty DataFrame.".to_string(),
            ));
        }
        df.select(exprs).map_err(PiezoFeaturesError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(CyclicalDateEncoder);
