//! ## Partial standardization
//!
//! [`PartialStandardScaler`] standardizes a selection of columns, `z = (x - mean) / std`, with the mean
//! and the population standard deviation learned on the reference table. Columns outside the selection
//! are left untouched; the standardized columns are appended after them.
//!
//! Every selected column must be numeric. A string column in the selection is a configuration error and
//! fails fast with [`PiezoFeaturesError::NonNumericColumn`], both at fit and at transform.

use crate::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use crate::frame::{aggregate_row, as_float, column, column_names, data_type, scalar_f64, validate_columns};
use crate::impl_transformer;
use datafusion::dataframe::DataFrame;
use datafusion::functions_aggregate::expr_fn::{avg, stddev_pop};
use datafusion_expr::{lit, Expr};

/// Columns a scaler applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnSelection {
    /// Every column of the reference table.
    All,
    Columns(Vec<String>),
}

impl ColumnSelection {
    fn resolve(&self, df: &DataFrame) -> Vec<String> {
        match self {
            ColumnSelection::All => column_names(df),
            ColumnSelection::Columns(columns) => columns.clone(),
        }
    }
}

fn ensure_numeric(df: &DataFrame, columns: &[String]) -> PiezoFeaturesResult<()> {
    validate_columns(df, columns)?;
    for name in columns {
        if !data_type(df, name)?.is_numeric() {
            return Err(PiezoFeaturesError::NonNumericColumn(name.clone()));
        }
    }
    Ok(())
}

/// Standardizes the selected columns with means and scales frozen at fit.
pub struct PartialStandardScaler {
    pub selection: ColumnSelection,
    pub with_mean: bool,
    pub with_std: bool,
    columns: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
    fitted: bool,
}

impl PartialStandardScaler {
    pub fn new(selection: ColumnSelection) -> Self {
        Self {
            selection,
            with_mean: true,
            with_std: true,
            columns: Vec::new(),
            means: Vec::new(),
            scales: Vec::new(),
            fitted: false,
        }
    }

    pub fn with_mean(mut self, enabled: bool) -> Self {
        self.with_mean = enabled;
        self
    }

    pub fn with_std(mut self, enabled: bool) -> Self {
        self.with_std = enabled;
        self
    }

    /// Columns resolved at fit, in the order they are appended by `transform`.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Offsets subtracted from each column (0 when centering is disabled).
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Divisors applied to each column (1 when scaling is disabled or the column is constant).
    pub fn scales(&self) -> &[f64] {
        &self.scales
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PiezoFeaturesResult<()> {
        let columns = self.selection.resolve(df);
        ensure_numeric(df, &columns)?;
        let (mut means, mut scales) = (Vec::new(), Vec::new());
        if !columns.is_empty() {
            let aggregates: Vec<Expr> = columns
                .iter()
                .enumerate()
                .flat_map(|(i, name)| {
                    let value = as_float(column(name));
                    [
                        avg(value.clone()).alias(format!("mean_{}", i)),
                        stddev_pop(value).alias(format!("std_{}", i)),
                    ]
                })
                .collect();
            let row = aggregate_row(df, aggregates).await?;
            for i in 0..columns.len() {
                let mean = scalar_f64(&row, 2 * i)?.unwrap_or(0.0);
                let std = scalar_f64(&row, 2 * i + 1)?.unwrap_or(1.0);
                means.push(if self.with_mean { mean } else { 0.0 });
                scales.push(if self.with_std && std.is_finite() && std > 0.0 {
                    std
                } else {
                    1.0
                });
            }
        }
        self.means = means;
        self.scales = scales;
        tracing::debug!(columns = ?columns, "learned standardization parameters");
        self.columns = columns;
        self.fitted = true;
        Ok(())
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        if !self.fitted {
            return Err(PiezoFeaturesError::FitNotCalled);
        }
        ensure_numeric(&df, &self.columns)?;
        let mut exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .filter(|f| !self.columns.contains(f.name()))
            .map(|f| column(f.name()))
            .collect();
        for ((name, mean), scale) in self.columns.iter().zip(&self.means).zip(&self.scales) {
            let standardized = (as_float(column(name)) - lit(*mean)) / lit(*scale);
            exprs.push(standardized.alias(name));
        }
        df.select(exprs).map_err(PiezoFeaturesError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(PartialStandardScaler);
