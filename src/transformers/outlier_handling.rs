//! ## Outlier handling for altitude columns
//!
//! Station altitudes contain physically invalid values: far too high (data entry errors) or negative.
//! The [`AltitudeCleaner`] learns, per column, the maximum valid altitude and the most frequent altitude
//! within `[0, max]` from the reference table, then applies a fixed sequence:
//!
//! 1. cap values above the learned maximum to the maximum;
//! 2. replace negative values with the learned most frequent value;
//! 3. fill the values still missing with the learned mean.
//!
//! Each step assumes the previous ones already removed the invalid extremes.

use crate::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use crate::frame::{
    aggregate_row, as_float, coalesce_expr, column, float_values, project_with, scalar_f64,
    validate_columns,
};
use crate::impl_transformer;
use datafusion::functions_aggregate::expr_fn::{avg, count, max};
use datafusion::logical_expr::{lit, Case as DFCase, Expr};
use datafusion::prelude::*;
use std::collections::HashMap;

/// Parameters learned for one altitude column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AltitudeStats {
    pub max: f64,
    pub most_frequent: f64,
    pub mean: f64,
}

/// Negative values replaced by `replacement`, others unchanged.
fn repair_negative(value: Expr, replacement: f64) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(
            Box::new(value.clone().lt(lit(0.0))),
            Box::new(lit(replacement)),
        )],
        else_expr: Some(Box::new(value)),
    })
}

/// Most frequent non-negative value of a column; ties go to the smallest value.
async fn most_frequent(df: &DataFrame, name: &str) -> PiezoFeaturesResult<Option<f64>> {
    let batches = df
        .clone()
        .select(vec![as_float(column(name)).alias("value")])?
        .filter(column("value").gt_eq(lit(0.0)))?
        .aggregate(vec![column("value")], vec![count(lit(1)).alias("cnt")])?
        .sort(vec![
            column("cnt").sort(false, false),
            column("value").sort(true, false),
        ])?
        .limit(0, Some(1))?
        .collect()
        .await?;
    Ok(float_values(&batches, 0)?.into_iter().flatten().next())
}

impl AltitudeStats {
    fn expr(&self, name: &str) -> Expr {
        let value = as_float(column(name));
        let capped = Expr::Case(DFCase {
            expr: None,
            when_then_expr: vec![(
                Box::new(value.clone().gt(lit(self.max))),
                Box::new(lit(self.max)),
            )],
            else_expr: Some(Box::new(repair_negative(value, self.most_frequent))),
        });
        coalesce_expr(capped, lit(self.mean))
    }
}

/// Caps, repairs and fills altitude columns with parameters frozen at fit.
pub struct AltitudeCleaner {
    pub columns: Vec<String>,
    stats: HashMap<String, AltitudeStats>,
    fitted: bool,
}

impl AltitudeCleaner {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            stats: HashMap::new(),
            fitted: false,
        }
    }

    /// Builds an already-fitted cleaner from known parameters.
    pub fn from_stats(stats: HashMap<String, AltitudeStats>) -> Self {
        let mut columns: Vec<String> = stats.keys().cloned().collect();
        columns.sort();
        Self {
            columns,
            stats,
            fitted: true,
        }
    }

    pub fn stats(&self) -> &HashMap<String, AltitudeStats> {
        &self.stats
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PiezoFeaturesResult<()> {
        validate_columns(df, &self.columns)?;
        if self.columns.is_empty() {
            self.stats.clear();
            self.fitted = true;
            return Ok(());
        }
        let maxes = aggregate_row(
            df,
            self.columns
                .iter()
                .enumerate()
                .map(|(i, name)| max(as_float(column(name))).alias(format!("max_{}", i)))
                .collect(),
        )
        .await?;
        let mut bounds = Vec::with_capacity(self.columns.len());
        for (i, name) in self.columns.iter().enumerate() {
            // Every value is at most the column maximum, so the valid range is the non-negative part.
            let learned = match (scalar_f64(&maxes, i)?, most_frequent(df, name).await?) {
                (Some(upper), Some(mode)) => (upper, mode),
                _ => {
                    return Err(PiezoFeaturesError::InvalidParameter(format!(
                        "Column '{}' has no non-negative altitude to learn from",
                        name
                    )))
                }
            };
            bounds.push(learned);
        }
        // The mean is taken after negatives are replaced by the most frequent value.
        let means = aggregate_row(
            df,
            self.columns
                .iter()
                .zip(&bounds)
                .enumerate()
                .map(|(i, (name, (_, mode)))| {
                    avg(repair_negative(as_float(column(name)), *mode)).alias(format!("mean_{}", i))
                })
                .collect(),
        )
        .await?;
        let mut learned = HashMap::new();
        for (i, (name, (upper, mode))) in self.columns.iter().zip(bounds).enumerate() {
            let column_stats = AltitudeStats {
                max: upper,
                most_frequent: mode,
                mean: scalar_f64(&means, i)?.unwrap_or(mode),
            };
            tracing::debug!(column = %name, stats = ?column_stats, "learned altitude parameters");
            learned.insert(name.clone(), column_stats);
        }
        self.stats = learned;
        self.fitted = true;
        Ok(())
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        if !self.fitted {
            return Err(PiezoFeaturesError::FitNotCalled);
        }
        validate_columns(&df, &self.columns)?;
        let replacements: HashMap<String, Expr> = self
            .stats
            .iter()
            .map(|(name, s)| (name.clone(), s.expr(name)))
            .collect();
        project_with(df, &replacements, &[])
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

impl_transformer!(AltitudeCleaner);
