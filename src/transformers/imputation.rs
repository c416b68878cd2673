//! ## Transformers for imputing missing values
//!
//! This module provides the imputers of the groundwater pipeline.
//!
//! - **GroupMedianImputer**: rainfall is filled with the (department, month) mean learned at fit; the
//!   INSEE indicators are filled with the median of their department.
//! - **RegressionImputer**: fills a temperature from a correlated temperature with a line fitted at fit.
//! - **DepartmentDateImputer**: drops meteorological columns that are mostly missing, then fills the rest
//!   with the mean of the same (department, date), then of the same date.
//! - **MissingCategoryImputer**: replaces missing categories with an explicit `"missing"` category.
//!
//! Two statistic policies coexist and are named explicitly:
//!
//! - a *frozen* statistic is computed once at fit and reused unchanged by every transform;
//! - a *table-local* statistic is recomputed from the table being transformed.
//!
//! The department medians of [`GroupMedianImputer`] are table-local by default
//! ([`ImputationMode::Local`]) and frozen with [`ImputationMode::Frozen`]. The group means of
//! [`DepartmentDateImputer`] are always table-local, and so is its missing-rate check.

use crate::columns::{
    DEPARTMENT_CODE, METEO_RAIN_HEIGHT, METEO_TEMPERATURE_AVG, METEO_TEMPERATURE_AVG_THRESHOLD,
    METEO_TEMPERATURE_MIN, METEO_TEMPERATURE_MIN_GROUND, MISSING_CATEGORY, PIEZO_MEASUREMENT_DATE,
};
use crate::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use crate::frame::{
    aggregate_row, as_float, as_text, case_on, coalesce_expr, column, date_part_of, drop_existing,
    float_values, has_column, join_group_aggregates, missing_fractions, null_f64, project_with,
    scalar_f64, text_values, validate_columns,
};
use crate::impl_transformer;
use datafusion::functions_aggregate::expr_fn::{
    avg, median, regr_avgy, regr_intercept, regr_slope,
};
use datafusion::logical_expr::{lit, Expr};
use datafusion::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// Where a group statistic used at transform time comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImputationMode {
    /// Recomputed from the table passed to `transform`.
    #[default]
    Local,
    /// Learned at fit and reused unchanged.
    Frozen,
}

/// Imputes rainfall by (department, month) and INSEE indicators by department.
///
/// Every designated column is first coerced to Float64: tokens that are not numbers become missing.
pub struct GroupMedianImputer {
    pub columns: Vec<String>,
    pub mode: ImputationMode,
    pub department_column: String,
    pub date_column: String,
    rain_means: BTreeMap<String, BTreeMap<i64, f64>>,
    department_medians: HashMap<String, BTreeMap<String, f64>>,
    fitted: bool,
}

impl GroupMedianImputer {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            mode: ImputationMode::Local,
            department_column: DEPARTMENT_CODE.to_string(),
            date_column: PIEZO_MEASUREMENT_DATE.to_string(),
            rain_means: BTreeMap::new(),
            department_medians: HashMap::new(),
            fitted: false,
        }
    }

    pub fn with_mode(mut self, mode: ImputationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Learned mean rainfall per department and month.
    pub fn rain_means(&self) -> &BTreeMap<String, BTreeMap<i64, f64>> {
        &self.rain_means
    }

    /// Fit-time median per department of a non-rainfall column.
    pub fn department_medians(&self, column: &str) -> Option<&BTreeMap<String, f64>> {
        self.department_medians.get(column)
    }

    fn handles_rain(&self) -> bool {
        self.columns.iter().any(|c| c == METEO_RAIN_HEIGHT)
    }

    fn median_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.as_str() != METEO_RAIN_HEIGHT)
            .cloned()
            .collect()
    }

    fn required_columns(&self) -> Vec<String> {
        let mut required = self.columns.clone();
        required.push(self.department_column.clone());
        if self.handles_rain() {
            required.push(self.date_column.clone());
        }
        required
    }

    fn month_expr(&self) -> Expr {
        date_part_of("month", column(&self.date_column))
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PiezoFeaturesResult<()> {
        validate_columns(df, &self.required_columns())?;
        let department = as_text(column(&self.department_column)).alias("department");

        self.rain_means.clear();
        if self.handles_rain() {
            let batches = df
                .clone()
                .aggregate(
                    vec![department.clone(), self.month_expr().alias("month")],
                    vec![avg(as_float(column(METEO_RAIN_HEIGHT))).alias("mean")],
                )?
                .collect()
                .await?;
            let keys = text_values(&batches, 0)?.into_iter().zip(float_values(&batches, 1)?);
            for ((department, month), mean) in keys.zip(float_values(&batches, 2)?) {
                if let (Some(department), Some(month), Some(mean)) = (department, month, mean) {
                    self.rain_means
                        .entry(department)
                        .or_default()
                        .insert(month as i64, mean);
                }
            }
        }

        self.department_medians.clear();
        let median_columns = self.median_columns();
        if !median_columns.is_empty() {
            let aggregates: Vec<Expr> = median_columns
                .iter()
                .enumerate()
                .map(|(i, name)| median(as_float(column(name))).alias(format!("median_{}", i)))
                .collect();
            let batches = df
                .clone()
                .aggregate(vec![department], aggregates)?
                .collect()
                .await?;
            let departments = text_values(&batches, 0)?;
            for (i, name) in median_columns.iter().enumerate() {
                let medians: BTreeMap<String, f64> = departments
                    .iter()
                    .zip(float_values(&batches, i + 1)?)
                    .filter_map(|(department, m)| Some((department.clone()?, m?)))
                    .collect();
                self.department_medians.insert(name.clone(), medians);
            }
        }
        tracing::debug!(
            columns = ?self.columns,
            mode = ?self.mode,
            rain_groups = self.rain_means.len(),
            "learned group imputation statistics"
        );
        self.fitted = true;
        Ok(())
    }

    /// Frozen (department, month) rainfall mean; null for keys never seen at fit.
    fn rain_lookup(&self) -> Expr {
        let branches = self
            .rain_means
            .iter()
            .map(|(department, months)| {
                let by_month = months
                    .iter()
                    .map(|(month, mean)| (lit(*month as f64), lit(*mean)))
                    .collect();
                (
                    lit(department.as_str()),
                    case_on(self.month_expr(), by_month, &null_f64()),
                )
            })
            .collect();
        case_on(as_text(column(&self.department_column)), branches, &null_f64())
    }

    fn frozen_median_lookup(&self, name: &str) -> Expr {
        let branches = self
            .department_medians
            .get(name)
            .map(|medians| {
                medians
                    .iter()
                    .map(|(department, m)| (lit(department.as_str()), lit(*m)))
                    .collect()
            })
            .unwrap_or_default();
        case_on(as_text(column(&self.department_column)), branches, &null_f64())
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        if !self.fitted {
            return Err(PiezoFeaturesError::FitNotCalled);
        }
        validate_columns(&df, &self.required_columns())?;
        let median_columns = self.median_columns();
        let mut replacements: HashMap<String, Expr> = HashMap::new();
        if self.handles_rain() {
            replacements.insert(
                METEO_RAIN_HEIGHT.to_string(),
                coalesce_expr(as_float(column(METEO_RAIN_HEIGHT)), self.rain_lookup()),
            );
        }

        let (df, helpers) = match self.mode {
            ImputationMode::Frozen => {
                for name in &median_columns {
                    replacements.insert(
                        name.clone(),
                        coalesce_expr(as_float(column(name)), self.frozen_median_lookup(name)),
                    );
                }
                (df, Vec::new())
            }
            ImputationMode::Local if median_columns.is_empty() => (df, Vec::new()),
            ImputationMode::Local => {
                let aggregates: Vec<(String, Expr)> = median_columns
                    .iter()
                    .enumerate()
                    .map(|(i, name)| {
                        (
                            format!("__department_median_{}", i),
                            median(as_float(column(name))),
                        )
                    })
                    .collect();
                let (joined, helpers) = join_group_aggregates(
                    df,
                    &[self.department_column.as_str()],
                    aggregates,
                    "department",
                )?;
                for (i, name) in median_columns.iter().enumerate() {
                    replacements.insert(
                        name.clone(),
                        coalesce_expr(
                            as_float(column(name)),
                            column(&format!("__department_median_{}", i)),
                        ),
                    );
                }
                (joined, helpers)
            }
        };
        project_with(df, &replacements, &helpers)
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

/// One regression used by [`RegressionImputer`]: `target ≈ intercept + slope · predictor`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionPair {
    pub target: String,
    pub predictor: String,
}

impl RegressionPair {
    pub fn new(target: &str, predictor: &str) -> Self {
        Self {
            target: target.to_string(),
            predictor: predictor.to_string(),
        }
    }
}

/// Line `target = intercept + slope * predictor` fitted by least squares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    /// Builds the line from `regr_slope`, `regr_intercept` and `regr_avgy`.
    ///
    /// A constant predictor (or a single complete row) gives a flat line at the target mean; no complete
    /// row gives no line.
    fn from_aggregates(slope: Option<f64>, intercept: Option<f64>, mean_y: Option<f64>) -> Option<Self> {
        match (slope, intercept) {
            (Some(slope), Some(intercept)) => Some(Self { slope, intercept }),
            _ => mean_y.map(|intercept| Self {
                slope: 0.0,
                intercept,
            }),
        }
    }
}

/// Fills missing targets from a predictor with simple linear regressions fitted on the rows where
/// both are present. Rows lacking the predictor stay missing.
pub struct RegressionImputer {
    pub regressions: Vec<RegressionPair>,
    fits: Vec<Option<LinearFit>>,
    fitted: bool,
}

impl RegressionImputer {
    pub fn new(regressions: Vec<RegressionPair>) -> Self {
        Self {
            regressions,
            fits: Vec::new(),
            fitted: false,
        }
    }

    /// Average temperature from its threshold proxy, minimum ground temperature from minimum air
    /// temperature.
    pub fn temperature() -> Self {
        Self::new(vec![
            RegressionPair::new(METEO_TEMPERATURE_AVG, METEO_TEMPERATURE_AVG_THRESHOLD),
            RegressionPair::new(METEO_TEMPERATURE_MIN_GROUND, METEO_TEMPERATURE_MIN),
        ])
    }

    /// Fitted line for a target column, if the reference table had rows to fit it on.
    pub fn coefficients(&self, target: &str) -> Option<LinearFit> {
        self.regressions
            .iter()
            .zip(&self.fits)
            .find(|(pair, _)| pair.target == target)
            .and_then(|(_, fit)| *fit)
    }

    fn required_columns(&self) -> Vec<String> {
        self.regressions
            .iter()
            .flat_map(|r| [r.target.clone(), r.predictor.clone()])
            .collect()
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PiezoFeaturesResult<()> {
        validate_columns(df, &self.required_columns())?;
        self.fits.clear();
        if !self.regressions.is_empty() {
            let mut aggregates = Vec::with_capacity(3 * self.regressions.len());
            for (i, pair) in self.regressions.iter().enumerate() {
                let y = as_float(column(&pair.target));
                let x = as_float(column(&pair.predictor));
                aggregates.push(regr_slope(y.clone(), x.clone()).alias(format!("slope_{}", i)));
                aggregates.push(regr_intercept(y.clone(), x.clone()).alias(format!("intercept_{}", i)));
                aggregates.push(regr_avgy(y, x).alias(format!("mean_{}", i)));
            }
            let row = aggregate_row(df, aggregates).await?;
            for (i, pair) in self.regressions.iter().enumerate() {
                let fit = LinearFit::from_aggregates(
                    scalar_f64(&row, 3 * i)?,
                    scalar_f64(&row, 3 * i + 1)?,
                    scalar_f64(&row, 3 * i + 2)?,
                );
                match fit {
                    Some(fit) => tracing::debug!(target_column = %pair.target, ?fit, "fitted regression"),
                    None => tracing::warn!(
                        target_column = %pair.target,
                        predictor = %pair.predictor,
                        "no complete rows to fit the regression; target left as is"
                    ),
                }
                self.fits.push(fit);
            }
        }
        self.fitted = true;
        Ok(())
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        if !self.fitted {
            return Err(PiezoFeaturesError::FitNotCalled);
        }
        validate_columns(&df, &self.required_columns())?;
        let mut replacements: HashMap<String, Expr> = HashMap::new();
        for (pair, fit) in self.regressions.iter().zip(&self.fits) {
            let target = as_float(column(&pair.target));
            let expr = match fit {
                Some(fit) => coalesce_expr(
                    target,
                    lit(fit.intercept) + lit(fit.slope) * as_float(column(&pair.predictor)),
                ),
                None => target,
            };
            replacements.insert(pair.target.clone(), expr);
        }
        project_with(df, &replacements, &[])
    }

    fn inherent_is_stateful(&self) -> bool {
        true
    }
}

/// Drops the configured columns missing in more than `max_missing_rate` of the transformed table,
/// then fills the survivors with the mean of the same (department, date) group, then of the same date.
///
/// The missing-rate check and both group means are table-local: they are evaluated on every call.
pub struct DepartmentDateImputer {
    pub columns: Vec<String>,
    pub max_missing_rate: f64,
    pub department_column: String,
    pub date_column: String,
}

impl DepartmentDateImputer {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            max_missing_rate: 0.6,
            department_column: DEPARTMENT_CODE.to_string(),
            date_column: PIEZO_MEASUREMENT_DATE.to_string(),
        }
    }

    pub fn with_max_missing_rate(mut self, rate: f64) -> Self {
        self.max_missing_rate = rate;
        self
    }

    pub async fn fit(&mut self, _df: &DataFrame) -> PiezoFeaturesResult<()> {
        if !(0.0..=1.0).contains(&self.max_missing_rate) {
            return Err(PiezoFeaturesError::InvalidParameter(format!(
                "Maximum missing rate {} must be between 0 and 1",
                self.max_missing_rate
            )));
        }
        Ok(())
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        let present: Vec<String> = self
            .columns
            .iter()
            .filter(|c| has_column(&df, c))
            .cloned()
            .collect();
        let fractions = missing_fractions(&df, &present).await?;
        let (dropped, surviving): (Vec<_>, Vec<_>) = fractions
            .into_iter()
            .partition(|(_, fraction)| *fraction > self.max_missing_rate);
        let dropped: Vec<String> = dropped.into_iter().map(|(name, _)| name).collect();
        let surviving: Vec<String> = surviving.into_iter().map(|(name, _)| name).collect();
        tracing::debug!(dropped = ?dropped, imputed = ?surviving, "meteorological missing-rate check");

        let df = if dropped.is_empty() {
            df
        } else {
            drop_existing(df, &dropped)?
        };
        if surviving.is_empty() {
            return Ok(df);
        }
        validate_columns(
            &df,
            &[self.department_column.clone(), self.date_column.clone()],
        )?;

        let mean_of = |prefix: &str| -> Vec<(String, Expr)> {
            surviving
                .iter()
                .enumerate()
                .map(|(i, name)| (format!("{}_{}", prefix, i), avg(as_float(column(name)))))
                .collect()
        };
        let (df, mut helpers) = join_group_aggregates(
            df,
            &[self.department_column.as_str(), self.date_column.as_str()],
            mean_of("__department_date_mean"),
            "department_date",
        )?;
        let (df, date_helpers) = join_group_aggregates(
            df,
            &[self.date_column.as_str()],
            mean_of("__date_mean"),
            "date",
        )?;
        helpers.extend(date_helpers);

        let replacements: HashMap<String, Expr> = surviving
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let local = coalesce_expr(
                    as_float(column(name)),
                    column(&format!("__department_date_mean_{}", i)),
                );
                (
                    name.clone(),
                    coalesce_expr(local, column(&format!("__date_mean_{}", i))),
                )
            })
            .collect();
        project_with(df, &replacements, &helpers)
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

/// Replaces missing values of categorical columns with a sentinel category.
///
/// Columns absent from the table are skipped.
pub struct MissingCategoryImputer {
    pub columns: Vec<String>,
    pub fill_value: String,
}

impl MissingCategoryImputer {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            fill_value: MISSING_CATEGORY.to_string(),
        }
    }

    pub async fn fit(&mut self, _df: &DataFrame) -> PiezoFeaturesResult<()> {
        Ok(())
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        let replacements: HashMap<String, Expr> = self
            .columns
            .iter()
            .filter(|c| has_column(&df, c))
            .map(|c| {
                (
                    c.clone(),
                    coalesce_expr(as_text(column(c)), lit(self.fill_value.as_str())),
                )
            })
            .collect();
        project_with(df, &replacements, &[])
    }

    fn inherent_is_stateful(&self) -> bool {
        false
    }
}

impl_transformer!(GroupMedianImputer);
impl_transformer!(RegressionImputer);
impl_transformer!(DepartmentDateImputer);
impl_transformer!(MissingCategoryImputer);
