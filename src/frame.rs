//! ## DataFrame helpers shared by the transformers
//!
//! - Schema queries (`has_column`, `validate_columns`, `column_names`).
//! - Lossless-or-null coercions (`as_float`, `as_text`, `as_timestamp`): malformed values become nulls
//!   instead of failing the query, and `as_float` also turns `NaN` into null.
//! - Single-row aggregate queries and their scalar results for fit-time statistics.
//! - Expression builders for frozen lookups (`CASE key WHEN ...`) and for table-local group
//!   statistics (aggregate, then left-join back onto the table).

use crate::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use datafusion::arrow::array::{Array, Float64Array, StringArray};
use datafusion::arrow::datatypes::{DataType, TimeUnit};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::functions_aggregate::expr_fn::count;
use datafusion::logical_expr::{cast, ident, lit, not, try_cast, Case as DFCase, Expr};
use datafusion::prelude::*;
use datafusion::scalar::ScalarValue;
use datafusion_functions::datetime::date_part;
use datafusion_functions::math::expr_fn::isnan;
use std::collections::HashMap;

/// Unqualified column reference that is not parsed for `.` qualifiers.
pub fn column(name: &str) -> Expr {
    ident(name)
}

pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.schema().field_with_name(None, name).is_ok()
}

/// Validates that every column in `target_cols` exists in the DataFrame.
pub fn validate_columns(df: &DataFrame, target_cols: &[String]) -> PiezoFeaturesResult<()> {
    for col_name in target_cols {
        if !has_column(df, col_name) {
            return Err(PiezoFeaturesError::MissingColumn(format!(
                "Column '{}' not found in DataFrame",
                col_name
            )));
        }
    }
    Ok(())
}

pub fn data_type(df: &DataFrame, name: &str) -> PiezoFeaturesResult<DataType> {
    df.schema()
        .field_with_name(None, name)
        .map(|f| f.data_type().clone())
        .map_err(|_| {
            PiezoFeaturesError::MissingColumn(format!("Column '{}' not found in DataFrame", name))
        })
}

/// Drops the listed columns that exist; names absent from the DataFrame are ignored.
pub fn drop_existing(df: DataFrame, drop: &[String]) -> PiezoFeaturesResult<DataFrame> {
    let keep: Vec<Expr> = df
        .schema()
        .fields()
        .iter()
        .filter(|f| !drop.contains(f.name()))
        .map(|f| column(f.name()))
        .collect();
    if keep.is_empty() {
        return Err(PiezoFeaturesError::InvalidParameter(
            "Dropping these columns would result in an empty DataFrame.".to_string(),
        ));
    }
    df.select(keep).map_err(PiezoFeaturesError::from)
}

/// Re-projects every column of `df` in order, replacing those found in `replacements`.
/// Columns whose name is in `hidden` (helper columns from joins) are left out.
pub fn project_with(
    df: DataFrame,
    replacements: &HashMap<String, Expr>,
    hidden: &[String],
) -> PiezoFeaturesResult<DataFrame> {
    let exprs: Vec<Expr> = df
        .schema()
        .fields()
        .iter()
        .filter(|f| !hidden.contains(f.name()))
        .map(|f| match replacements.get(f.name()) {
            Some(expr) => expr.clone().alias(f.name()),
            None => column(f.name()),
        })
        .collect();
    df.select(exprs).map_err(PiezoFeaturesError::from)
}

/// `value` when it is not null, `fallback` otherwise.
pub fn coalesce_expr(value: Expr, fallback: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(not(value.clone().is_null())), Box::new(value))],
        else_expr: Some(Box::new(fallback)),
    })
}

/// `CASE key WHEN k1 THEN v1 ... END`; a typed null when there is no branch.
pub fn case_on(key: Expr, branches: Vec<(Expr, Expr)>, null_type: &ScalarValue) -> Expr {
    if branches.is_empty() {
        return lit(null_type.clone());
    }
    Expr::Case(DFCase {
        expr: Some(Box::new(key)),
        when_then_expr: branches
            .into_iter()
            .map(|(when, then)| (Box::new(when), Box::new(then)))
            .collect(),
        else_expr: None,
    })
}

pub fn null_f64() -> ScalarValue {
    ScalarValue::Float64(None)
}

/// Null where a float expression is `NaN`, the value otherwise.
pub fn null_if_nan(e: Expr) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(Box::new(isnan(e.clone())), Box::new(lit(null_f64())))],
        else_expr: Some(Box::new(e)),
    })
}

/// Float64 view of a column: unparseable values and `NaN` are both missing.
pub fn as_float(e: Expr) -> Expr {
    null_if_nan(try_cast(e, DataType::Float64))
}

pub fn as_text(e: Expr) -> Expr {
    try_cast(e, DataType::Utf8)
}

pub fn as_timestamp(e: Expr) -> Expr {
    try_cast(e, DataType::Timestamp(TimeUnit::Nanosecond, None))
}

/// Extracts a calendar field (`"month"`, `"doy"`, ...) from a date-like column as Float64.
/// Values that cannot be read as timestamps yield nulls.
pub fn date_part_of(part: &str, e: Expr) -> Expr {
    cast(
        date_part().call(vec![lit(part), as_timestamp(e)]),
        DataType::Float64,
    )
}

/// Selects `exprs` from the DataFrame and executes the query.
pub async fn collect_exprs(df: &DataFrame, exprs: Vec<Expr>) -> PiezoFeaturesResult<Vec<RecordBatch>> {
    let batches = df.clone().select(exprs)?.collect().await?;
    Ok(batches)
}

/// Reads column `index` of every batch as Float64 values.
pub fn float_values(batches: &[RecordBatch], index: usize) -> PiezoFeaturesResult<Vec<Option<f64>>> {
    let mut values = Vec::new();
    for batch in batches {
        let array = batch
            .column(index)
            .as_any()
            .downcast_ref::<Float64Array>()
            .ok_or_else(|| {
                PiezoFeaturesError::DataFusionError(datafusion::error::DataFusionError::Plan(
                    format!("Expected Float64 array at position {}", index),
                ))
            })?;
        values.extend(array.iter());
    }
    Ok(values)
}

/// Reads column `index` of every batch as Utf8 values.
pub fn text_values(batches: &[RecordBatch], index: usize) -> PiezoFeaturesResult<Vec<Option<String>>> {
    let mut values = Vec::new();
    for batch in batches {
        let array = batch
            .column(index)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                PiezoFeaturesError::DataFusionError(datafusion::error::DataFusionError::Plan(
                    format!("Expected Utf8 array at position {}", index),
                ))
            })?;
        for i in 0..array.len() {
            if array.is_null(i) {
                values.push(None);
            } else {
                values.push(Some(array.value(i).to_string()));
            }
        }
    }
    Ok(values)
}

/// Materializes one column coerced to Float64.
pub async fn collect_float_column(df: &DataFrame, name: &str) -> PiezoFeaturesResult<Vec<Option<f64>>> {
    validate_columns(df, &[name.to_string()])?;
    let batches = collect_exprs(df, vec![as_float(column(name))]).await?;
    float_values(&batches, 0)
}

/// Runs `aggregates` over the whole DataFrame and returns the single result row.
pub async fn aggregate_row(df: &DataFrame, aggregates: Vec<Expr>) -> PiezoFeaturesResult<RecordBatch> {
    let batches = df.clone().aggregate(vec![], aggregates)?.collect().await?;
    batches
        .into_iter()
        .find(|b| b.num_rows() > 0)
        .ok_or_else(|| {
            PiezoFeaturesError::DataFusionError(datafusion::error::DataFusionError::Plan(
                "Aggregate query returned no rows".to_string(),
            ))
        })
}

/// Reads row 0 of column `index` as a float; null aggregates (empty input) give `None`.
pub fn scalar_f64(batch: &RecordBatch, index: usize) -> PiezoFeaturesResult<Option<f64>> {
    match ScalarValue::try_from_array(batch.column(index), 0)? {
        ScalarValue::Float64(v) => Ok(v),
        other => Err(PiezoFeaturesError::DataFusionError(
            datafusion::error::DataFusionError::Plan(format!(
                "Expected a Float64 aggregate, got {:?}",
                other
            )),
        )),
    }
}

fn scalar_count(batch: &RecordBatch, index: usize) -> PiezoFeaturesResult<usize> {
    match ScalarValue::try_from_array(batch.column(index), 0)? {
        ScalarValue::Int64(Some(n)) => Ok(n.max(0) as usize),
        ScalarValue::UInt64(Some(n)) => Ok(n as usize),
        other => Err(PiezoFeaturesError::DataFusionError(
            datafusion::error::DataFusionError::Plan(format!(
                "Unexpected count value {:?}",
                other
            )),
        )),
    }
}

/// Fraction of missing entries of each named column, computed in a single aggregate query.
/// Nulls are missing, and so is `NaN` in float columns.
pub async fn missing_fractions(
    df: &DataFrame,
    names: &[String],
) -> PiezoFeaturesResult<Vec<(String, f64)>> {
    if names.is_empty() {
        return Ok(Vec::new());
    }
    validate_columns(df, names)?;
    let mut aggregates = vec![count(lit(1)).alias("__rows")];
    for (i, name) in names.iter().enumerate() {
        let value = if data_type(df, name)?.is_floating() {
            null_if_nan(column(name))
        } else {
            column(name)
        };
        aggregates.push(count(value).alias(format!("__present_{}", i)));
    }
    let batch = aggregate_row(df, aggregates).await?;
    let rows = scalar_count(&batch, 0)?;
    let mut fractions = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        let present = scalar_count(&batch, i + 1)?;
        fractions.push((
            name.clone(),
            crate::stats::missing_fraction(rows.saturating_sub(present), rows),
        ));
    }
    Ok(fractions)
}

/// Aggregates `aggregates` per group of `keys` and left-joins the result back onto `df`.
///
/// Group keys come back as `__{tag}_key_{i}` columns and each aggregate under its given alias;
/// the returned list holds every helper column name so callers can project them away.
/// Rows whose key is null or unseen get null aggregates.
pub fn join_group_aggregates(
    df: DataFrame,
    keys: &[&str],
    aggregates: Vec<(String, Expr)>,
    tag: &str,
) -> PiezoFeaturesResult<(DataFrame, Vec<String>)> {
    let key_aliases: Vec<String> = (0..keys.len())
        .map(|i| format!("__{}_key_{}", tag, i))
        .collect();
    let group_exprs: Vec<Expr> = keys
        .iter()
        .zip(&key_aliases)
        .map(|(k, alias)| column(k).alias(alias))
        .collect();
    let mut helper_columns = key_aliases.clone();
    let aggr_exprs: Vec<Expr> = aggregates
        .into_iter()
        .map(|(alias, expr)| {
            helper_columns.push(alias.clone());
            expr.alias(alias)
        })
        .collect();
    let stats = df.clone().aggregate(group_exprs, aggr_exprs)?;
    let right: Vec<&str> = key_aliases.iter().map(String::as_str).collect();
    let joined = df.join(stats, JoinType::Left, keys, &right, None)?;
    Ok((joined, helper_columns))
}
