#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, Float64Array, Int32Array};
use arrow::compute::concat_batches;
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use datafusion::datasource::MemTable;
use datafusion::prelude::*;
use piezo_features::exceptions::PiezoFeaturesResult;

/// Registers the given columns as an in-memory table and returns it as a DataFrame.
pub async fn create_dataframe(columns: Vec<(&str, ArrayRef)>) -> DataFrame {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, array)| Field::new(*name, array.data_type().clone(), true))
        .collect();
    let schema = Arc::new(Schema::new(fields));
    let arrays: Vec<ArrayRef> = columns.into_iter().map(|(_, array)| array).collect();
    let batch = RecordBatch::try_new(schema.clone(), arrays).unwrap();
    let mem_table = MemTable::try_new(schema, vec![vec![batch]]).unwrap();
    let ctx = SessionContext::new();
    ctx.register_table("t", Arc::new(mem_table)).unwrap();
    ctx.table("t").await.unwrap()
}

/// Collects the DataFrame sorted by `id` into a single batch.
pub async fn collect_by_id(df: DataFrame) -> PiezoFeaturesResult<RecordBatch> {
    let fallback = Arc::new(df.schema().as_arrow().clone());
    let batches = df
        .sort(vec![col("id").sort(true, false)])?
        .collect()
        .await?;
    let schema = batches.first().map(|b| b.schema()).unwrap_or(fallback);
    Ok(concat_batches(&schema, &batches)?)
}

pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().to_string())
        .collect()
}

pub fn floats(batch: &RecordBatch, name: &str) -> Vec<Option<f64>> {
    let index = batch.schema().index_of(name).unwrap();
    batch
        .column(index)
        .as_any()
        .downcast_ref::<Float64Array>()
        .unwrap_or_else(|| panic!("column '{}' is not Float64", name))
        .iter()
        .collect()
}

pub fn ints(batch: &RecordBatch, name: &str) -> Vec<Option<i32>> {
    let index = batch.schema().index_of(name).unwrap();
    let array = batch
        .column(index)
        .as_any()
        .downcast_ref::<Int32Array>()
        .unwrap_or_else(|| panic!("column '{}' is not Int32", name));
    (0..array.len())
        .map(|i| (!array.is_null(i)).then(|| array.value(i)))
        .collect()
}

pub fn assert_floats_eq(actual: &[Option<f64>], expected: &[Option<f64>]) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        match (a, e) {
            (Some(a), Some(e)) => assert!(
                (a - e).abs() < 1e-9,
                "row {}: expected {}, got {}",
                i,
                e,
                a
            ),
            (None, None) => {}
            _ => panic!("row {}: expected {:?}, got {:?}", i, e, a),
        }
    }
}
