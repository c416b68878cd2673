mod common;

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use common::{collect_by_id, column_names, create_dataframe};
use piezo_features::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use piezo_features::transformers::feature_selection::{DropFeatures, DropHighMissingRate};

async fn sparse_dataframe() -> datafusion::prelude::DataFrame {
    create_dataframe(vec![
        ("id", Arc::new(Int64Array::from(vec![1, 2, 3, 4, 5])) as ArrayRef),
        (
            "meteo_temperature_max",
            Arc::new(Float64Array::from(vec![
                Some(12.0),
                None,
                None,
                None,
                None,
            ])),
        ),
        (
            "meteo_rain_height",
            Arc::new(Float64Array::from(vec![
                Some(1.0),
                Some(0.0),
                None,
                Some(3.5),
                Some(2.0),
            ])),
        ),
        (
            "meteo_name",
            Arc::new(StringArray::from(vec!["A", "B", "C", "D", "E"])),
        ),
    ])
    .await
}

#[tokio::test]
async fn test_drop_high_missing_rate() -> PiezoFeaturesResult<()> {
    let df = sparse_dataframe().await;
    let mut dropper = DropHighMissingRate::new(0.5);
    dropper.fit(&df).await?;
    assert_eq!(dropper.drop_columns(), ["meteo_temperature_max".to_string()]);

    let batch = collect_by_id(dropper.transform(df).await?).await?;
    assert_eq!(
        column_names(&batch),
        vec!["id", "meteo_rain_height", "meteo_name"]
    );
    Ok(())
}

#[tokio::test]
async fn test_drop_high_missing_rate_tolerates_absent_columns() -> PiezoFeaturesResult<()> {
    let df = sparse_dataframe().await;
    let mut dropper = DropHighMissingRate::new(0.5);
    dropper.fit(&df).await?;

    let other = df.drop_columns(&["meteo_temperature_max"])?;
    let batch = collect_by_id(dropper.transform(other).await?).await?;
    assert_eq!(batch.num_columns(), 3);
    Ok(())
}

#[tokio::test]
async fn test_drop_high_missing_rate_is_idempotent() -> PiezoFeaturesResult<()> {
    let df = sparse_dataframe().await;
    let mut dropper = DropHighMissingRate::new(0.5);
    dropper.fit(&df).await?;

    let once = collect_by_id(dropper.transform(df.clone()).await?).await?;
    let twice = collect_by_id(dropper.transform(dropper.transform(df).await?).await?).await?;
    assert_eq!(once, twice);
    Ok(())
}

#[tokio::test]
async fn test_drop_high_missing_rate_rejects_invalid_rate() {
    let df = sparse_dataframe().await;
    let mut dropper = DropHighMissingRate::new(1.5);
    let result = dropper.fit(&df).await;
    assert!(matches!(result, Err(PiezoFeaturesError::InvalidParameter(_))));
}

#[tokio::test]
async fn test_drop_high_missing_rate_requires_fit() {
    let df = sparse_dataframe().await;
    let dropper = DropHighMissingRate::new(0.5);
    let result = dropper.transform(df).await;
    assert!(matches!(result, Err(PiezoFeaturesError::FitNotCalled)));
}

#[tokio::test]
async fn test_drop_features_ignores_unknown_names() -> PiezoFeaturesResult<()> {
    let df = sparse_dataframe().await;
    let mut dropper = DropFeatures::new(vec![
        "meteo_name".to_string(),
        "piezo_station_bss_code".to_string(),
    ]);
    dropper.fit(&df).await?;
    let batch = collect_by_id(dropper.transform(df).await?).await?;
    assert_eq!(
        column_names(&batch),
        vec!["id", "meteo_temperature_max", "meteo_rain_height"]
    );
    Ok(())
}

#[tokio::test]
async fn test_drop_features_refuses_to_empty_the_table() {
    let df = create_dataframe(vec![(
        "meteo_name",
        Arc::new(StringArray::from(vec!["A"])) as ArrayRef,
    )])
    .await;
    let dropper = DropFeatures::new(vec!["meteo_name".to_string()]);
    let result = dropper.transform(df).await;
    assert!(matches!(result, Err(PiezoFeaturesError::InvalidParameter(_))));
}

#[tokio::test]
async fn test_nan_counts_as_missing() -> PiezoFeaturesResult<()> {
    let df = create_dataframe(vec![
        ("id", Arc::new(Int64Array::from(vec![1, 2, 3, 4])) as ArrayRef),
        (
            "meteo_evapotranspiration_grid",
            Arc::new(Float64Array::from(vec![
                Some(f64::NAN),
                Some(f64::NAN),
                None,
                Some(1.5),
            ])),
        ),
    ])
    .await;
    let mut dropper = DropHighMissingRate::new(0.5);
    dropper.fit(&df).await?;
    assert_eq!(
        dropper.drop_columns(),
        ["meteo_evapotranspiration_grid".to_string()]
    );
    let batch = collect_by_id(dropper.transform(df).await?).await?;
    assert_eq!(column_names(&batch), vec!["id"]);
    Ok(())
}
