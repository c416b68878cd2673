mod common;

use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, StringArray};
use common::{collect_by_id, column_names, create_dataframe, ints};
use datafusion::prelude::DataFrame;
use piezo_features::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use piezo_features::transformers::categorical_encoding::{OneHotEncoder, VocabularyMode};

async fn status_dataframe(values: Vec<Option<&str>>) -> DataFrame {
    let ids: Vec<i64> = (1..=values.len() as i64).collect();
    create_dataframe(vec![
        ("id", Arc::new(Int64Array::from(ids)) as ArrayRef),
        ("piezo_status", Arc::new(StringArray::from(values))),
    ])
    .await
}

#[tokio::test]
async fn test_one_hot_expands_categories() -> PiezoFeaturesResult<()> {
    let df = status_dataframe(vec![Some("b"), Some("a"), None]).await;
    let mut encoder = OneHotEncoder::new(vec!["piezo_status".to_string()]);
    encoder.fit(&df).await?;
    let batch = collect_by_id(encoder.transform(df).await?).await?;

    assert_eq!(
        column_names(&batch),
        vec!["id", "piezo_status_a", "piezo_status_b"]
    );
    assert_eq!(ints(&batch, "piezo_status_a"), vec![Some(0), Some(1), Some(0)]);
    assert_eq!(ints(&batch, "piezo_status_b"), vec![Some(1), Some(0), Some(0)]);
    Ok(())
}

#[tokio::test]
async fn test_per_call_vocabulary_diverges_between_tables() -> PiezoFeaturesResult<()> {
    let train = status_dataframe(vec![Some("a"), Some("b")]).await;
    let test = status_dataframe(vec![Some("b"), Some("c")]).await;
    let mut encoder = OneHotEncoder::new(vec!["piezo_status".to_string()]);
    encoder.fit(&train).await?;

    let train_columns = column_names(&collect_by_id(encoder.transform(train).await?).await?);
    let test_columns = column_names(&collect_by_id(encoder.transform(test).await?).await?);
    assert_eq!(train_columns, vec!["id", "piezo_status_a", "piezo_status_b"]);
    assert_eq!(test_columns, vec!["id", "piezo_status_b", "piezo_status_c"]);
    assert_ne!(train_columns, test_columns);
    Ok(())
}

#[tokio::test]
async fn test_frozen_vocabulary_keeps_the_column_set() -> PiezoFeaturesResult<()> {
    let train = status_dataframe(vec![Some("a"), Some("b")]).await;
    let test = status_dataframe(vec![Some("b"), Some("c")]).await;
    let mut encoder =
        OneHotEncoder::new(vec!["piezo_status".to_string()]).with_mode(VocabularyMode::Frozen);
    encoder.fit(&train).await?;
    assert_eq!(
        encoder.categories("piezo_status"),
        Some(["a".to_string(), "b".to_string()].as_slice())
    );

    let batch = collect_by_id(encoder.transform(test).await?).await?;
    assert_eq!(
        column_names(&batch),
        vec!["id", "piezo_status_a", "piezo_status_b"]
    );
    // "a" is absent from the test table, "c" was never seen at fit.
    assert_eq!(ints(&batch, "piezo_status_a"), vec![Some(0), Some(0)]);
    assert_eq!(ints(&batch, "piezo_status_b"), vec![Some(1), Some(0)]);
    Ok(())
}

#[tokio::test]
async fn test_frozen_vocabulary_requires_fit() {
    let df = status_dataframe(vec![Some("a")]).await;
    let encoder =
        OneHotEncoder::new(vec!["piezo_status".to_string()]).with_mode(VocabularyMode::Frozen);
    assert!(matches!(
        encoder.transform(df).await,
        Err(PiezoFeaturesError::FitNotCalled)
    ));
}

#[tokio::test]
async fn test_frozen_vocabulary_leaves_unseen_columns_untouched() -> PiezoFeaturesResult<()> {
    let train = create_dataframe(vec![(
        "id",
        Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef,
    )])
    .await;
    let test = status_dataframe(vec![Some("a"), Some("b")]).await;
    let mut encoder =
        OneHotEncoder::new(vec!["piezo_status".to_string()]).with_mode(VocabularyMode::Frozen);
    encoder.fit(&train).await?;
    assert_eq!(encoder.categories("piezo_status"), None);

    let batch = collect_by_id(encoder.transform(test).await?).await?;
    assert_eq!(column_names(&batch), vec!["id", "piezo_status"]);
    Ok(())
}
