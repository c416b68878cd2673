mod common;

use std::sync::{Arc, Mutex};

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use common::{collect_by_id, column_names, create_dataframe, floats};
use datafusion::prelude::DataFrame;
use piezo_features::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use piezo_features::make_pipeline;
use piezo_features::pipeline::{
    Pipeline, PipelineObserver, PipelinePhase, StageEvent, Step, Transformer,
};
use piezo_features::presets::piezo_pipeline;
use piezo_features::settings::PipelineConfig;
use piezo_features::transformers::categorical_encoding::VocabularyMode;
use piezo_features::transformers::feature_selection::DropFeatures;
use piezo_features::transformers::scaling::{ColumnSelection, PartialStandardScaler};

#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<StageEvent>>,
}

impl PipelineObserver for RecordingObserver {
    fn on_stage(&self, event: &StageEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

async fn small_dataframe() -> DataFrame {
    create_dataframe(vec![
        ("id", Arc::new(Int64Array::from(vec![1, 2, 3])) as ArrayRef),
        ("meteo_name", Arc::new(StringArray::from(vec!["A", "B", "C"]))),
        ("x", Arc::new(Float64Array::from(vec![1.0, 2.0, 3.0]))),
    ])
    .await
}

#[tokio::test]
async fn test_pipeline_reports_stage_events() -> PiezoFeaturesResult<()> {
    let observer = Arc::new(RecordingObserver::default());
    let mut pipeline = make_pipeline!(
        ("drop_names", DropFeatures::new(vec!["meteo_name".to_string()])),
        (
            "standardize",
            PartialStandardScaler::new(ColumnSelection::Columns(vec!["x".to_string()]))
        ),
    )
    .with_observer(observer.clone());
    assert_eq!(pipeline.step_names(), vec!["drop_names", "standardize"]);

    let fitted = collect_by_id(pipeline.fit(&small_dataframe().await).await?).await?;
    assert!(pipeline.is_fitted());
    assert_eq!(column_names(&fitted), vec!["id", "x"]);

    pipeline.transform(small_dataframe().await).await?;
    let events = observer.events.lock().unwrap();
    assert_eq!(events.len(), 4);
    assert_eq!(events[0].stage, "drop_names");
    assert_eq!(events[0].phase, PipelinePhase::Fit);
    assert_eq!(events[0].removed_columns, vec!["meteo_name".to_string()]);
    assert!(events[1].added_columns.is_empty());
    assert_eq!(events[2].phase, PipelinePhase::Transform);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_matches_stage_by_stage_application() -> PiezoFeaturesResult<()> {
    let steps: Vec<(String, Step)> = vec![(
        "standardize".to_string(),
        Box::new(PartialStandardScaler::new(ColumnSelection::Columns(vec![
            "x".to_string(),
        ]))),
    )];
    let mut pipeline = Pipeline::new(steps).with_checkpoints(true);
    let through_pipeline = collect_by_id(pipeline.fit(&small_dataframe().await).await?).await?;

    let mut scaler = PartialStandardScaler::new(ColumnSelection::Columns(vec!["x".to_string()]));
    Transformer::fit(&mut scaler, &small_dataframe().await).await?;
    let by_hand = collect_by_id(Transformer::transform(&scaler, small_dataframe().await).await?)
        .await?;
    assert_eq!(floats(&through_pipeline, "x"), floats(&by_hand, "x"));
    Ok(())
}

#[tokio::test]
async fn test_empty_pipeline_is_rejected() {
    let mut pipeline = Pipeline::new(vec![]);
    assert!(matches!(
        pipeline.fit(&small_dataframe().await).await,
        Err(PiezoFeaturesError::InvalidParameter(_))
    ));
}

#[tokio::test]
async fn test_transform_before_fit_names_the_stage() {
    let pipeline = make_pipeline!((
        "standardize",
        PartialStandardScaler::new(ColumnSelection::All)
    ));
    let err = pipeline
        .transform(small_dataframe().await)
        .await
        .unwrap_err();
    assert!(matches!(&err, PiezoFeaturesError::Stage { stage, .. } if stage == "standardize"));
    assert!(matches!(err.root_cause(), PiezoFeaturesError::FitNotCalled));
}

fn texts(values: &[Option<&str>]) -> ArrayRef {
    Arc::new(StringArray::from(values.to_vec()))
}

fn numbers(values: &[Option<f64>]) -> ArrayRef {
    Arc::new(Float64Array::from(values.to_vec()))
}

/// A raw groundwater table with missing values, malformed tokens and invalid altitudes.
async fn piezo_dataframe(ids: &[i64], departments: &[&str], dates: &[&str]) -> DataFrame {
    let n = ids.len();
    let cycle = |values: &[Option<f64>]| -> ArrayRef {
        numbers(&(0..n).map(|i| values[i % values.len()]).collect::<Vec<_>>())
    };
    let cycle_text = |values: &[Option<&str>]| -> ArrayRef {
        texts(&(0..n).map(|i| values[i % values.len()]).collect::<Vec<_>>())
    };
    create_dataframe(vec![
        ("id", Arc::new(Int64Array::from(ids.to_vec())) as ArrayRef),
        (
            "piezo_station_bss_code",
            cycle_text(&[Some("BSS001"), Some("BSS002")]),
        ),
        (
            "piezo_station_department_code",
            texts(&departments.iter().map(|d| Some(*d)).collect::<Vec<_>>()),
        ),
        (
            "piezo_measurement_date",
            texts(&dates.iter().map(|d| Some(*d)).collect::<Vec<_>>()),
        ),
        (
            "meteo_date",
            texts(&dates.iter().map(|d| Some(*d)).collect::<Vec<_>>()),
        ),
        ("meteo_rain_height", cycle(&[Some(1.0), None, Some(3.0), Some(5.0)])),
        (
            "insee_%_agri",
            cycle_text(&[Some("10"), None, Some("30"), Some("n/a")]),
        ),
        (
            "meteo_temperature_avg",
            cycle(&[Some(5.0), None, Some(15.0), Some(16.0)]),
        ),
        (
            "meteo_temperature_avg_threshold",
            cycle(&[Some(4.0), Some(6.0), Some(14.0), Some(15.0)]),
        ),
        (
            "meteo_temperature_min",
            cycle(&[Some(0.0), Some(2.0), Some(10.0), Some(11.0)]),
        ),
        (
            "meteo_temperature_min_ground",
            cycle(&[Some(-1.0), None, Some(9.0), Some(10.0)]),
        ),
        (
            "piezo_station_altitude",
            cycle(&[Some(120.0), Some(-5.0), Some(300.0), Some(99999.0)]),
        ),
        (
            "meteo_altitude",
            cycle(&[Some(50.0), Some(60.0), Some(60.0), None]),
        ),
        (
            "distance_piezo_meteo",
            cycle(&[Some(1.0), Some(2.5), Some(8.0), None]),
        ),
        ("meteo_latitude", cycle(&[Some(2.35)])),
        ("meteo_longitude", cycle(&[Some(48.85)])),
        (
            "piezo_status",
            cycle_text(&[Some("active"), None, Some("active"), Some("closed")]),
        ),
    ])
    .await
}

#[tokio::test]
async fn test_groundwater_pipeline_end_to_end() -> PiezoFeaturesResult<()> {
    let train = piezo_dataframe(
        &[1, 2, 3, 4],
        &["01", "01", "02", "02"],
        &["2021-01-05", "2021-01-05", "2021-06-01", "2021-06-01"],
    )
    .await;
    let test = piezo_dataframe(
        &[1, 2, 3],
        &["02", "01", "03"],
        &["2021-06-01", "2021-02-10", "2021-03-03"],
    )
    .await;
    let config = PipelineConfig {
        clean_feature_columns: vec![
            "meteo_rain_height".to_string(),
            "insee_%_agri".to_string(),
        ],
        categorical_columns: vec!["piezo_status".to_string()],
        ..PipelineConfig::default()
    }
    .with_vocabulary_mode(VocabularyMode::Frozen);
    let mut pipeline = piezo_pipeline(&config)?;

    let cleaned_train = collect_by_id(pipeline.fit(&train).await?).await?;
    let cleaned_test = collect_by_id(pipeline.transform(test).await?).await?;
    assert_eq!(cleaned_train.num_rows(), 4);
    assert_eq!(cleaned_test.num_rows(), 3);
    assert_eq!(column_names(&cleaned_train), column_names(&cleaned_test));

    let columns = column_names(&cleaned_test);
    for dropped in [
        "piezo_station_bss_code",
        "piezo_station_department_code",
        "piezo_measurement_date",
        "meteo_latitude",
        "meteo_longitude",
        "piezo_status",
    ] {
        assert!(!columns.contains(&dropped.to_string()), "{} kept", dropped);
    }
    for kept in [
        "meteo_date",
        "piezo_station_altitude",
        "distance_piezo_meteo",
        "piezo_status_active",
        "piezo_status_closed",
        "piezo_status_missing",
    ] {
        assert!(columns.contains(&kept.to_string()), "{} missing", kept);
    }
    for field in cleaned_test.schema().fields() {
        assert!(field.data_type().is_numeric(), "{} is not numeric", field.name());
    }
    // Altitudes are capped and filled before standardization: no null remains.
    assert!(floats(&cleaned_test, "piezo_station_altitude")
        .iter()
        .all(Option::is_some));
    Ok(())
}
