//! ## Canonical groundwater pipeline
//!
//! Stage order is a contract: imputers that group by department or measurement date run before the
//! identifier and date columns they rely on are encoded or dropped, and the standardizer runs last,
//! once every remaining column is numeric.

use crate::exceptions::PiezoFeaturesResult;
use crate::make_pipeline;
use crate::pipeline::Pipeline;
use crate::settings::PipelineConfig;
use crate::transformers::categorical_encoding::OneHotEncoder;
use crate::transformers::datetime::CyclicalDateEncoder;
use crate::transformers::feature_selection::{DropFeatures, DropHighMissingRate};
use crate::transformers::geography::GeoNormalizer;
use crate::transformers::imputation::{
    DepartmentDateImputer, GroupMedianImputer, MissingCategoryImputer, RegressionImputer,
};
use crate::transformers::outlier_handling::AltitudeCleaner;
use crate::transformers::scaling::PartialStandardScaler;

/// Builds the groundwater cleaning pipeline described by `config`.
///
/// | # | stage | transformer |
/// |---|-------|-------------|
/// | 1 | `clean_features` | [`GroupMedianImputer`] |
/// | 2 | `temperature_regression` | [`RegressionImputer::temperature`] |
/// | 3 | `meteo_threshold` | [`DepartmentDateImputer`] |
/// | 4 | `altitude` | [`AltitudeCleaner`] |
/// | 5 | `geography` | [`GeoNormalizer`] |
/// | 6 | `drop_missing_rate` | [`DropHighMissingRate`] |
/// | 7 | `missing_category` | [`MissingCategoryImputer`] |
/// | 8 | `dates` | [`CyclicalDateEncoder`] |
/// | 9 | `drop_identifiers` | [`DropFeatures`] |
/// | 10 | `one_hot` | [`OneHotEncoder`] |
/// | 11 | `standardize` | [`PartialStandardScaler`] |
pub fn piezo_pipeline(config: &PipelineConfig) -> PiezoFeaturesResult<Pipeline> {
    config.validate()?;
    let pipeline = make_pipeline!(
        (
            "clean_features",
            GroupMedianImputer::new(config.clean_feature_columns.clone())
                .with_mode(config.imputation_mode)
        ),
        ("temperature_regression", RegressionImputer::temperature()),
        (
            "meteo_threshold",
            DepartmentDateImputer::new(config.meteo_threshold_columns.clone())
                .with_max_missing_rate(config.meteo_max_missing_rate)
        ),
        (
            "altitude",
            AltitudeCleaner::new(config.altitude_columns.clone())
        ),
        (
            "geography",
            GeoNormalizer::new(config.geo_drop_columns.clone())
                .with_threshold(config.distance_threshold)
                .with_apply_threshold(config.apply_distance_threshold)
        ),
        (
            "drop_missing_rate",
            DropHighMissingRate::new(config.missing_rate_threshold)
        ),
        (
            "missing_category",
            MissingCategoryImputer::new(config.categorical_columns.clone())
        ),
        (
            "dates",
            CyclicalDateEncoder::new(&config.primary_date_column)
        ),
        (
            "drop_identifiers",
            DropFeatures::new(config.drop_columns.clone())
        ),
        (
            "one_hot",
            OneHotEncoder::new(config.categorical_columns.clone())
                .with_mode(config.vocabulary_mode)
        ),
        (
            "standardize",
            PartialStandardScaler::new(config.scale_columns.clone())
                .with_mean(config.with_mean)
                .with_std(config.with_std)
        ),
    );
    Ok(pipeline.with_checkpoints(config.checkpoints))
}
