//! Column names of the groundwater dataset that the transformers are wired to.
//!
//! These are fixed contracts with the upstream table, not discovered at runtime.

pub const METEO_DATE: &str = "meteo_date";
pub const PIEZO_MEASUREMENT_DATE: &str = "piezo_measurement_date";
pub const DEPARTMENT_CODE: &str = "piezo_station_department_code";

pub const PIEZO_STATION_ALTITUDE: &str = "piezo_station_altitude";
pub const METEO_ALTITUDE: &str = "meteo_altitude";

pub const METEO_RAIN_HEIGHT: &str = "meteo_rain_height";
pub const INSEE_AGRI: &str = "insee_%_agri";
pub const INSEE_POP_COMMUNE: &str = "insee_pop_commune";
pub const INSEE_MED_LIVING_LEVEL: &str = "insee_med_living_level";
pub const INSEE_IND: &str = "insee_%_ind";
pub const INSEE_CONST: &str = "insee_%_const";

pub const METEO_TEMPERATURE_AVG: &str = "meteo_temperature_avg";
pub const METEO_TEMPERATURE_AVG_THRESHOLD: &str = "meteo_temperature_avg_threshold";
pub const METEO_TEMPERATURE_MIN: &str = "meteo_temperature_min";
pub const METEO_TEMPERATURE_MIN_GROUND: &str = "meteo_temperature_min_ground";
pub const METEO_TEMPERATURE_MAX: &str = "meteo_temperature_max";
pub const METEO_PRESSURE_SATURATION_AVG: &str = "meteo__pressure_saturation_avg";

pub const DISTANCE_PIEZO_METEO: &str = "distance_piezo_meteo";
pub const PIEZO_STATION_LONGITUDE: &str = "piezo_station_longitude";
pub const PIEZO_STATION_LATITUDE: &str = "piezo_station_latitude";
pub const METEO_LATITUDE: &str = "meteo_latitude";
pub const METEO_LONGITUDE: &str = "meteo_longitude";

/// Sentinel category written in place of missing categorical values.
pub const MISSING_CATEGORY: &str = "missing";

/// Columns imputed by department (and by department and month for rainfall).
pub fn clean_feature_columns() -> Vec<String> {
    [
        METEO_RAIN_HEIGHT,
        INSEE_AGRI,
        INSEE_POP_COMMUNE,
        INSEE_MED_LIVING_LEVEL,
        INSEE_IND,
        INSEE_CONST,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Meteorological columns imputed by (department, measurement date), then by date.
pub fn meteo_threshold_columns() -> Vec<String> {
    [
        METEO_TEMPERATURE_AVG,
        METEO_TEMPERATURE_AVG_THRESHOLD,
        METEO_TEMPERATURE_MIN,
        METEO_TEMPERATURE_MIN_GROUND,
        METEO_TEMPERATURE_MAX,
        METEO_PRESSURE_SATURATION_AVG,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub fn altitude_columns() -> Vec<String> {
    vec![PIEZO_STATION_ALTITUDE.to_string(), METEO_ALTITUDE.to_string()]
}

/// Coordinate columns made redundant by the "near weather station" indicator.
pub fn redundant_geo_columns() -> Vec<String> {
    [
        PIEZO_STATION_LONGITUDE,
        PIEZO_STATION_LATITUDE,
        METEO_LONGITUDE,
        METEO_LATITUDE,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Categorical columns filled with [`MISSING_CATEGORY`] and one-hot encoded.
pub fn categorical_columns() -> Vec<String> {
    [
        "piezo_obtention_mode",
        "piezo_status",
        "piezo_qualification",
        "piezo_measure_nature_code",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Identifier and free-text columns with no predictive value once imputation is done.
pub fn identifier_columns() -> Vec<String> {
    [
        "row_index",
        "piezo_station_bss_code",
        "piezo_station_bss_id",
        DEPARTMENT_CODE,
        "piezo_station_department_name",
        "piezo_station_commune_code_insee",
        "piezo_station_commune_name",
        "meteo_id",
        "meteo_name",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
