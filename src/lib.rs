//! # piezo-features
//!
//! Stateful fit/transform feature engineering for tables that join groundwater-level (piezometric)
//! measurements with meteorological and INSEE socio-economic data, built on Apache DataFusion.
//!
//! Each stage learns its parameters from a reference table with `fit` and re-applies them to any
//! structurally compatible table with `transform`. [`presets::piezo_pipeline`] assembles the
//! canonical cleaning pipeline from a [`settings::PipelineConfig`].

pub mod columns;
pub mod exceptions;
pub mod frame;
pub mod logging;
pub mod pipeline;
pub mod presets;
pub mod settings;
pub mod stats;
pub mod transformers;
