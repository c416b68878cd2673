//! ## Piezo Feature Pipeline
//!
//! This module provides the core abstractions for fitting and applying a chain of transformers.
//!
//! ### Overview
//!
//! - The [`Transformer`] trait is the contract of every stage: `fit` learns parameters from a reference
//!   DataFrame, `transform` re-applies them to any structurally compatible DataFrame.
//! - The [`Pipeline`] struct chains named stages. During `fit`, each stage is fitted on the table as
//!   transformed by all prior stages; `transform` replays the fitted stages in the same order.
//! - A [`PipelineObserver`] receives one [`StageEvent`] per stage and pass (stage name, columns added
//!   and removed, elapsed time). [`TracingObserver`] forwards them to `tracing`.
//! - Macros [`crate::impl_transformer`] and [`crate::make_pipeline`] simplify the implementation of
//!   transformers and the creation of pipelines.

use crate::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use crate::frame::column_names;
use async_trait::async_trait;
use datafusion::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for the stages of the pipeline.
///
/// `transform` is asynchronous because some stages read the table they are given (for instance, to
/// decide which columns survive a missing-rate check). Learned parameters are frozen by `fit`;
/// `transform` never updates them.
#[async_trait]
pub trait Transformer {
    /// Learn the stage's parameters from a reference DataFrame.
    async fn fit(&mut self, df: &DataFrame) -> PiezoFeaturesResult<()>;

    /// Apply the stage to a DataFrame, returning the transformed DataFrame.
    async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame>;

    /// Returns true if the transformer must be fitted before `transform` can be called.
    fn is_stateful(&self) -> bool;
}

/// Macro to implement the [`Transformer`] trait for a type.
///
/// The type must already have inherent methods:
/// - `async fn fit(&mut self, &DataFrame) -> PiezoFeaturesResult<()>`
/// - `async fn transform(&self, DataFrame) -> PiezoFeaturesResult<DataFrame>`
/// - `fn inherent_is_stateful(&self) -> bool`
///
/// # Example
///
/// ```rust,no_run
/// use piezo_features::exceptions::PiezoFeaturesResult;
/// use datafusion::prelude::DataFrame;
/// use piezo_features::impl_transformer;
///
/// pub struct Passthrough;
///
/// impl Passthrough {
///     pub async fn fit(&mut self, _df: &DataFrame) -> PiezoFeaturesResult<()> {
///         Ok(())
///     }
///
///     pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
///         Ok(df)
///     }
///
///     pub fn inherent_is_stateful(&self) -> bool {
///         false
///     }
/// }
///
/// impl_transformer!(Passthrough);
/// ```
#[macro_export]
macro_rules! impl_transformer {
    ($ty:ty) => {
        #[async_trait::async_trait]
        impl $crate::pipeline::Transformer for $ty {
            async fn fit(
                &mut self,
                df: &datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::PiezoFeaturesResult<()> {
                <$ty>::fit(self, df).await
            }
            async fn transform(
                &self,
                df: datafusion::prelude::DataFrame,
            ) -> $crate::exceptions::PiezoFeaturesResult<datafusion::prelude::DataFrame> {
                <$ty>::transform(self, df).await
            }
            fn is_stateful(&self) -> bool {
                <$ty>::inherent_is_stateful(self)
            }
        }
    };
}

/// Which pass of the pipeline produced a [`StageEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Fit,
    Transform,
}

/// Structured report of one stage run.
#[derive(Debug, Clone)]
pub struct StageEvent {
    pub stage: String,
    pub phase: PipelinePhase,
    pub added_columns: Vec<String>,
    pub removed_columns: Vec<String>,
    pub elapsed: Duration,
}

impl StageEvent {
    fn new(
        stage: &str,
        phase: PipelinePhase,
        before: &[String],
        after: &[String],
        elapsed: Duration,
    ) -> Self {
        Self {
            stage: stage.to_string(),
            phase,
            added_columns: after
                .iter()
                .filter(|c| !before.contains(c))
                .cloned()
                .collect(),
            removed_columns: before
                .iter()
                .filter(|c| !after.contains(c))
                .cloned()
                .collect(),
            elapsed,
        }
    }
}

/// Receives stage events from a pipeline.
pub trait PipelineObserver: Send + Sync {
    fn on_stage(&self, event: &StageEvent);
}

/// Default observer: emits each stage event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl PipelineObserver for TracingObserver {
    fn on_stage(&self, event: &StageEvent) {
        tracing::info!(
            stage = %event.stage,
            phase = ?event.phase,
            added = ?event.added_columns,
            removed = ?event.removed_columns,
            elapsed = ?event.elapsed,
            "pipeline stage completed"
        );
    }
}

/// A boxed pipeline stage.
pub type Step = Box<dyn Transformer + Send + Sync>;

/// A pipeline that chains a sequence of named transformers.
///
/// Stage order is part of the contract: a stage may depend on columns produced or kept by earlier
/// stages.
pub struct Pipeline {
    steps: Vec<(String, Step)>,
    observer: Arc<dyn PipelineObserver>,
    checkpoints: bool,
    fitted: bool,
}

impl Pipeline {
    /// Creates a new pipeline from `(name, transformer)` pairs.
    pub fn new(steps: Vec<(String, Step)>) -> Self {
        Self {
            steps,
            observer: Arc::new(TracingObserver),
            checkpoints: false,
            fitted: false,
        }
    }

    /// Replaces the observer that receives stage events.
    pub fn with_observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// When enabled, the table is materialized in memory after every stage so that the next stage's
    /// fit does not re-execute the whole upstream plan.
    pub fn with_checkpoints(mut self, enabled: bool) -> Self {
        self.checkpoints = enabled;
        self
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn ensure_not_empty(&self) -> PiezoFeaturesResult<()> {
        if self.steps.is_empty() {
            return Err(PiezoFeaturesError::InvalidParameter(
                "Pipeline must have at least one transformer.".to_string(),
            ));
        }
        Ok(())
    }

    /// Fits each transformer on the output of the previous ones and returns the transformed table.
    pub async fn fit(&mut self, df: &DataFrame) -> PiezoFeaturesResult<DataFrame> {
        self.ensure_not_empty()?;
        self.fitted = false;
        let observer = Arc::clone(&self.observer);
        let checkpoints = self.checkpoints;
        let mut current_df = df.clone();
        for (name, step) in self.steps.iter_mut() {
            let name = name.as_str();
            let before = column_names(&current_df);
            let start = Instant::now();
            tracing::debug!(stage = %name, "fitting stage");
            step.fit(&current_df)
                .await
                .map_err(|e| PiezoFeaturesError::in_stage(name, e))?;
            current_df = step
                .transform(current_df)
                .await
                .map_err(|e| PiezoFeaturesError::in_stage(name, e))?;
            observer.on_stage(&StageEvent::new(
                name,
                PipelinePhase::Fit,
                &before,
                &column_names(&current_df),
                start.elapsed(),
            ));
            current_df = checkpoint(current_df, checkpoints).await?;
        }
        self.fitted = true;
        Ok(current_df)
    }

    /// Applies the fitted transformers, in order, to any structurally compatible table.
    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        self.ensure_not_empty()?;
        let mut current_df = df;
        for (name, step) in self.steps.iter() {
            let before = column_names(&current_df);
            let start = Instant::now();
            current_df = step
                .transform(current_df)
                .await
                .map_err(|e| PiezoFeaturesError::in_stage(name, e))?;
            self.observer.on_stage(&StageEvent::new(
                name,
                PipelinePhase::Transform,
                &before,
                &column_names(&current_df),
                start.elapsed(),
            ));
            current_df = checkpoint(current_df, self.checkpoints).await?;
        }
        Ok(current_df)
    }

    /// Convenience method to call `fit` and return the transformed reference table.
    pub async fn fit_transform(&mut self, df: &DataFrame) -> PiezoFeaturesResult<DataFrame> {
        self.fit(df).await
    }
}

async fn checkpoint(df: DataFrame, enabled: bool) -> PiezoFeaturesResult<DataFrame> {
    if enabled {
        Ok(df.cache().await?)
    } else {
        Ok(df)
    }
}

/// Macro to simplify pipeline creation by automatically boxing transformers.
///
/// # Example
///
/// ```rust,no_run
/// use piezo_features::make_pipeline;
/// use piezo_features::transformers::feature_selection::DropFeatures;
///
/// let pipeline = make_pipeline!(
///     ("drop_ids", DropFeatures::new(vec!["row_index".to_string()])),
/// );
/// ```
#[macro_export]
macro_rules! make_pipeline {
    ($(($name:expr, $transformer:expr)),+ $(,)?) => {
        {
            let steps: Vec<(String, $crate::pipeline::Step)> = vec![
                $(
                    ($name.to_string(), Box::new($transformer)),
                )+
            ];
            $crate::pipeline::Pipeline::new(steps)
        }
    };
}
