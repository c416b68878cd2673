//! # Categorical Encoding
//!
//! [`OneHotEncoder`] expands each categorical column into one `Int32` indicator column per category,
//! named `<column>_<category>`. Indicators are appended after the other columns and the original
//! column is removed. A null category sets every indicator of the row to 0.
//!
//! The category vocabulary is either read from every table being transformed
//! ([`VocabularyMode::PerCall`], the default), or frozen at fit ([`VocabularyMode::Frozen`]). With a
//! per-call vocabulary two tables with different categories produce different column sets; with a
//! frozen vocabulary the column set is fixed and categories absent from a table give all-zero
//! indicators. A column that was absent at fit has no frozen vocabulary and is passed through unencoded.

use crate::exceptions::{PiezoFeaturesError, PiezoFeaturesResult};
use crate::frame::{as_text, column, has_column};
use crate::impl_transformer;
use datafusion::arrow::array::{Array, StringArray};
use datafusion::logical_expr::{lit, Case as DFCase, Expr};
use datafusion::prelude::*;
use std::collections::BTreeMap;

/// Where the one-hot vocabulary comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VocabularyMode {
    /// Distinct values of the table passed to `transform`.
    #[default]
    PerCall,
    /// Distinct values of the reference table, learned at fit.
    Frozen,
}

/// Sorted distinct non-null values of a column read as text.
async fn distinct_categories(df: &DataFrame, col_name: &str) -> PiezoFeaturesResult<Vec<String>> {
    let batches = df
        .clone()
        .select(vec![as_text(column(col_name))])?
        .distinct()?
        .collect()
        .await?;
    let mut values = Vec::new();
    for batch in batches {
        let array = batch
            .column(0)
            .as_any()
            .downcast_ref::<StringArray>()
            .ok_or_else(|| {
                PiezoFeaturesError::DataFusionError(datafusion::error::DataFusionError::Plan(
                    format!("Expected Utf8 array for column {}", col_name),
                ))
            })?;
        for i in 0..array.len() {
            if !array.is_null(i) {
                values.push(array.value(i).to_string());
            }
        }
    }
    values.sort();
    values.dedup();
    Ok(values)
}

fn indicator(col_name: &str, category: &str) -> Expr {
    Expr::Case(DFCase {
        expr: None,
        when_then_expr: vec![(
            Box::new(as_text(column(col_name)).eq(lit(category))),
            Box::new(lit(1_i32)),
        )],
        else_expr: Some(Box::new(lit(0_i32))),
    })
    .alias(format!("{}_{}", col_name, category))
}

/// One-hot encodes categorical columns. Columns absent from the table are skipped.
pub struct OneHotEncoder {
    pub columns: Vec<String>,
    pub mode: VocabularyMode,
    categories: BTreeMap<String, Vec<String>>,
    fitted: bool,
}

impl OneHotEncoder {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            mode: VocabularyMode::PerCall,
            categories: BTreeMap::new(),
            fitted: false,
        }
    }

    pub fn with_mode(mut self, mode: VocabularyMode) -> Self {
        self.mode = mode;
        self
    }

    /// Vocabulary learned at fit for a column.
    pub fn categories(&self, col_name: &str) -> Option<&[String]> {
        self.categories.get(col_name).map(Vec::as_slice)
    }

    pub async fn fit(&mut self, df: &DataFrame) -> PiezoFeaturesResult<()> {
        self.categories.clear();
        for col_name in &self.columns {
            if !has_column(df, col_name) {
                continue;
            }
            let values = distinct_categories(df, col_name).await?;
            tracing::debug!(column = %col_name, categories = values.len(), "learned vocabulary");
            self.categories.insert(col_name.clone(), values);
        }
        self.fitted = true;
        Ok(())
    }

    pub async fn transform(&self, df: DataFrame) -> PiezoFeaturesResult<DataFrame> {
        if self.mode == VocabularyMode::Frozen && !self.fitted {
            return Err(PiezoFeaturesError::FitNotCalled);
        }
        let encoded: Vec<&String> = self
            .columns
            .iter()
            .filter(|c| has_column(&df, c))
            .filter(|c| {
                let known = self.mode == VocabularyMode::PerCall || self.categories.contains_key(*c);
                if !known {
                    tracing::warn!(column = %c, "column absent at fit has no vocabulary; left unencoded");
                }
                known
            })
            .collect();
        let mut exprs: Vec<Expr> = df
            .schema()
            .fields()
            .iter()
            .filter(|f| !encoded.contains(&f.name()))
            .map(|f| column(f.name()))
            .collect();
        for col_name in encoded {
            let vocabulary = match self.mode {
                VocabularyMode::PerCall => distinct_categories(&df, col_name).await?,
                VocabularyMode::Frozen => self
                    .categories
                    .get(col_name.as_str())
                    .cloned()
                    .unwrap_or_default(),
            };
            exprs.extend(vocabulary.iter().map(|category| indicator(col_name, category)));
        }
        if exprs.is_empty() {
            return Err(PiezoFeaturesError::InvalidParameter(
                "One-hot encoding would result in an empty DataFrame.".to_string(),
            ));
        }
        df.select(exprs).map_err(PiezoFeaturesError::from)
    }

    fn inherent_is_stateful(&self) -> bool {
        self.mode == VocabularyMode::Frozen
    }
}

impl_transformer!(OneHotEncoder);
