// Run `cargo run --example clean_piezo -- <train.csv|parquet> <test.csv|parquet>` to execute this example
// Set DEBUG_PIEZO_FEATURES=1 to print the stage events.

use datafusion::dataframe::DataFrame;
use datafusion::prelude::{CsvReadOptions, SessionContext};
use piezo_features::presets::piezo_pipeline;
use piezo_features::settings::PipelineConfig;
use piezo_features::transformers::categorical_encoding::VocabularyMode;
use std::error::Error;
use std::path::Path;

/// Loads data from a given path and automatically detects the format (CSV or Parquet).
async fn load_data(ctx: &SessionContext, path: &str) -> Result<DataFrame, Box<dyn Error>> {
    let extension = Path::new(path).extension().and_then(|ext| ext.to_str());
    let df = match extension {
        Some("parquet") => ctx.read_parquet(path, Default::default()).await?,
        Some("csv") => ctx.read_csv(path, CsvReadOptions::new()).await?,
        _ => return Err(format!("Unsupported file format: {}", path).into()),
    };
    Ok(df)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        return Err("usage: clean_piezo <train file> <test file>".into());
    }

    let ctx = SessionContext::new();
    let train = load_data(&ctx, &args[1]).await?;
    let test = load_data(&ctx, &args[2]).await?;

    // The standardizer needs the same columns on both tables.
    let config = PipelineConfig::default().with_vocabulary_mode(VocabularyMode::Frozen);
    let mut pipeline = piezo_pipeline(&config)?;

    let cleaned_train = pipeline.fit(&train).await?;
    println!("Cleaned train table:");
    cleaned_train.limit(0, Some(5))?.show().await?;

    let cleaned_test = pipeline.transform(test).await?;
    println!("Cleaned test table:");
    cleaned_test.limit(0, Some(5))?.show().await?;

    Ok(())
}
