//! 既存の一覧CSVから詳細CSVを作る
//!
//! 実行方法:
//! ```
//! INPUT_CSV=./data/auto24_listings.csv cargo run --example enrich_only
//! ```

use std::path::PathBuf;

use auto24_scraper::{enrich_csv, ScraperConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let output_dir = std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "./data".to_string());
    let headless = std::env::var("HEADLESS")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);

    let config = ScraperConfig::new(&output_dir)
        .with_headless(headless)
        .with_download_images(std::env::var("SKIP_IMAGES").is_err());

    let input = std::env::var("INPUT_CSV")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config.listings_csv());
    let output = std::env::var("OUTPUT_CSV")
        .map(PathBuf::from)
        .unwrap_or_else(|_| config.details_csv());

    println!("=== Auto24 Enrich ===");
    println!("Input:  {:?}", input);
    println!("Output: {:?}", output);
    println!();

    let records = enrich_csv(&config, &input, &output).await?;

    let missing = records
        .iter()
        .filter(|r| r.detail == auto24_scraper::DetailRecord::unavailable())
        .count();
    println!("\n完了: {}件 (詳細なし {}件)", records.len(), missing);

    Ok(())
}
