//! 一覧収集から詳細取得までの全工程
//!
//! 実行方法:
//! ```
//! OUTPUT_DIR=./data HEADLESS=false MAX_SCROLLS=3 cargo run --example scrape_all
//! ```

use auto24_scraper::{ScrapeRequest, ScraperService};
use tower::Service;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // ログ設定
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,auto24_scraper=debug")),
        )
        .init();

    let output_dir = std::env::var("OUTPUT_DIR").unwrap_or_else(|_| "./data".to_string());
    let headless = std::env::var("HEADLESS")
        .map(|v| v != "false" && v != "0")
        .unwrap_or(true);
    let max_scrolls = std::env::var("MAX_SCROLLS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5);
    let download_images = std::env::var("SKIP_IMAGES").is_err();

    println!("=== Auto24 Scraper ===");
    println!("Output: {}", output_dir);
    println!("Headless: {}", headless);
    println!("Max scroll rounds: {}", max_scrolls);
    println!();

    let mut request = ScrapeRequest::new(&output_dir)
        .with_headless(headless)
        .with_max_scroll_rounds(max_scrolls)
        .with_download_images(download_images);
    if let Ok(url) = std::env::var("LISTINGS_URL") {
        request = request.with_listings_url(url);
    }

    let mut service = ScraperService::new();
    let result = service.call(request).await?;

    println!("\n=== Result ===");
    println!("Listings: {:?} ({}件)", result.listings_csv, result.listings.len());
    println!("Details:  {:?} ({}件)", result.details_csv, result.enriched.len());
    println!("Images:   {:?}", result.images_dir);

    for record in result.enriched.iter().take(5) {
        println!(
            "  - [{}] {} / {} DH / {} km / {}",
            record.listing.sequence_id,
            record.listing.title,
            record.listing.price,
            record.detail.mileage,
            record.detail.fuel
        );
    }

    Ok(())
}
