//! Auto24.ma 中古車スクレイパーライブラリ
//!
//! - 無限スクロールの一覧ページからカードを収集して一覧CSVに保存
//! - 各詳細ページから仕様・装備・価格を取得し、画像をダウンロード
//! - 一覧と詳細をIDで結合して詳細CSVに保存
//!
//! # 使用例
//!
//! ```rust,ignore
//! use auto24_scraper::{ScrapeRequest, ScraperService};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = ScraperService::new();
//!
//!     let request = ScrapeRequest::new("./data")
//!         .with_headless(true)
//!         .with_max_scroll_rounds(5);
//!
//!     let result = service.call(request).await.unwrap();
//!     println!("一覧: {:?} ({}件)", result.listings_csv, result.listings.len());
//!     println!("詳細: {:?}", result.details_csv);
//! }
//! ```
//!
//! # 既存の一覧CSVから詳細だけ取得
//!
//! ```rust,ignore
//! use auto24_scraper::{enrich_csv, ScraperConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::new("./data");
//!     let records = enrich_csv(&config, &config.listings_csv(), &config.details_csv())
//!         .await
//!         .unwrap();
//!     println!("{}件", records.len());
//! }
//! ```

pub mod auto24;
pub mod browser;
pub mod config;
pub mod error;
pub mod extract;
pub mod http;
pub mod output;
pub mod retry;
pub mod service;
pub mod traits;

#[cfg(test)]
mod testing;

// 主要な型をリエクスポート
pub use auto24::{
    DetailEnricher, DetailRecord, EnrichedRecord, ListingCollector, ListingRecord, SellerType,
    SiteProfile,
};
pub use browser::ChromeSession;
pub use config::ScraperConfig;
pub use error::ScraperError;
pub use extract::{Extracted, WaitCondition, UNAVAILABLE};
pub use http::ReqwestFetcher;
pub use retry::RetryPolicy;
pub use service::{enrich_csv, Pipeline, ScrapeRequest, ScrapeResult, ScraperService};
pub use traits::{BrowserSession, HttpFetch, PageElement};
