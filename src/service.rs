use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::time::sleep;
use tower::Service;
use tracing::{error, info};

use crate::auto24::{
    merge_details, DetailEnricher, DetailRecord, EnrichedRecord, ListingCollector,
    ListingRecord, SiteProfile,
};
use crate::browser::ChromeSession;
use crate::config::ScraperConfig;
use crate::error::{truncate_error, ScraperError};
use crate::http::ReqwestFetcher;
use crate::output::{read_listings, write_enriched, write_listings};
use crate::traits::{BrowserSession, HttpFetch};

/// 収集 → 保存 → 詳細取得 → 保存 の一連処理
pub struct Pipeline<'a, S: BrowserSession, H: HttpFetch> {
    session: &'a S,
    fetcher: &'a H,
    config: &'a ScraperConfig,
    site: &'a SiteProfile,
}

/// パイプラインの実行結果
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub listings: Vec<ListingRecord>,
    pub enriched: Vec<EnrichedRecord>,
}

impl<'a, S: BrowserSession, H: HttpFetch> Pipeline<'a, S, H> {
    pub fn new(
        session: &'a S,
        fetcher: &'a H,
        config: &'a ScraperConfig,
        site: &'a SiteProfile,
    ) -> Self {
        Self {
            session,
            fetcher,
            config,
            site,
        }
    }

    /// 一覧を収集して一覧CSVに保存する
    pub async fn run_collect(&self) -> Result<Vec<ListingRecord>, ScraperError> {
        let listings = ListingCollector::new(self.session, self.config, self.site)
            .collect_listings(self.config.max_scroll_rounds)
            .await?;

        write_listings(&self.config.listings_csv(), &listings)?;

        if listings.is_empty() {
            return Err(ScraperError::NoListings(
                "カードは検出されたが1件も処理できませんでした".into(),
            ));
        }
        Ok(listings)
    }

    /// 一覧の各レコードの詳細を順に取得する（結果はIDと対で返す）
    pub async fn run_enrich(&self, listings: &[ListingRecord]) -> Vec<(u32, DetailRecord)> {
        let enricher = DetailEnricher::new(self.session, self.fetcher, self.config, self.site);
        let total = listings.len();
        let mut details = Vec::with_capacity(total);

        for (idx, listing) in listings.iter().enumerate() {
            info!(
                "詳細処理 {}/{}: {}",
                idx + 1,
                total,
                listing.permalink
            );
            let detail = enricher
                .enrich(&listing.permalink, &listing.image_folder_name)
                .await;
            details.push((listing.sequence_id, detail));

            if listing.has_permalink() && idx + 1 < total {
                sleep(self.config.detail_pause).await;
            }
        }

        details
    }

    /// 一覧ファイルを読み込んで詳細を付与し、詳細CSVに保存する
    pub async fn enrich_file(
        &self,
        input: &Path,
        output: &Path,
    ) -> Result<Vec<EnrichedRecord>, ScraperError> {
        let listings = read_listings(input)?;
        info!("一覧を読み込みました: {:?} ({}件)", input, listings.len());
        self.enrich_and_save(&listings, output).await
    }

    async fn enrich_and_save(
        &self,
        listings: &[ListingRecord],
        output: &Path,
    ) -> Result<Vec<EnrichedRecord>, ScraperError> {
        let details = self.run_enrich(listings).await;
        let enriched = merge_details(listings, details)?;
        write_enriched(output, &enriched)?;
        Ok(enriched)
    }

    /// 全工程を実行する
    pub async fn run(&self) -> Result<PipelineOutput, ScraperError> {
        info!("ステップ1: 一覧収集");
        let listings = self.run_collect().await?;

        info!("ステップ2: 詳細取得・画像保存");
        let enriched = self
            .enrich_and_save(&listings, &self.config.details_csv())
            .await?;

        info!(
            "スクレイピング完了: 一覧 {:?}, 詳細 {:?}, 画像 {:?}",
            self.config.listings_csv(),
            self.config.details_csv(),
            self.config.images_dir()
        );
        Ok(PipelineOutput { listings, enriched })
    }
}

/// スクレイピングリクエスト
#[derive(Debug, Clone)]
pub struct ScrapeRequest {
    pub listings_url: String,
    pub output_dir: PathBuf,
    pub headless: bool,
    pub max_scroll_rounds: u32,
    pub download_images: bool,
}

impl ScrapeRequest {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        let defaults = ScraperConfig::default();
        Self {
            listings_url: defaults.listings_url,
            output_dir: output_dir.into(),
            headless: defaults.headless,
            max_scroll_rounds: defaults.max_scroll_rounds,
            download_images: defaults.download_images,
        }
    }

    pub fn with_listings_url(mut self, url: impl Into<String>) -> Self {
        self.listings_url = url.into();
        self
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_max_scroll_rounds(mut self, rounds: u32) -> Self {
        self.max_scroll_rounds = rounds;
        self
    }

    pub fn with_download_images(mut self, download: bool) -> Self {
        self.download_images = download;
        self
    }
}

impl From<ScrapeRequest> for ScraperConfig {
    fn from(req: ScrapeRequest) -> Self {
        ScraperConfig {
            listings_url: req.listings_url,
            output_dir: req.output_dir,
            headless: req.headless,
            max_scroll_rounds: req.max_scroll_rounds,
            download_images: req.download_images,
            ..Default::default()
        }
    }
}

/// スクレイピング結果
#[derive(Debug)]
pub struct ScrapeResult {
    pub listings_csv: PathBuf,
    pub details_csv: PathBuf,
    pub images_dir: PathBuf,
    pub listings: Vec<ListingRecord>,
    pub enriched: Vec<EnrichedRecord>,
}

/// tower::Serviceを実装したスクレイパーサービス
#[derive(Debug, Clone, Default)]
pub struct ScraperService {
    site: SiteProfile,
}

impl ScraperService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_site(site: SiteProfile) -> Self {
        Self { site }
    }
}

/// ブラウザを終了する（失敗はログのみ）
async fn close_session(session: ChromeSession) {
    if let Err(e) = session.close().await {
        error!("ブラウザ終了エラー: {}", e);
    }
}

impl Service<ScrapeRequest> for ScraperService {
    type Response = ScrapeResult;
    type Error = ScraperError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ScrapeRequest) -> Self::Future {
        info!("スクレイピングリクエスト受信: url={}", req.listings_url);
        let site = self.site.clone();

        Box::pin(async move {
            let config: ScraperConfig = req.into();
            let fetcher = ReqwestFetcher::new()?;

            let session = ChromeSession::launch(&config).await?;
            let outcome = Pipeline::new(&session, &fetcher, &config, &site).run().await;
            close_session(session).await;

            let output = outcome.map_err(|e| {
                error!("スクレイピング失敗: {}", truncate_error(&e, 100));
                e
            })?;

            Ok(ScrapeResult {
                listings_csv: config.listings_csv(),
                details_csv: config.details_csv(),
                images_dir: config.images_dir(),
                listings: output.listings,
                enriched: output.enriched,
            })
        })
    }
}

/// 既存の一覧CSVから詳細CSVを作る
pub async fn enrich_csv(
    config: &ScraperConfig,
    input: &Path,
    output: &Path,
) -> Result<Vec<EnrichedRecord>, ScraperError> {
    let site = SiteProfile::auto24();
    let fetcher = ReqwestFetcher::new()?;

    let session = ChromeSession::launch(config).await?;
    let outcome = Pipeline::new(&session, &fetcher, config, &site)
        .enrich_file(input, output)
        .await;
    close_session(session).await;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::auto24::SellerType;
    use crate::extract::UNAVAILABLE;
    use crate::retry::RetryPolicy;
    use crate::testing::{FakeElement, FakeFetcher, FakeResponse, FakeSession};
    use tempfile::tempdir;

    const LISTINGS: &str = "https://auto24.ma/buy-cars";
    const DETAIL_1: &str = "https://auto24.ma/buy-cars/toyota-yaris/1";

    fn config(output: &Path) -> ScraperConfig {
        ScraperConfig::new(output)
            .with_listings_url(LISTINGS)
            .with_fast_waits(Duration::from_millis(1))
            .with_image_retry(RetryPolicy::fixed(3, Duration::from_millis(1)))
    }

    fn fake_site(session: &FakeSession, site: &SiteProfile) {
        let card_1 = FakeElement::new()
            .child(&site.card_title, FakeElement::text("Toyota Yaris"))
            .child(&site.card_price, FakeElement::text("150 000 DH"))
            .child(&site.card_brand_logo, FakeElement::new())
            .child(&site.card_link, FakeElement::new().attr("href", DETAIL_1));
        let card_2 = FakeElement::new().child(&site.card_title, FakeElement::text("Fiat Tipo"));

        session.add_page(
            LISTINGS,
            FakeElement::new()
                .child(&site.card, card_1)
                .child(&site.card, card_2),
        );
        session.add_page(
            DETAIL_1,
            FakeElement::new()
                .child(&site.detail_container, FakeElement::new())
                .child(&site.detail_price, FakeElement::text("150 000 DH"))
                .child(
                    &site.spec_item,
                    FakeElement::new()
                        .child(&site.spec_label, FakeElement::text("Carburant"))
                        .child(&site.spec_value, FakeElement::text("Essence")),
                )
                .child(
                    &site.carousel_image,
                    FakeElement::new().attr("src", "https://cdn/yaris.png"),
                ),
        );
    }

    #[tokio::test]
    async fn test_pipeline_end_to_end() {
        let site = SiteProfile::auto24();
        let session = FakeSession::new();
        fake_site(&session, &site);
        let fetcher = FakeFetcher::new();
        fetcher.respond("https://cdn/yaris.png", FakeResponse::ok("image/png", b"PNG"));

        let dir = tempdir().unwrap();
        let output = dir.path();
        let config = config(output);
        let pipeline = Pipeline::new(&session, &fetcher, &config, &site);
        let result = pipeline.run().await.unwrap();

        assert_eq!(result.listings.len(), 2);
        assert_eq!(result.enriched.len(), 2);
        assert_eq!(result.enriched[0].listing.seller_type, SellerType::Professional);
        assert_eq!(result.enriched[0].detail.fuel, "Essence");
        assert_eq!(result.enriched[1].detail, DetailRecord::unavailable());

        // 2件目はURLなしなので遷移しない
        assert_eq!(session.navigations(), vec![LISTINGS, DETAIL_1]);

        assert!(config.listings_csv().exists());
        assert!(config.details_csv().exists());
        assert!(config
            .images_dir()
            .join("1_Toyota_Yaris")
            .join("image_1.png")
            .exists());

        let details = std::fs::read_to_string(config.details_csv()).unwrap();
        assert_eq!(details.lines().count(), 3);
        assert!(details.lines().nth(2).unwrap().starts_with("2;Fiat Tipo;0;"));
        assert!(details.contains(UNAVAILABLE));
    }

    #[tokio::test]
    async fn test_enrich_file_from_existing_listings() {
        let site = SiteProfile::auto24();
        let session = FakeSession::new();
        fake_site(&session, &site);
        let fetcher = FakeFetcher::new();

        let dir = tempdir().unwrap();
        let output = dir.path();
        let config = config(output).with_download_images(false);
        let pipeline = Pipeline::new(&session, &fetcher, &config, &site);

        let listings = pipeline.run_collect().await.unwrap();
        assert_eq!(listings.len(), 2);

        let out = output.join("details_only.csv");
        let enriched = pipeline
            .enrich_file(&config.listings_csv(), &out)
            .await
            .unwrap();
        assert_eq!(enriched.len(), 2);
        assert_eq!(enriched[0].listing, listings[0]);
        assert!(out.exists());
    }

    #[tokio::test]
    async fn test_enrich_file_skips_malformed_row() {
        let site = SiteProfile::auto24();
        let session = FakeSession::new();
        fake_site(&session, &site);
        let fetcher = FakeFetcher::new();

        let dir = tempdir().unwrap();
        let output = dir.path();
        let config = config(output).with_download_images(false);
        let pipeline = Pipeline::new(&session, &fetcher, &config, &site);
        pipeline.run_collect().await.unwrap();

        // 1件目と2件目の間に列数の足りない行を挟む
        let written = std::fs::read_to_string(config.listings_csv()).unwrap();
        let mut lines: Vec<&str> = written.lines().collect();
        lines.insert(2, "7;Renault Clio;80000;Manuelle");
        let input = output.join("edited.csv");
        std::fs::write(&input, lines.join("\n")).unwrap();

        let enriched = pipeline
            .enrich_file(&input, &output.join("details.csv"))
            .await
            .unwrap();
        let ids: Vec<u32> = enriched.iter().map(|r| r.listing.sequence_id).collect();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(enriched[0].detail.fuel, "Essence");
    }

    #[tokio::test]
    async fn test_no_listings_aborts_before_details() {
        let site = SiteProfile::auto24();
        let session = FakeSession::new();
        session.add_page(LISTINGS, FakeElement::new());
        let fetcher = FakeFetcher::new();

        let dir = tempdir().unwrap();
        let output = dir.path();
        let config = config(output);
        let pipeline = Pipeline::new(&session, &fetcher, &config, &site);

        let result = pipeline.run().await;
        assert!(matches!(result, Err(ScraperError::NoListings(_))));
        assert!(!config.details_csv().exists());
    }

    #[test]
    fn test_scrape_request_builder() {
        let req = ScrapeRequest::new("/tmp/out")
            .with_headless(false)
            .with_max_scroll_rounds(8)
            .with_download_images(false);

        assert_eq!(req.output_dir, PathBuf::from("/tmp/out"));
        assert!(!req.headless);
        assert_eq!(req.max_scroll_rounds, 8);
        assert!(!req.download_images);
    }

    #[test]
    fn test_scrape_request_to_config() {
        let req = ScrapeRequest::new("/tmp/out").with_listings_url("https://example.test/list");
        let config: ScraperConfig = req.into();

        assert_eq!(config.listings_url, "https://example.test/list");
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.max_images, 10);
    }
}
