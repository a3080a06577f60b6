use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

pub const DEFAULT_LISTINGS_URL: &str = "https://auto24.ma/buy-cars";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const LISTINGS_CSV: &str = "auto24_listings.csv";
const DETAILS_CSV: &str = "auto24_details.csv";
const IMAGES_DIR: &str = "images";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub listings_url: String,
    pub output_dir: PathBuf,
    pub headless: bool,
    /// 未指定時は `CHROME_PATH` / `CHROMIUM_PATH` 環境変数を参照
    pub chrome_path: Option<PathBuf>,
    /// CDPリクエストのタイムアウト
    pub timeout: Duration,
    pub user_agent: String,
    pub max_scroll_rounds: u32,
    /// スクロール後にコンテンツ読み込みを待つ時間
    pub scroll_settle: Duration,
    /// カードを画面中央に表示した後の待機
    pub card_settle: Duration,
    pub listings_wait: Duration,
    pub field_wait: Duration,
    pub detail_wait: Duration,
    pub image_list_wait: Duration,
    pub image_visible_wait: Duration,
    pub image_timeout: Duration,
    pub max_images: usize,
    pub image_retry: RetryPolicy,
    /// 詳細ページ間のアンチボット待機
    pub detail_pause: Duration,
    pub download_images: bool,
    pub poll_interval: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            listings_url: DEFAULT_LISTINGS_URL.to_string(),
            output_dir: PathBuf::from("./data"),
            headless: true,
            chrome_path: None,
            timeout: Duration::from_secs(60),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_scroll_rounds: 5,
            scroll_settle: Duration::from_secs(2),
            card_settle: Duration::from_millis(500),
            listings_wait: Duration::from_secs(30),
            field_wait: Duration::from_secs(5),
            detail_wait: Duration::from_secs(15),
            image_list_wait: Duration::from_secs(10),
            image_visible_wait: Duration::from_secs(10),
            image_timeout: Duration::from_secs(15),
            max_images: 10,
            image_retry: RetryPolicy::default(),
            detail_pause: Duration::from_secs(2),
            download_images: true,
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl ScraperConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            ..Default::default()
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

    pub fn with_chrome_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.chrome_path = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_scroll_rounds(mut self, rounds: u32) -> Self {
        self.max_scroll_rounds = rounds;
        self
    }

    pub fn with_max_images(mut self, max_images: usize) -> Self {
        self.max_images = max_images;
        self
    }

    pub fn with_image_retry(mut self, policy: RetryPolicy) -> Self {
        self.image_retry = policy;
        self
    }

    pub fn with_download_images(mut self, download: bool) -> Self {
        self.download_images = download;
        self
    }

    /// 待機・スリープ系をまとめて短縮する（テストやローカル確認用）
    pub fn with_fast_waits(mut self, wait: Duration) -> Self {
        self.scroll_settle = wait;
        self.card_settle = wait;
        self.listings_wait = wait;
        self.field_wait = wait;
        self.detail_wait = wait;
        self.image_list_wait = wait;
        self.image_visible_wait = wait;
        self.detail_pause = wait;
        self.poll_interval = wait.min(self.poll_interval);
        self
    }

    pub fn listings_csv(&self) -> PathBuf {
        self.output_dir.join(LISTINGS_CSV)
    }

    pub fn details_csv(&self) -> PathBuf {
        self.output_dir.join(DETAILS_CSV)
    }

    pub fn images_dir(&self) -> PathBuf {
        self.output_dir.join(IMAGES_DIR)
    }

    /// Chrome実行ファイルのパス（設定 → 環境変数の順）
    pub fn resolve_chrome_path(&self) -> Option<PathBuf> {
        self.chrome_path.clone().or_else(|| {
            std::env::var("CHROME_PATH")
                .or_else(|_| std::env::var("CHROMIUM_PATH"))
                .ok()
                .map(PathBuf::from)
        })
    }
}
