//! chromiumoxide によるブラウザセッション

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::traits::{BrowserSession, PageElement};

const SCROLL_INTO_VIEW_FN: &str =
    "function() { this.scrollIntoView({block: 'center', behavior: 'auto'}); }";

const IS_VISIBLE_FN: &str = r#"
function() {
    const style = window.getComputedStyle(this);
    const rect = this.getBoundingClientRect();
    return style.display !== 'none' &&
           style.visibility !== 'hidden' &&
           style.opacity !== '0' &&
           rect.width > 0 && rect.height > 0;
}
"#;

/// 1つのブラウザと1つのページを所有するセッション
///
/// `close` を呼ばずに破棄された場合もイベントハンドラは停止し、
/// ブラウザプロセスは `Browser` の破棄とともに終了する。
pub struct ChromeSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromeSession {
    /// ブラウザを起動して空ページを開く
    pub async fn launch(config: &ScraperConfig) -> Result<Self, ScraperError> {
        info!("ブラウザを初期化中...");

        let mut builder = BrowserConfig::builder()
            .window_size(1920, 1080)
            .no_sandbox()
            .request_timeout(config.timeout)
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg(format!("--user-agent={}", config.user_agent));

        if !config.headless {
            builder = builder.with_head();
        }

        if let Some(path) = config.resolve_chrome_path() {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScraperError::BrowserInit(format!("ブラウザ設定エラー: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        // ブラウザイベントハンドラをバックグラウンドで実行
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                debug!("Browser event: {:?}", event);
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScraperError::BrowserInit(e.to_string()))?;

        info!("ブラウザ初期化完了");
        Ok(Self {
            browser,
            page,
            handler,
        })
    }

    /// ブラウザを終了する
    pub async fn close(mut self) -> Result<(), ScraperError> {
        info!("ブラウザを終了中...");

        if let Err(e) = self.browser.close().await {
            debug!("ブラウザ終了コマンド失敗: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("ブラウザプロセス待機失敗: {}", e);
        }

        info!("ブラウザ終了完了");
        Ok(())
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Element = ChromeElement;

    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        self.page
            .wait_for_navigation()
            .await
            .map_err(|e| ScraperError::Navigation(e.to_string()))?;
        debug!("ページ遷移完了: {}", url);
        Ok(())
    }

    async fn execute(&self, script: &str) -> Result<serde_json::Value, ScraperError> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        Ok(result
            .into_value::<serde_json::Value>()
            .unwrap_or(serde_json::Value::Null))
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        self.page
            .url()
            .await
            .map(|url| url.unwrap_or_default())
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<ChromeElement>, ScraperError> {
        self.page
            .find_elements(selector)
            .await
            .map(|found| found.into_iter().map(ChromeElement).collect())
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", selector, e)))
    }
}

/// chromiumoxide の要素ハンドル
pub struct ChromeElement(Element);

#[async_trait]
impl PageElement for ChromeElement {
    async fn find_all(&self, selector: &str) -> Result<Vec<Self>, ScraperError> {
        self.0
            .find_elements(selector)
            .await
            .map(|found| found.into_iter().map(ChromeElement).collect())
            .map_err(|e| ScraperError::ElementNotFound(format!("{}: {}", selector, e)))
    }

    async fn text(&self) -> Result<String, ScraperError> {
        self.0
            .inner_text()
            .await
            .map(|text| text.unwrap_or_default())
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError> {
        // プロパティ優先（href / src が絶対URLになる）
        let property = self
            .0
            .property(name)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        if let Some(serde_json::Value::String(value)) = property {
            return Ok(Some(value));
        }

        self.0
            .attribute(name)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn scroll_into_view(&self) -> Result<(), ScraperError> {
        self.0
            .call_js_fn(SCROLL_INTO_VIEW_FN, false)
            .await
            .map(|_| ())
            .map_err(|e| ScraperError::JavaScript(e.to_string()))
    }

    async fn is_visible(&self) -> Result<bool, ScraperError> {
        let returns = self
            .0
            .call_js_fn(IS_VISIBLE_FN, false)
            .await
            .map_err(|e| ScraperError::JavaScript(e.to_string()))?;
        Ok(returns
            .result
            .value
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }
}
