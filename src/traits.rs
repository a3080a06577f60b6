//! ブラウザ・HTTPとの境界
//!
//! 収集・詳細取得ロジックはこの狭いインターフェースだけに依存する。

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ScraperError;

/// DOM要素ハンドル
#[async_trait]
pub trait PageElement: Send + Sync + Sized {
    /// 子孫要素をすべて取得（見つからなければ空）
    async fn find_all(&self, selector: &str) -> Result<Vec<Self>, ScraperError>;

    /// 最初に一致する子孫要素
    async fn find(&self, selector: &str) -> Result<Option<Self>, ScraperError> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }

    /// 表示テキスト（innerText）
    async fn text(&self) -> Result<String, ScraperError>;

    /// 属性値。`href` / `src` は絶対URLで返す
    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError>;

    /// 要素を画面中央までスクロール
    async fn scroll_into_view(&self) -> Result<(), ScraperError>;

    /// レイアウト上で可視か
    async fn is_visible(&self) -> Result<bool, ScraperError>;
}

/// 1ページを操作するブラウザセッション
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Element: PageElement;

    async fn navigate(&self, url: &str) -> Result<(), ScraperError>;

    /// スクリプトを評価して結果をJSON値で返す
    async fn execute(&self, script: &str) -> Result<serde_json::Value, ScraperError>;

    async fn current_url(&self) -> Result<String, ScraperError>;

    /// ドキュメント全体から要素を検索
    async fn find_all(&self, selector: &str) -> Result<Vec<Self::Element>, ScraperError>;

    async fn find(&self, selector: &str) -> Result<Option<Self::Element>, ScraperError> {
        Ok(self.find_all(selector).await?.into_iter().next())
    }
}

/// ストリーミング受信中のHTTPレスポンス
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: BoxStream<'static, Result<Vec<u8>, ScraperError>>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("content_type", &self.content_type)
            .finish_non_exhaustive()
    }
}

/// 画像取得用HTTPクライアント
#[async_trait]
pub trait HttpFetch: Send + Sync {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        timeout: Duration,
    ) -> Result<HttpResponse, ScraperError>;
}
