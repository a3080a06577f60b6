//! テスト用の偽ブラウザ・偽HTTPクライアント・ログ記録

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::field::{Field, Visit};
use tracing::subscriber::DefaultGuard;
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::registry;

use crate::auto24::collector::{HEIGHT_SCRIPT, SCROLL_SCRIPT};
use crate::error::ScraperError;
use crate::traits::{BrowserSession, HttpFetch, HttpResponse, PageElement};

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    text: String,
    attrs: HashMap<String, String>,
    children: Vec<(String, FakeElement)>,
    hidden: bool,
    failing: bool,
    scroll_failing: bool,
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Default::default()
        }
    }

    pub fn child(mut self, selector: &str, element: FakeElement) -> Self {
        self.children.push((selector.to_string(), element));
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// 子要素検索がすべてエラーになる
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn scroll_failing(mut self) -> Self {
        self.scroll_failing = true;
        self
    }

    fn select(&self, selector: &str) -> Result<Vec<FakeElement>, ScraperError> {
        if self.failing {
            return Err(ScraperError::JavaScript("detached node".into()));
        }
        Ok(self
            .children
            .iter()
            .filter(|(sel, _)| sel == selector)
            .map(|(_, el)| el.clone())
            .collect())
    }
}

#[async_trait]
impl PageElement for FakeElement {
    async fn find_all(&self, selector: &str) -> Result<Vec<Self>, ScraperError> {
        self.select(selector)
    }

    async fn text(&self) -> Result<String, ScraperError> {
        Ok(self.text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError> {
        Ok(self.attrs.get(name).cloned())
    }

    async fn scroll_into_view(&self) -> Result<(), ScraperError> {
        if self.scroll_failing {
            return Err(ScraperError::JavaScript("node is not attached".into()));
        }
        Ok(())
    }

    async fn is_visible(&self) -> Result<bool, ScraperError> {
        Ok(!self.hidden)
    }
}

/// ドキュメント高さの返し方
#[derive(Debug, Clone)]
pub enum Heights {
    /// 順に返し、尽きたら最後の値を返し続ける
    Sequence(VecDeque<i64>),
    /// 呼ばれるたびに伸び続ける
    Growing(i64),
}

#[derive(Default)]
struct SessionState {
    pages: HashMap<String, FakeElement>,
    broken_urls: Vec<String>,
    current: Option<String>,
    navigations: Vec<String>,
    scrolls: u32,
    heights: Option<Heights>,
    last_height: i64,
}

#[derive(Default)]
pub struct FakeSession {
    state: Mutex<SessionState>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_page(&self, url: &str, root: FakeElement) {
        self.state
            .lock()
            .unwrap()
            .pages
            .insert(url.to_string(), root);
    }

    /// 遷移自体が失敗するURL
    pub fn add_broken_url(&self, url: &str) {
        self.state.lock().unwrap().broken_urls.push(url.to_string());
    }

    pub fn set_heights(&self, heights: Heights) {
        self.state.lock().unwrap().heights = Some(heights);
    }

    pub fn scroll_count(&self) -> u32 {
        self.state.lock().unwrap().scrolls
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    fn next_height(state: &mut SessionState) -> i64 {
        let height = match state.heights.as_mut() {
            Some(Heights::Sequence(queue)) => queue.pop_front().unwrap_or(state.last_height),
            Some(Heights::Growing(step)) => state.last_height + *step,
            None => state.last_height,
        };
        state.last_height = height;
        height
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<(), ScraperError> {
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        if state.broken_urls.iter().any(|u| u == url) {
            return Err(ScraperError::Navigation(format!("net::ERR_FAILED {}", url)));
        }
        state.current = Some(url.to_string());
        Ok(())
    }

    async fn execute(&self, script: &str) -> Result<serde_json::Value, ScraperError> {
        let mut state = self.state.lock().unwrap();
        if script == HEIGHT_SCRIPT {
            return Ok(serde_json::json!(Self::next_height(&mut state)));
        }
        if script == SCROLL_SCRIPT {
            state.scrolls += 1;
        }
        Ok(serde_json::Value::Null)
    }

    async fn current_url(&self) -> Result<String, ScraperError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .current
            .clone()
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<FakeElement>, ScraperError> {
        let root = {
            let state = self.state.lock().unwrap();
            state
                .current
                .as_ref()
                .and_then(|url| state.pages.get(url))
                .cloned()
        };
        match root {
            Some(root) => root.select(selector),
            None => Ok(Vec::new()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub chunks: Vec<Vec<u8>>,
}

impl FakeResponse {
    pub fn ok(content_type: &str, body: &[u8]) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_string()),
            chunks: body.chunks(3).map(|c| c.to_vec()).collect(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            chunks: Vec::new(),
        }
    }
}

#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, FakeResponse>>,
    calls: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, url: &str, response: FakeResponse) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), response);
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == url)
            .count()
    }

    pub fn last_headers(&self) -> Vec<(String, String)> {
        self.calls
            .lock()
            .unwrap()
            .last()
            .map(|(_, h)| h.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HttpFetch for FakeFetcher {
    async fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
        _timeout: Duration,
    ) -> Result<HttpResponse, ScraperError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), headers.to_vec()));

        let response = self.responses.lock().unwrap().get(url).cloned();
        let response =
            response.ok_or_else(|| ScraperError::Http(format!("connection refused: {}", url)))?;

        Ok(HttpResponse {
            status: response.status,
            content_type: response.content_type,
            body: futures::stream::iter(response.chunks.into_iter().map(Ok)).boxed(),
        })
    }
}

/// 発行されたログイベントのメッセージを記録するレイヤー
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<String>>>);

impl CapturedLogs {
    /// 現在のスレッドに記録用サブスクライバーを設定する
    pub fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let guard = tracing::subscriber::set_default(registry().with(logs.clone()));
        (logs, guard)
    }

    pub fn containing(&self, needle: &str) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.contains(needle))
            .cloned()
            .collect()
    }
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

impl<S: Subscriber> Layer<S> for CapturedLogs {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.0.lock().unwrap().push(visitor.0);
    }
}
