//! フォールバック付き要素抽出
//!
//! 1つのフィールドが読めなくてもエラーにはせず `Extracted::Missing` を返す。
//! 待機は呼び出し側が指定した上限時間までのポーリングで、内部リトライはしない。

use std::future::Future;
use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::debug;

use crate::error::{truncate_error, ScraperError};
use crate::traits::{BrowserSession, PageElement};

/// 値が読めなかったことを表す固定値
pub const UNAVAILABLE: &str = "unavailable";

/// フィールド単位の抽出結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extracted<T> {
    Value(T),
    Missing,
}

impl<T> Extracted<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Extracted::Missing)
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Extracted::Value(v) => Some(v),
            Extracted::Missing => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Extracted<U> {
        match self {
            Extracted::Value(v) => Extracted::Value(f(v)),
            Extracted::Missing => Extracted::Missing,
        }
    }

    pub fn and_then<U>(self, f: impl FnOnce(T) -> Extracted<U>) -> Extracted<U> {
        match self {
            Extracted::Value(v) => f(v),
            Extracted::Missing => Extracted::Missing,
        }
    }

    pub fn unwrap_or(self, default: T) -> T {
        self.into_option().unwrap_or(default)
    }
}

impl Extracted<String> {
    /// 欠損時は `UNAVAILABLE` を返す
    pub fn or_sentinel(self) -> String {
        match self {
            Extracted::Value(v) => v,
            Extracted::Missing => UNAVAILABLE.to_string(),
        }
    }

    /// 前後の空白を除去し、空なら欠損扱い
    pub fn non_empty(text: impl AsRef<str>) -> Self {
        let trimmed = text.as_ref().trim();
        if trimmed.is_empty() {
            Extracted::Missing
        } else {
            Extracted::Value(trimmed.to_string())
        }
    }
}

impl<T> From<Option<T>> for Extracted<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => Extracted::Value(v),
            None => Extracted::Missing,
        }
    }
}

/// 待機条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitCondition {
    /// DOMに存在すればよい
    Present,
    /// 表示されている必要がある
    Visible,
}

/// 待機の上限とポーリング間隔
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub timeout: Duration,
    pub poll: Duration,
}

impl Timing {
    pub fn new(timeout: Duration, poll: Duration) -> Self {
        Self { timeout, poll }
    }

    /// 1回だけ確認する
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

/// 条件を満たす要素が現れるまで待つ
///
/// `lookup` は毎回のポーリングで呼ばれる。上限時間内に見つからなければ空を返す。
/// 少なくとも1回は確認する。
pub async fn wait_for_all<E, F, Fut>(
    mut lookup: F,
    condition: WaitCondition,
    timing: Timing,
) -> Vec<E>
where
    E: PageElement,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<E>, ScraperError>>,
{
    let start = Instant::now();

    loop {
        match lookup().await {
            Ok(found) if !found.is_empty() => match condition {
                WaitCondition::Present => return found,
                WaitCondition::Visible => {
                    let mut visible = Vec::with_capacity(found.len());
                    for element in found {
                        if element.is_visible().await.unwrap_or(false) {
                            visible.push(element);
                        }
                    }
                    if !visible.is_empty() {
                        return visible;
                    }
                }
            },
            Ok(_) => {}
            Err(e) => debug!("要素検索エラー: {}", truncate_error(&e, 80)),
        }

        if start.elapsed() >= timing.timeout {
            return Vec::new();
        }
        sleep(timing.poll).await;
    }
}

/// 条件を満たす最初の要素を待つ
pub async fn wait_for_one<E, F, Fut>(
    lookup: F,
    condition: WaitCondition,
    timing: Timing,
) -> Extracted<E>
where
    E: PageElement,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<E>, ScraperError>>,
{
    wait_for_all(lookup, condition, timing)
        .await
        .into_iter()
        .next()
        .into()
}

/// `scope` 配下に要素が1つでもあれば true（検索エラーは false）
pub async fn has_any<E: PageElement>(scope: &E, selector: &str) -> bool {
    scope
        .find_all(selector)
        .await
        .map(|found| !found.is_empty())
        .unwrap_or(false)
}

/// 取得済みの要素が表示されるまで待つ
pub async fn wait_until_visible<E: PageElement>(element: &E, timing: Timing) -> bool {
    let start = Instant::now();

    loop {
        if element.is_visible().await.unwrap_or(false) {
            return true;
        }
        if start.elapsed() >= timing.timeout {
            return false;
        }
        sleep(timing.poll).await;
    }
}

/// 要素自身のテキスト（空なら欠損）
pub async fn own_text<E: PageElement>(element: &E) -> Extracted<String> {
    match element.text().await {
        Ok(text) => Extracted::non_empty(text),
        Err(e) => {
            debug!("テキスト取得失敗: {}", truncate_error(&e, 80));
            Extracted::Missing
        }
    }
}

/// 要素自身の属性値（空なら欠損）
pub async fn own_attribute<E: PageElement>(element: &E, name: &str) -> Extracted<String> {
    match element.attribute(name).await {
        Ok(Some(value)) => Extracted::non_empty(value),
        Ok(None) => Extracted::Missing,
        Err(e) => {
            debug!("属性取得失敗 ({}): {}", name, truncate_error(&e, 80));
            Extracted::Missing
        }
    }
}

/// `scope` 配下の要素のテキストを読む
pub async fn text_within<E: PageElement>(
    scope: &E,
    selector: &str,
    condition: WaitCondition,
    timing: Timing,
) -> Extracted<String> {
    match wait_for_one(|| scope.find_all(selector), condition, timing).await {
        Extracted::Value(element) => own_text(&element).await,
        Extracted::Missing => {
            debug!("要素なし: {}", selector);
            Extracted::Missing
        }
    }
}

/// `scope` 配下の要素の属性を読む
pub async fn attribute_within<E: PageElement>(
    scope: &E,
    selector: &str,
    name: &str,
    condition: WaitCondition,
    timing: Timing,
) -> Extracted<String> {
    match wait_for_one(|| scope.find_all(selector), condition, timing).await {
        Extracted::Value(element) => own_attribute(&element, name).await,
        Extracted::Missing => Extracted::Missing,
    }
}

/// ドキュメント全体から要素のテキストを読む
pub async fn document_text<S: BrowserSession>(
    session: &S,
    selector: &str,
    condition: WaitCondition,
    timing: Timing,
) -> Extracted<String> {
    match wait_for_one(|| session.find_all(selector), condition, timing).await {
        Extracted::Value(element) => own_text(&element).await,
        Extracted::Missing => {
            debug!("要素なし: {}", selector);
            Extracted::Missing
        }
    }
}
