use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ブラウザ初期化エラー: {0}")]
    BrowserInit(String),

    #[error("ナビゲーションエラー: {0}")]
    Navigation(String),

    #[error("JavaScript実行エラー: {0}")]
    JavaScript(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("要素が見つかりません: {0}")]
    ElementNotFound(String),

    #[error("一覧が見つかりません: {0}")]
    NoListings(String),

    #[error("HTTPエラー: {0}")]
    Http(String),

    #[error("HTTPステータス異常: {status} ({url})")]
    HttpStatus { status: u16, url: String },

    #[error("CSVエラー: {0}")]
    Csv(String),

    #[error("結合キー不一致: 行{row} 期待={expected} 実際={found}")]
    JoinKeyMismatch { row: usize, expected: u32, found: u32 },

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("リトライ上限到達 ({attempts}回): {message}")]
    RetriesExhausted { attempts: u32, message: String },
}

impl From<csv::Error> for ScraperError {
    fn from(e: csv::Error) -> Self {
        ScraperError::Csv(e.to_string())
    }
}

impl From<reqwest::Error> for ScraperError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ScraperError::Timeout(e.to_string())
        } else {
            ScraperError::Http(e.to_string())
        }
    }
}

/// ログ出力用にエラーメッセージを先頭 `max_chars` 文字に切り詰める
pub fn truncate_error(err: &impl std::fmt::Display, max_chars: usize) -> String {
    let text = err.to_string();
    if text.chars().count() <= max_chars {
        return text;
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
