//! 文字列フィールドの正規化

use std::sync::OnceLock;

use regex::Regex;

const FOLDER_NAME_MAX_CHARS: usize = 50;

fn non_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w\s]").expect("valid regex"))
}

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn strip_spaces(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{202f}' && *c != '\u{a0}')
        .collect()
}

/// 価格文字列を整数に変換（"120 000 DH" → 120000）。解析できなければ0
pub fn clean_price(raw: &str, currency_suffix: &str) -> i64 {
    let without_currency = raw.replace(currency_suffix, "");
    strip_spaces(&without_currency).parse().unwrap_or(0)
}

/// 走行距離文字列を整数に変換（"85 000 KM" → 85000）
pub fn parse_kilometrage(raw: &str, unit_suffix: &str) -> Option<i64> {
    let without_unit = raw.replace(unit_suffix, "");
    strip_spaces(&without_unit).parse().ok()
}

/// カードの特徴ラベルから値部分を取り出す（最終行を使う）
pub fn feature_value(raw: &str, strip: Option<&str>) -> String {
    let last = raw.lines().last().unwrap_or_default();
    let value = match strip {
        Some(glyph) if !glyph.is_empty() => last.replace(glyph, ""),
        _ => last.to_string(),
    };
    value.trim().to_string()
}

/// 英数字・`_`・空白以外を除去し、空白の連続を `_` にする
fn sanitize(text: &str) -> String {
    let cleaned = non_word_re().replace_all(text, "");
    whitespace_re().replace_all(&cleaned, "_").into_owned()
}

/// 画像保存フォルダ名 `"{id}_{sanitized_title}"`
pub fn image_folder_name(title: &str, sequence_id: u32) -> String {
    let truncated: String = sanitize(title).chars().take(FOLDER_NAME_MAX_CHARS).collect();
    format!("{}_{}", sequence_id, truncated)
}

/// CSVから読み込んだフォルダ名を画像ディレクトリ直下の1階層に限定する
///
/// `image_folder_name` の結果はそのまま返る。何も残らなければ `None`。
pub fn safe_folder_name(name: &str) -> Option<String> {
    let cleaned = sanitize(name);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
