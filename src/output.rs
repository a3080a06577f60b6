//! CSV入出力（セミコロン区切り・UTF-8・ヘッダー行あり）

use std::fs::File;
use std::path::Path;

use tracing::{info, warn};

use crate::auto24::{EnrichedRecord, ListingRecord};
use crate::error::{truncate_error, ScraperError};

const DELIMITER: u8 = b';';

fn create_writer(path: &Path, has_headers: bool) -> Result<csv::Writer<File>, ScraperError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(has_headers)
        .from_path(path)?)
}

/// 一覧CSVを書き出す（ヘッダーは serde の列名から生成）
pub fn write_listings(path: &Path, records: &[ListingRecord]) -> Result<(), ScraperError> {
    let mut writer = create_writer(path, true)?;
    if records.is_empty() {
        writer.write_record(ListingRecord::HEADERS)?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;

    info!("一覧を保存しました: {:?} ({}件)", path, records.len());
    Ok(())
}

fn line_of(position: Option<&csv::Position>) -> String {
    position
        .map(|p| p.line().to_string())
        .unwrap_or_else(|| "?".to_string())
}

/// 一覧CSVを読み込む
///
/// 列数が合わない行や値を解釈できない行は警告を出して読み飛ばす。
pub fn read_listings(path: &Path) -> Result<Vec<ListingRecord>, ScraperError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    let mut skipped = 0usize;

    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(
                    "{}行目が不正なため読み飛ばします: {}",
                    line_of(e.position()),
                    truncate_error(&e, 80)
                );
                skipped += 1;
                continue;
            }
        };

        let parsed: Result<ListingRecord, csv::Error> = row.deserialize(Some(&headers));
        match parsed {
            Ok(record) => records.push(record),
            Err(e) => {
                warn!(
                    "{}行目が不正なため読み飛ばします: {}",
                    line_of(row.position()),
                    truncate_error(&e, 80)
                );
                skipped += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("{:?}: {}行を読み飛ばしました", path, skipped);
    }
    Ok(records)
}

/// 詳細付きCSVを書き出す
pub fn write_enriched(path: &Path, records: &[EnrichedRecord]) -> Result<(), ScraperError> {
    let mut writer = create_writer(path, false)?;
    writer.write_record(EnrichedRecord::HEADERS)?;
    for record in records {
        writer.write_record(record.csv_row())?;
    }
    writer.flush()?;

    info!("詳細を保存しました: {:?} ({}件)", path, records.len());
    Ok(())
}
