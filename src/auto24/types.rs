//! Auto24 レコード型

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ScraperError;
use crate::extract::UNAVAILABLE;

use super::normalize::parse_kilometrage;

/// 出品者区分（ブランドロゴの有無で判定）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SellerType {
    Professional,
    Individual,
}

impl SellerType {
    pub fn from_brand_logo(present: bool) -> Self {
        if present {
            SellerType::Professional
        } else {
            SellerType::Individual
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SellerType::Professional => "Professional",
            SellerType::Individual => "Individual",
        }
    }
}

/// 一覧ページの1カード分
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingRecord {
    #[serde(rename = "ID")]
    pub sequence_id: u32,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Price")]
    pub price: i64,
    #[serde(rename = "Transmission")]
    pub transmission: String,
    #[serde(rename = "FuelType")]
    pub fuel_type: String,
    #[serde(rename = "Mileage")]
    pub mileage: String,
    #[serde(rename = "SellerType")]
    pub seller_type: SellerType,
    #[serde(rename = "ListingURL")]
    pub permalink: String,
    #[serde(rename = "ImageFolder")]
    pub image_folder_name: String,
}

impl ListingRecord {
    /// serde の列名と同じ並び（レコードが0件のときのヘッダー出力用）
    pub const HEADERS: [&'static str; 9] = [
        "ID",
        "Title",
        "Price",
        "Transmission",
        "FuelType",
        "Mileage",
        "SellerType",
        "ListingURL",
        "ImageFolder",
    ];

    pub fn has_permalink(&self) -> bool {
        let link = self.permalink.trim();
        !link.is_empty() && link != UNAVAILABLE
    }
}

/// 詳細ページの仕様項目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailField {
    RegistrationPeriod,
    Mileage,
    Fuel,
    Transmission,
    SeatCount,
    BodyType,
    KeyCount,
    ExteriorColor,
    InteriorColor,
    OwnerCount,
    Condition,
}

/// 詳細ページから得た情報。読めなかった項目は固定値のまま
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    pub registration_period: String,
    pub mileage: i64,
    pub fuel: String,
    pub transmission: String,
    pub seat_count: String,
    pub body_type: String,
    pub key_count: String,
    pub exterior_color: String,
    pub interior_color: String,
    pub owner_count: String,
    pub condition: String,
    pub equipment: Vec<String>,
    pub detailed_price: String,
}

impl Default for DetailRecord {
    fn default() -> Self {
        Self::unavailable()
    }
}

impl DetailRecord {
    pub fn unavailable() -> Self {
        let na = || UNAVAILABLE.to_string();
        Self {
            registration_period: na(),
            mileage: 0,
            fuel: na(),
            transmission: na(),
            seat_count: na(),
            body_type: na(),
            key_count: na(),
            exterior_color: na(),
            interior_color: na(),
            owner_count: na(),
            condition: na(),
            equipment: Vec::new(),
            detailed_price: na(),
        }
    }

    /// 仕様項目の値を対応フィールドに書き込む
    ///
    /// 走行距離だけは数値変換が必要で、失敗しても他の項目には影響しない。
    pub fn apply(&mut self, field: DetailField, value: &str, kilometrage_unit: &str) {
        let value = value.to_string();
        match field {
            DetailField::RegistrationPeriod => self.registration_period = value,
            DetailField::Mileage => match parse_kilometrage(&value, kilometrage_unit) {
                Some(km) => self.mileage = km,
                None => debug!("走行距離を解析できません: {:?}", value),
            },
            DetailField::Fuel => self.fuel = value,
            DetailField::Transmission => self.transmission = value,
            DetailField::SeatCount => self.seat_count = value,
            DetailField::BodyType => self.body_type = value,
            DetailField::KeyCount => self.key_count = value,
            DetailField::ExteriorColor => self.exterior_color = value,
            DetailField::InteriorColor => self.interior_color = value,
            DetailField::OwnerCount => self.owner_count = value,
            DetailField::Condition => self.condition = value,
        }
    }

    /// CSV出力用の装備一覧
    pub fn equipment_display(&self) -> String {
        self.equipment.join(" | ")
    }
}

/// 一覧レコードと詳細レコードの結合結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedRecord {
    pub listing: ListingRecord,
    pub detail: DetailRecord,
}

impl EnrichedRecord {
    pub const HEADERS: [&'static str; 20] = [
        "ID",
        "Title",
        "Price",
        "Transmission",
        "FuelType",
        "Mileage",
        "SellerType",
        "RegistrationDate",
        "Mileage",
        "Fuel",
        "Transmission",
        "Seats",
        "BodyType",
        "KeyCount",
        "ExteriorColor",
        "InteriorColor",
        "OwnerCount",
        "Condition",
        "Equipment",
        "DetailedPrice",
    ];

    /// 結合キー（sequence_id）を検証して結合する
    pub fn join(
        listing: ListingRecord,
        detail_id: u32,
        detail: DetailRecord,
        row: usize,
    ) -> Result<Self, ScraperError> {
        if listing.sequence_id != detail_id {
            return Err(ScraperError::JoinKeyMismatch {
                row,
                expected: listing.sequence_id,
                found: detail_id,
            });
        }
        Ok(Self { listing, detail })
    }

    pub fn csv_row(&self) -> [String; 20] {
        let l = &self.listing;
        let d = &self.detail;
        [
            l.sequence_id.to_string(),
            l.title.clone(),
            l.price.to_string(),
            l.transmission.clone(),
            l.fuel_type.clone(),
            l.mileage.clone(),
            l.seller_type.as_str().to_string(),
            d.registration_period.clone(),
            d.mileage.to_string(),
            d.fuel.clone(),
            d.transmission.clone(),
            d.seat_count.clone(),
            d.body_type.clone(),
            d.key_count.clone(),
            d.exterior_color.clone(),
            d.interior_color.clone(),
            d.owner_count.clone(),
            d.condition.clone(),
            d.equipment_display(),
            d.detailed_price.clone(),
        ]
    }
}

/// 一覧と詳細を行ごとに結合する（件数・順序・IDがすべて一致すること）
pub fn merge_details(
    listings: &[ListingRecord],
    details: Vec<(u32, DetailRecord)>,
) -> Result<Vec<EnrichedRecord>, ScraperError> {
    if listings.len() != details.len() {
        let row = listings.len().min(details.len()) + 1;
        let expected = listings.get(row - 1).map(|l| l.sequence_id).unwrap_or(0);
        let found = details.get(row - 1).map(|(id, _)| *id).unwrap_or(0);
        return Err(ScraperError::JoinKeyMismatch {
            row,
            expected,
            found,
        });
    }

    listings
        .iter()
        .cloned()
        .zip(details)
        .enumerate()
        .map(|(i, (listing, (id, detail)))| EnrichedRecord::join(listing, id, detail, i + 1))
        .collect()
}
