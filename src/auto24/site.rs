//! サイト固有のセレクタとラベル

use super::types::DetailField;

/// ページ構造の設定値
#[derive(Debug, Clone)]
pub struct SiteProfile {
    // 一覧ページ
    pub card: String,
    pub card_title: String,
    pub card_price: String,
    pub card_features: String,
    pub card_brand_logo: String,
    pub card_link: String,
    pub currency_suffix: String,
    /// 走行距離の特徴ラベルに付くアイコン文字
    pub mileage_glyph: String,

    // 詳細ページ
    pub detail_container: String,
    pub detail_price: String,
    pub spec_item: String,
    pub spec_label: String,
    pub spec_value: String,
    pub equipment_item: String,
    pub carousel_image: String,
    pub kilometrage_unit: String,
    /// ラベル部分文字列 → 項目。先に一致したものを採用
    pub spec_labels: Vec<(String, DetailField)>,
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self::auto24()
    }
}

impl SiteProfile {
    pub fn auto24() -> Self {
        let labels = [
            ("Année", DetailField::RegistrationPeriod),
            ("Kilométrage", DetailField::Mileage),
            ("Carburant", DetailField::Fuel),
            ("Boîte de vitesses", DetailField::Transmission),
            ("Places", DetailField::SeatCount),
            ("Carrosserie", DetailField::BodyType),
            ("Nombre de clés", DetailField::KeyCount),
            ("Couleur extérieure", DetailField::ExteriorColor),
            ("Couleur intérieure", DetailField::InteriorColor),
            ("Nombre de propriétaires", DetailField::OwnerCount),
            ("État", DetailField::Condition),
        ];

        Self {
            card: "div.card-holder".into(),
            card_title: "span.card-model".into(),
            card_price: "span.card-price".into(),
            card_features: "div.card-features > span.features-container".into(),
            card_brand_logo: "div.card-brand-logo".into(),
            card_link: "a.card-link".into(),
            currency_suffix: "DH".into(),
            mileage_glyph: "RW".into(),
            detail_container: "div.ant-col.content-container".into(),
            detail_price: "span.card-price".into(),
            spec_item: "div.specs-container div.spec-item".into(),
            spec_label: "span.spec-label".into(),
            spec_value: "span.spec-value".into(),
            equipment_item: "div.features-container div.feature-item".into(),
            carousel_image: "div.carousel-image img".into(),
            kilometrage_unit: "KM".into(),
            spec_labels: labels
                .into_iter()
                .map(|(label, field)| (label.to_string(), field))
                .collect(),
        }
    }

    /// ラベルに対応する項目（大文字小文字を区別する部分一致）
    pub fn match_label(&self, label: &str) -> Option<DetailField> {
        self.spec_labels
            .iter()
            .find(|(needle, _)| label.contains(needle.as_str()))
            .map(|(_, field)| *field)
    }
}
