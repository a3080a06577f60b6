//! Auto24.ma スクレイパーモジュール
//!
//! 一覧ページからカードを収集し、各詳細ページで仕様・装備・画像を取得する

pub(crate) mod collector;
mod enricher;
mod images;
mod normalize;
mod site;
mod types;

pub use collector::ListingCollector;
pub use enricher::DetailEnricher;
pub use images::{extension_for, ImageDownloader, ImageReport};
pub use normalize::{clean_price, image_folder_name, parse_kilometrage, safe_folder_name};
pub use site::SiteProfile;
pub use types::{
    merge_details, DetailField, DetailRecord, EnrichedRecord, ListingRecord, SellerType,
};
