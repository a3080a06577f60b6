//! 一覧ページの収集
//!
//! 無限スクロールで読み込めるだけ読み込んだ後、描画済みカードを一括で
//! 取得して1枚ずつフィールドを抽出する。

use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::{truncate_error, ScraperError};
use crate::extract::{
    attribute_within, has_any, own_text, text_within, wait_for_all, Extracted, Timing, WaitCondition,
};
use crate::traits::{BrowserSession, PageElement};

use super::normalize::{clean_price, feature_value, image_folder_name};
use super::site::SiteProfile;
use super::types::{ListingRecord, SellerType};

pub(crate) const SCROLL_SCRIPT: &str = "window.scrollBy(0, window.innerHeight * 0.8)";
pub(crate) const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";

const TRANSMISSION_INDEX: usize = 0;
const FUEL_INDEX: usize = 1;
const MILEAGE_INDEX: usize = 2;

/// 一覧収集器
pub struct ListingCollector<'a, S: BrowserSession> {
    session: &'a S,
    config: &'a ScraperConfig,
    site: &'a SiteProfile,
}

impl<'a, S: BrowserSession> ListingCollector<'a, S> {
    pub fn new(session: &'a S, config: &'a ScraperConfig, site: &'a SiteProfile) -> Self {
        Self {
            session,
            config,
            site,
        }
    }

    fn timing(&self, timeout: Duration) -> Timing {
        Timing::new(timeout, self.config.poll_interval)
    }

    /// 一覧ページを読み込み、全カードのレコードを返す
    ///
    /// カード単位の失敗はスキップして続行する。カードが1枚も現れない場合のみ
    /// `NoListings` を返す。
    pub async fn collect_listings(
        &self,
        max_scroll_rounds: u32,
    ) -> Result<Vec<ListingRecord>, ScraperError> {
        info!("一覧ページを読み込み中: {}", self.config.listings_url);
        self.session.navigate(&self.config.listings_url).await?;

        let rounds = self.paginate(max_scroll_rounds).await;
        debug!("スクロール完了: {}回", rounds);

        // ここで取得した一覧を固定して処理する（処理中の再検索はしない）
        let cards = wait_for_all(
            || self.session.find_all(&self.site.card),
            WaitCondition::Present,
            self.timing(self.config.listings_wait),
        )
        .await;

        if cards.is_empty() {
            return Err(ScraperError::NoListings(format!(
                "{} が{:?}以内に見つかりません",
                self.site.card, self.config.listings_wait
            )));
        }
        info!("{}件のカードを検出", cards.len());

        let mut records = Vec::with_capacity(cards.len());
        let mut next_id: u32 = 1;

        for (position, card) in cards.iter().enumerate() {
            match self.extract_card(card, next_id).await {
                Ok(record) => {
                    info!("カード {} 処理完了", record.sequence_id);
                    records.push(record);
                    next_id += 1;
                }
                Err(e) => {
                    warn!(
                        "カード {} (位置 {}) をスキップ: {}",
                        next_id,
                        position + 1,
                        truncate_error(&e, 50)
                    );
                }
            }
        }

        info!("一覧収集完了: {}件", records.len());
        Ok(records)
    }

    /// ページ高さが変わらなくなるか上限回数に達するまでスクロールする
    ///
    /// 実際にスクロールした回数を返す。
    pub async fn paginate(&self, max_scroll_rounds: u32) -> u32 {
        let mut last_height = match self.document_height().await {
            Ok(h) => h,
            Err(e) => {
                warn!("ページ高さを取得できません: {}", truncate_error(&e, 80));
                return 0;
            }
        };

        let mut rounds = 0;
        while rounds < max_scroll_rounds {
            if let Err(e) = self.session.execute(SCROLL_SCRIPT).await {
                warn!("スクロール失敗: {}", truncate_error(&e, 80));
                break;
            }
            rounds += 1;
            sleep(self.config.scroll_settle).await;

            let new_height = match self.document_height().await {
                Ok(h) => h,
                Err(e) => {
                    warn!("ページ高さを取得できません: {}", truncate_error(&e, 80));
                    break;
                }
            };
            debug!("スクロール {}: 高さ {} -> {}", rounds, last_height, new_height);

            if new_height == last_height {
                break;
            }
            last_height = new_height;
        }

        rounds
    }

    async fn document_height(&self) -> Result<i64, ScraperError> {
        let value = self.session.execute(HEIGHT_SCRIPT).await?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f as i64))
            .ok_or_else(|| ScraperError::JavaScript(format!("高さが数値ではありません: {}", value)))
    }

    /// 1枚のカードからレコードを作る
    ///
    /// 個々のフィールドの欠損は固定値で埋める。カード自体を操作できない
    /// 場合のみエラーを返す。
    async fn extract_card(
        &self,
        card: &S::Element,
        sequence_id: u32,
    ) -> Result<ListingRecord, ScraperError> {
        card.scroll_into_view().await?;
        sleep(self.config.card_settle).await;

        let field_timing = self.timing(self.config.field_wait);

        let title = text_within(card, &self.site.card_title, WaitCondition::Visible, field_timing)
            .await
            .or_sentinel();
        let raw_price =
            text_within(card, &self.site.card_price, WaitCondition::Visible, field_timing)
                .await
                .or_sentinel();

        let features = card
            .find_all(&self.site.card_features)
            .await
            .unwrap_or_else(|e| {
                debug!("特徴欄を取得できません: {}", truncate_error(&e, 50));
                Vec::new()
            });
        let transmission = feature_at(&features, TRANSMISSION_INDEX, None).await;
        let fuel_type = feature_at(&features, FUEL_INDEX, None).await;
        let mileage = feature_at(&features, MILEAGE_INDEX, Some(&self.site.mileage_glyph)).await;

        let has_logo = has_any(card, &self.site.card_brand_logo).await;

        let permalink = attribute_within(
            card,
            &self.site.card_link,
            "href",
            WaitCondition::Present,
            Timing::immediate(),
        )
        .await
        .or_sentinel();

        let image_folder_name = image_folder_name(&title, sequence_id);

        Ok(ListingRecord {
            sequence_id,
            price: clean_price(&raw_price, &self.site.currency_suffix),
            title,
            transmission: transmission.or_sentinel(),
            fuel_type: fuel_type.or_sentinel(),
            mileage: mileage.or_sentinel(),
            seller_type: SellerType::from_brand_logo(has_logo),
            permalink,
            image_folder_name,
        })
    }
}

/// N番目の特徴欄の値。範囲外・空文字は欠損
async fn feature_at<E: PageElement>(
    features: &[E],
    index: usize,
    strip: Option<&str>,
) -> Extracted<String> {
    match features.get(index) {
        Some(element) => own_text(element)
            .await
            .and_then(|raw| Extracted::non_empty(feature_value(&raw, strip))),
        None => Extracted::Missing,
    }
}
