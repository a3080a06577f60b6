//! 詳細ページの取得
//!
//! 失敗はすべてレコード単位で吸収し、読めなかった項目は固定値のまま返す。

use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::truncate_error;
use crate::extract::{
    document_text, own_text, text_within, wait_for_one, Extracted, Timing, WaitCondition,
    UNAVAILABLE,
};
use crate::traits::{BrowserSession, HttpFetch};

use super::images::ImageDownloader;
use super::normalize::safe_folder_name;
use super::site::SiteProfile;
use super::types::DetailRecord;

pub struct DetailEnricher<'a, S: BrowserSession, H: HttpFetch> {
    session: &'a S,
    fetcher: &'a H,
    config: &'a ScraperConfig,
    site: &'a SiteProfile,
}

impl<'a, S: BrowserSession, H: HttpFetch> DetailEnricher<'a, S, H> {
    pub fn new(
        session: &'a S,
        fetcher: &'a H,
        config: &'a ScraperConfig,
        site: &'a SiteProfile,
    ) -> Self {
        Self {
            session,
            fetcher,
            config,
            site,
        }
    }

    fn timing(&self, timeout: std::time::Duration) -> Timing {
        Timing::new(timeout, self.config.poll_interval)
    }

    /// 詳細ページを開いて項目を抽出し、画像を `image_folder_name` に保存する
    pub async fn enrich(&self, permalink: &str, image_folder_name: &str) -> DetailRecord {
        let permalink = permalink.trim();
        if permalink.is_empty() || permalink == UNAVAILABLE {
            debug!("URLなし、詳細取得をスキップ");
            return DetailRecord::unavailable();
        }

        if let Err(e) = self.session.navigate(permalink).await {
            warn!(
                "ページを読み込めません {}: {}",
                permalink,
                truncate_error(&e, 50)
            );
            return DetailRecord::unavailable();
        }

        let container = wait_for_one(
            || self.session.find_all(&self.site.detail_container),
            WaitCondition::Present,
            self.timing(self.config.detail_wait),
        )
        .await;
        if container.is_missing() {
            warn!("詳細コンテンツが表示されません: {}", permalink);
            return DetailRecord::unavailable();
        }

        let mut detail = DetailRecord::unavailable();

        if self.config.download_images {
            match safe_folder_name(image_folder_name) {
                Some(name) => {
                    let folder = self.config.images_dir().join(name);
                    ImageDownloader::new(self.session, self.fetcher, self.config, self.site)
                        .download_all(&folder)
                        .await;
                }
                None => warn!(
                    "画像フォルダ名が不正なため画像を保存しません: {:?}",
                    image_folder_name
                ),
            }
        }

        detail.detailed_price = document_text(
            self.session,
            &self.site.detail_price,
            WaitCondition::Visible,
            self.timing(self.config.field_wait),
        )
        .await
        .or_sentinel();

        self.extract_specs(&mut detail).await;
        detail.equipment = self.extract_equipment().await;

        info!(
            "詳細取得完了: {} (装備 {}件)",
            permalink,
            detail.equipment.len()
        );
        detail
    }

    /// (ラベル, 値) の組を既知ラベルに照合して書き込む。未知のラベルは無視
    async fn extract_specs(&self, detail: &mut DetailRecord) {
        let items = match self.session.find_all(&self.site.spec_item).await {
            Ok(items) => items,
            Err(e) => {
                warn!("仕様欄を取得できません: {}", truncate_error(&e, 50));
                return;
            }
        };

        let timing = self.timing(self.config.field_wait);
        for item in &items {
            let label = text_within(item, &self.site.spec_label, WaitCondition::Visible, timing)
                .await;
            let Extracted::Value(label) = label else {
                continue;
            };
            let Some(field) = self.site.match_label(&label) else {
                debug!("未対応のラベル: {}", label);
                continue;
            };

            let value = text_within(item, &self.site.spec_value, WaitCondition::Visible, timing)
                .await
                .or_sentinel();
            detail.apply(field, &value, &self.site.kilometrage_unit);
        }
    }

    /// 装備タグをページ順に取得（空文字は除外）
    async fn extract_equipment(&self) -> Vec<String> {
        let tags = match self.session.find_all(&self.site.equipment_item).await {
            Ok(tags) => tags,
            Err(e) => {
                warn!("装備欄を取得できません: {}", truncate_error(&e, 50));
                return Vec::new();
            }
        };

        let mut equipment = Vec::with_capacity(tags.len());
        for tag in &tags {
            if let Extracted::Value(text) = own_text(tag).await {
                equipment.push(text);
            }
        }
        equipment
    }
}
