//! 詳細ページのカルーセル画像を保存する

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::{truncate_error, ScraperError};
use crate::extract::{own_attribute, wait_for_all, wait_until_visible, Timing, WaitCondition};
use crate::traits::{BrowserSession, HttpFetch, PageElement};

use super::site::SiteProfile;

/// Content-Type から拡張子を決める
pub fn extension_for(content_type: Option<&str>) -> &'static str {
    match content_type {
        Some(ct) if ct.contains("jpeg") => ".jpg",
        Some(ct) if ct.contains("png") => ".png",
        _ => ".webp",
    }
}

/// 1ページ分の保存結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageReport {
    pub saved: Vec<PathBuf>,
    pub skipped: usize,
}

pub struct ImageDownloader<'a, S: BrowserSession, H: HttpFetch> {
    session: &'a S,
    fetcher: &'a H,
    config: &'a ScraperConfig,
    site: &'a SiteProfile,
}

impl<'a, S: BrowserSession, H: HttpFetch> ImageDownloader<'a, S, H> {
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

    /// 現在のページの画像を最大 `max_images` 枚保存する
    ///
    /// 1枚ごとにリトライし、上限に達した画像はスキップして次へ進む。
    pub async fn download_all(&self, folder: &Path) -> ImageReport {
        let mut report = ImageReport::default();

        if let Err(e) = fs::create_dir_all(folder).await {
            warn!("画像フォルダを作成できません {:?}: {}", folder, e);
            return report;
        }

        let images = wait_for_all(
            || self.session.find_all(&self.site.carousel_image),
            WaitCondition::Present,
            Timing::new(self.config.image_list_wait, self.config.poll_interval),
        )
        .await;

        if images.is_empty() {
            debug!("画像が見つかりません");
            return report;
        }

        for (idx, image) in images.iter().take(self.config.max_images).enumerate() {
            let number = idx + 1;
            if own_attribute(image, "src").await.is_missing() {
                debug!("image_{}: src なし", number);
                continue;
            }

            let label = format!("image_{}", number);
            let result = self
                .config
                .image_retry
                .run(|_| self.download_one(image, folder, number))
                .await;

            match result {
                Ok(path) => report.saved.push(path),
                Err(e) => {
                    warn!("画像 {} をスキップ: {}", label, truncate_error(&e, 80));
                    report.skipped += 1;
                }
            }
        }

        info!(
            "画像保存: {}枚成功, {}枚スキップ ({:?})",
            report.saved.len(),
            report.skipped,
            folder
        );
        report
    }

    /// スクロール → 表示待ち → URL取得 → ダウンロード → 書き込み
    async fn download_one(
        &self,
        image: &S::Element,
        folder: &Path,
        number: usize,
    ) -> Result<PathBuf, ScraperError> {
        image.scroll_into_view().await?;
        tokio::time::sleep(self.config.card_settle).await;

        let timing = Timing::new(self.config.image_visible_wait, self.config.poll_interval);
        if !wait_until_visible(image, timing).await {
            return Err(ScraperError::Timeout(format!(
                "image_{} が表示されません",
                number
            )));
        }

        let url = image
            .attribute("src")
            .await?
            .filter(|src| !src.trim().is_empty())
            .ok_or_else(|| ScraperError::ElementNotFound(format!("image_{} の src", number)))?;

        let referer = self.session.current_url().await.unwrap_or_default();
        let headers = vec![
            ("User-Agent".to_string(), self.config.user_agent.clone()),
            ("Referer".to_string(), referer),
        ];

        let response = self
            .fetcher
            .get(&url, &headers, self.config.image_timeout)
            .await?;
        if !response.is_success() {
            return Err(ScraperError::HttpStatus {
                status: response.status,
                url,
            });
        }

        let extension = extension_for(response.content_type.as_deref());
        let path = folder.join(format!("image_{}{}", number, extension));

        if let Err(e) = write_stream(&path, response.body).await {
            let _ = fs::remove_file(&path).await;
            return Err(e);
        }

        debug!("保存: {:?}", path);
        Ok(path)
    }
}

async fn write_stream(
    path: &Path,
    mut body: futures::stream::BoxStream<'static, Result<Vec<u8>, ScraperError>>,
) -> Result<(), ScraperError> {
    let mut file = fs::File::create(path).await?;
    while let Some(chunk) = body.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;
    Ok(())
}
