//! Production task runner: fetch, narrate, deliver, log.

use async_trait::async_trait;
use teloxide::prelude::Requester;

use crate::core::metrics;
use crate::core::utils::format_mb;
use crate::download::fetcher::{FetchedMedia, MediaFetcher};
use crate::download::queue::{Task, TaskOutcome, TaskRunner};
use crate::storage::db::{DownloadLog, DownloadStatus, NewDownload};
use crate::telegram::status::{deliver, Delivery, Phase, StatusReporter};
use crate::telegram::Bot;

/// Runs queued tasks against Telegram and yt-dlp
pub struct BotTaskRunner {
    bot: Bot,
    fetcher: MediaFetcher,
    log: DownloadLog,
}

impl BotTaskRunner {
    pub fn new(bot: Bot, fetcher: MediaFetcher, log: DownloadLog) -> Self {
        Self { bot, fetcher, log }
    }

    async fn record(&self, task: &Task, media: Option<&FetchedMedia>, status: DownloadStatus) {
        let platform = task.request.platform.tag();
        metrics::record_download(platform, status == DownloadStatus::Completed);

        let entry = NewDownload {
            platform: platform.to_string(),
            url: task.request.input.clone(),
            file_size_mb: media.map(|m| format_mb(m.size_mb())),
            status,
        };
        if let Err(e) = self.log.append(entry).await {
            log::error!("Failed to record task {} in the download log: {}", task.id, e);
        }
    }

    async fn remove_file(media: &FetchedMedia) {
        if let Err(e) = tokio::fs::remove_file(&media.path).await {
            log::warn!("Failed to remove {}: {}", media.path.display(), e);
        }
    }
}

#[async_trait]
impl TaskRunner for BotTaskRunner {
    async fn run(&self, task: Task) -> TaskOutcome {
        let platform = task.request.platform;
        let mut status = StatusReporter::start(self.bot.clone(), task.chat_id, task.reply_to, platform).await;

        status.update(Phase::Downloading).await;
        let media = match self.fetcher.fetch(&task.request).await {
            Ok(media) => media,
            Err(e) => {
                log::error!("Task {} ({}) failed: {}", task.id, platform, e);
                metrics::record_fetch_failure(e.subcategory());
                status.fail(&e.user_message()).await;
                self.record(&task, None, DownloadStatus::Failed).await;
                return TaskOutcome::Failed;
            }
        };

        status.update(Phase::Sending { size_mb: media.size_mb() }).await;
        status.clear().await;

        let is_audio = media.is_audio(platform);
        let delivery = deliver(
            &self.bot,
            task.chat_id,
            task.reply_to,
            &media,
            is_audio,
            task.request.link(),
        )
        .await;
        Self::remove_file(&media).await;

        match delivery {
            Delivery::Sent | Delivery::DestinationClosed => {
                self.record(&task, Some(&media), DownloadStatus::Completed).await;
                TaskOutcome::Completed
            }
            Delivery::Failed(e) => {
                metrics::record_fetch_failure("send_failed");
                // The status message is gone already; leave the error as a fresh message.
                if let Err(send_err) = self
                    .bot
                    .send_message(task.chat_id, Phase::Error("failed to send the file".into()).text())
                    .await
                {
                    log::warn!("Failed to report delivery error for task {}: {}", task.id, send_err);
                }
                log::error!("Task {} delivery failed: {}", task.id, e);
                self.record(&task, None, DownloadStatus::Failed).await;
                TaskOutcome::Failed
            }
        }
    }
}
