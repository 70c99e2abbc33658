//! Polling adapter: long-polls `getUpdates`, deduplicates by offset cursor, enqueues.

use dbot_core::{Result, Update, UpdateKind};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

use crate::api::{BotApi, GetUpdatesParams};
use crate::config::PollingConfig;
use crate::queue::UpdateSender;

/// Owns the offset cursor. The cursor only moves forward: past every fetched update, or past the
/// last pending update on [`Poller::skip_pending`].
pub struct Poller {
    api: Arc<dyn BotApi>,
    config: PollingConfig,
    offset: i64,
}

impl Poller {
    pub fn new(api: Arc<dyn BotApi>, config: PollingConfig) -> Self {
        let offset = config.offset;
        Self {
            api,
            config,
            offset,
        }
    }

    /// Current cursor: the lowest update id still accepted.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    fn params(&self) -> GetUpdatesParams {
        GetUpdatesParams {
            offset: self.offset,
            limit: self.config.limit,
            timeout: self.config.timeout_secs,
            allowed_updates: UpdateKind::allowed_updates(),
        }
    }

    /// One poll request. Returns the updates at or above the cursor, in order, and advances
    /// the cursor past each of them; redelivered updates are dropped.
    #[instrument(skip(self), fields(offset = self.offset))]
    pub async fn fetch(&mut self) -> Result<Vec<Update>> {
        let batch = self.api.get_updates(&self.params()).await?;
        let received = batch.len();
        let mut fresh = Vec::with_capacity(received);
        for update in batch {
            if update.update_id >= self.offset {
                self.offset = update.update_id + 1;
                fresh.push(update);
            } else {
                debug!(update_id = update.update_id, cursor = self.offset, "Dropped redelivered update");
            }
        }
        if received > 0 {
            debug!(received, accepted = fresh.len(), cursor = self.offset, "step: poll batch");
        }
        Ok(fresh)
    }

    /// Moves the cursor past every update pending right now, without dispatching them.
    pub async fn skip_pending(&mut self) -> Result<()> {
        let params = GetUpdatesParams {
            offset: -1,
            limit: 1,
            timeout: 0,
            allowed_updates: UpdateKind::allowed_updates(),
        };
        let pending = self.api.get_updates(&params).await?;
        if let Some(last) = pending.last() {
            self.offset = self.offset.max(last.update_id + 1);
            info!(cursor = self.offset, "Skipped pending updates");
        }
        Ok(())
    }

    /// Polls until the queue is closed. Transport errors are logged and retried after
    /// `error_sleep`; there is no retry limit.
    pub async fn run(mut self, sender: UpdateSender) {
        info!(
            offset = self.offset,
            limit = self.config.limit,
            timeout_secs = self.config.timeout_secs,
            "Polling started"
        );
        while !sender.is_closed() {
            if !self.config.relax.is_zero() {
                tokio::time::sleep(self.config.relax).await;
            }

            let updates = match self.fetch().await {
                Ok(updates) => updates,
                Err(e) => {
                    error!(error = %e, cursor = self.offset, "Poll request failed");
                    tokio::time::sleep(self.config.error_sleep).await;
                    continue;
                }
            };

            for update in updates {
                if sender.send(update).await.is_err() {
                    break;
                }
            }
        }
        info!(cursor = self.offset, "Update queue closed, polling stopped");
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.config)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}
