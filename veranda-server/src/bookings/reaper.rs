//! Stale Booking Reaper
//!
//! 周期性取消超过验证时效仍停留在 PendingVerification 的预订，
//! 释放客人的"唯一在途预订"名额。批量取消在 repository 层是
//! 一条原子更新，和并发的验证请求互不踩踏 (验证输掉竞争后会
//! 重读到 Cancelled 并报冲突)。

use shared::message::{EntityKind, UpdateAction};
use shared::util::now_millis;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::broadcast::Broadcaster;
use crate::db::models::BookingView;
use crate::db::repository::BookingRepository;

pub struct Reaper {
    repo: BookingRepository,
    broadcaster: Broadcaster,
    /// 验证时效 (分钟), 与验证令牌的 TTL 一致
    ttl_minutes: i64,
    interval: Duration,
    cancel: CancellationToken,
}

impl Reaper {
    pub fn new(
        repo: BookingRepository,
        broadcaster: Broadcaster,
        ttl_minutes: i64,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            repo,
            broadcaster,
            ttl_minutes,
            interval,
            cancel,
        }
    }

    pub async fn run(self) {
        info!(
            target: "reaper",
            interval_secs = self.interval.as_secs(),
            ttl_minutes = self.ttl_minutes,
            "Stale booking reaper started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        // 第一个 tick 立即触发, 跳过它避免启动即清扫
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep().await,
                _ = self.cancel.cancelled() => break,
            }
        }

        info!(target: "reaper", "Stale booking reaper stopped");
    }

    /// 单次清扫; 测试中也可直接调用
    pub async fn sweep(&self) {
        let cutoff = now_millis() - self.ttl_minutes * 60_000;

        match self.repo.cancel_stale_pending_verification(cutoff).await {
            Ok(cancelled) if cancelled.is_empty() => {}
            Ok(cancelled) => {
                info!(
                    target: "reaper",
                    count = cancelled.len(),
                    "Cancelled stale unverified bookings"
                );
                for booking in cancelled {
                    let view = BookingView::from(booking);
                    let data = serde_json::to_value(&view).unwrap_or_default();
                    self.broadcaster.publish(
                        EntityKind::Booking,
                        UpdateAction::StatusChanged,
                        view.id.clone(),
                        view.guest.clone(),
                        data,
                    );
                }
            }
            Err(e) => {
                error!(target: "reaper", error = %e, "Stale booking sweep failed");
            }
        }
    }
}
