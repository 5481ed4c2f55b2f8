//! Verification Notification Outbox
//!
//! 预订创建后需要向客人投递验证链接。投递走进程内 outbox：
//! 请求路径只负责入队 (非阻塞)，专门的 worker 负责真正发送并
//! 做有限次重试。投递失败不影响预订本身——客人可以重新请求。
//!
//! `Mailer` 是发送后端的 seam：生产环境配置 webhook 转发给外部
//! 邮件网关，未配置时退化为日志输出 (开发/测试)。

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// 待投递的验证邮件
#[derive(Debug, Clone, Serialize)]
pub struct VerificationEmail {
    /// 收件地址
    pub to: String,
    /// 客人 ID
    pub guest: String,
    /// 预订 record key
    pub booking_id: String,
    /// 验证令牌 (拼进验证链接)
    pub token: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Mailer transport error: {0}")]
    Transport(String),
}

/// 发送后端
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &VerificationEmail) -> Result<(), NotifyError>;
}

// =============================================================================
// Mailer implementations
// =============================================================================

/// 把验证邮件 POST 给外部邮件网关的 webhook
pub struct WebhookMailer {
    client: reqwest::Client,
    url: String,
}

impl WebhookMailer {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl Mailer for WebhookMailer {
    async fn send(&self, email: &VerificationEmail) -> Result<(), NotifyError> {
        let resp = self
            .client
            .post(&self.url)
            .json(email)
            .timeout(Duration::from_secs(10))
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(NotifyError::Transport(format!(
                "webhook returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// 仅记录日志的 mailer (开发环境默认)
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &VerificationEmail) -> Result<(), NotifyError> {
        info!(
            target: "notify",
            to = %email.to,
            booking = %email.booking_id,
            token = %email.token,
            "Verification email (log mailer)"
        );
        Ok(())
    }
}

// =============================================================================
// Dispatcher
// =============================================================================

/// 请求路径持有的入队句柄
#[derive(Clone)]
pub struct DispatchHandle {
    tx: mpsc::Sender<VerificationEmail>,
}

impl DispatchHandle {
    /// 非阻塞入队；队列满时丢弃并告警 (投递是尽力而为的)
    pub fn enqueue(&self, email: VerificationEmail) {
        if let Err(e) = self.tx.try_send(email) {
            warn!(target: "notify", error = %e, "Notification queue full, dropping email");
        }
    }
}

/// 通知分发 worker
pub struct Dispatcher {
    mailer: Arc<dyn Mailer>,
    rx: mpsc::Receiver<VerificationEmail>,
    max_attempts: u32,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// 创建分发器与配套的入队句柄。调用方负责把 [`Dispatcher::run`]
    /// 注册进后台任务。
    pub fn new(
        mailer: Arc<dyn Mailer>,
        capacity: usize,
        max_attempts: u32,
        cancel: CancellationToken,
    ) -> (Self, DispatchHandle) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                mailer,
                rx,
                max_attempts,
                cancel,
            },
            DispatchHandle { tx },
        )
    }

    /// Worker 主循环；取消后排空剩余队列再退出
    pub async fn run(mut self) {
        info!(target: "notify", "Notification dispatcher started");
        loop {
            tokio::select! {
                maybe = self.rx.recv() => {
                    match maybe {
                        Some(email) => self.deliver(email).await,
                        None => break,
                    }
                }
                _ = self.cancel.cancelled() => {
                    // 排空已入队的邮件
                    while let Ok(email) = self.rx.try_recv() {
                        self.deliver(email).await;
                    }
                    break;
                }
            }
        }
        info!(target: "notify", "Notification dispatcher stopped");
    }

    async fn deliver(&self, email: VerificationEmail) {
        for attempt in 1..=self.max_attempts {
            match self.mailer.send(&email).await {
                Ok(()) => {
                    info!(
                        target: "notify",
                        to = %email.to,
                        booking = %email.booking_id,
                        attempt,
                        "Verification email delivered"
                    );
                    return;
                }
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        target: "notify",
                        to = %email.to,
                        attempt,
                        error = %e,
                        "Email delivery failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(250 * attempt as u64)).await;
                }
                Err(e) => {
                    error!(
                        target: "notify",
                        to = %email.to,
                        booking = %email.booking_id,
                        error = %e,
                        "Email delivery failed permanently"
                    );
                }
            }
        }
    }
}
