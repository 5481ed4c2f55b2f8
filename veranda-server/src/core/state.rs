//! 服务器状态
//!
//! 聚合协调器的全部共享组件：配置、数据库、广播器、认证、
//! 业务经理与后台任务注册表。`ServerState` 是 axum 的应用状态，
//! 所有 handler 通过它访问业务逻辑。

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::info;

use crate::auth::JwtService;
use crate::bookings::{BookingManager, Reaper, VerificationGate};
use crate::broadcast::Broadcaster;
use crate::db::DbService;
use crate::db::repository::{BookingRepository, MenuItemRepository, OrderRepository};
use crate::guard::InvariantGuard;
use crate::notify::{Dispatcher, LogMailer, Mailer, WebhookMailer};
use crate::orders::OrderManager;
use crate::stock::StockLedger;
use crate::utils::AppError;

use super::config::Config;
use super::tasks::{BackgroundTasks, TaskKind};

/// 共享服务器状态
#[derive(Clone)]
pub struct ServerState {
    pub config: Arc<Config>,
    pub db: DbService,
    pub broadcaster: Broadcaster,
    pub jwt_service: Arc<JwtService>,
    pub bookings: BookingManager,
    pub orders: OrderManager,

    /// 已创建但尚未启动的通知分发 worker
    pending_dispatcher: Arc<Mutex<Option<Dispatcher>>>,
    /// 后台任务注册表 (shutdown 时被取走)
    tasks: Arc<Mutex<Option<BackgroundTasks>>>,
}

impl ServerState {
    /// 初始化所有组件
    ///
    /// 只组装, 不启动：后台任务等 [`Self::start_background_tasks`]。
    pub async fn initialize(config: &Config) -> Result<Self, AppError> {
        config
            .ensure_work_dir_structure()
            .map_err(|e| AppError::internal(format!("Failed to create work dir: {e}")))?;

        let db = DbService::new(&config.database_dir().to_string_lossy()).await?;

        let broadcaster = Broadcaster::new(config.broadcast_capacity);
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let gate = VerificationGate::new(&config.jwt, config.verification_ttl_minutes);
        let guard = InvariantGuard::new(config.max_order_lines);

        let booking_repo = BookingRepository::new(db.db());
        let order_repo = OrderRepository::new(db.db());
        let menu_repo = MenuItemRepository::new(db.db());
        let ledger = StockLedger::new(db.db());

        let tasks = BackgroundTasks::new();
        let cancel = tasks.shutdown_token();

        let mailer: Arc<dyn Mailer> = match &config.notify_webhook_url {
            Some(url) => {
                info!(webhook = %url, "Using webhook mailer");
                Arc::new(WebhookMailer::new(url.clone()))
            }
            None => {
                info!("NOTIFY_WEBHOOK_URL not set, using log mailer");
                Arc::new(LogMailer)
            }
        };
        let (dispatcher, notifier) = Dispatcher::new(
            mailer,
            config.notify_queue_capacity,
            config.notify_max_attempts,
            cancel,
        );

        let bookings = BookingManager::new(
            booking_repo.clone(),
            gate,
            broadcaster.clone(),
            notifier,
            guard.clone(),
            config.tax_rate_percent,
        );
        let orders = OrderManager::new(
            order_repo,
            menu_repo,
            booking_repo,
            ledger,
            broadcaster.clone(),
            guard,
        );

        info!("Server state initialized");

        Ok(Self {
            config: Arc::new(config.clone()),
            db,
            broadcaster,
            jwt_service,
            bookings,
            orders,
            pending_dispatcher: Arc::new(Mutex::new(Some(dispatcher))),
            tasks: Arc::new(Mutex::new(Some(tasks))),
        })
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }

    /// 启动后台任务 (幂等; 重复调用是 no-op)
    pub fn start_background_tasks(&self) {
        let mut tasks_guard = self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let Some(tasks) = tasks_guard.as_mut() else {
            return;
        };
        if !tasks.is_empty() {
            return;
        }

        if let Some(dispatcher) = self
            .pending_dispatcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            tasks.spawn("notify_dispatcher", TaskKind::Worker, dispatcher.run());
        }

        let reaper = Reaper::new(
            BookingRepository::new(self.db.db()),
            self.broadcaster.clone(),
            self.config.verification_ttl_minutes,
            Duration::from_secs(self.config.reaper_interval_secs),
            tasks.shutdown_token(),
        );
        tasks.spawn("stale_booking_reaper", TaskKind::Periodic, reaper.run());

        tasks.log_summary();
    }

    /// 停止所有后台任务并等待退出
    pub async fn shutdown(&self) {
        let tasks = self
            .tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(tasks) = tasks {
            tasks.shutdown().await;
        }
    }
}
