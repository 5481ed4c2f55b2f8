use crate::auth::JwtConfig;

/// 服务器配置 - 协调器的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/veranda | 工作目录 (数据库、日志) |
/// | HTTP_PORT | 3000 | HTTP 服务端口 |
/// | ENVIRONMENT | development | 运行环境 |
/// | VERIFICATION_TTL_MINUTES | 60 | 预订验证令牌有效期 |
/// | REAPER_INTERVAL_SECS | 300 | 过期预订清扫间隔 |
/// | MAX_ORDER_LINES | 10 | 单笔订单的行数上限 |
/// | TAX_RATE_PERCENT | 10 | 房费税率 (百分比) |
/// | NOTIFY_WEBHOOK_URL | (无) | 验证邮件投递 webhook |
/// | NOTIFY_QUEUE_CAPACITY | 256 | 外发队列容量 |
/// | NOTIFY_MAX_ATTEMPTS | 3 | 单封邮件最大投递次数 |
/// | BROADCAST_CAPACITY | 1024 | 广播通道容量 |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/veranda HTTP_PORT=8080 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储数据库、日志等文件
    pub work_dir: String,
    /// HTTP API 服务端口
    pub http_port: u16,
    /// JWT 认证配置 (访问令牌与验证令牌共用密钥)
    pub jwt: JwtConfig,
    /// 运行环境: development | staging | production
    pub environment: String,

    // === 协调器特性配置 ===
    /// 预订验证令牌有效期 (分钟)
    pub verification_ttl_minutes: i64,
    /// 过期 PendingVerification 预订的清扫间隔 (秒)
    pub reaper_interval_secs: u64,
    /// 单笔订单允许的最大行数
    pub max_order_lines: usize,
    /// 房费税率 (百分比, 如 10 = 10%)
    pub tax_rate_percent: u32,
    /// 验证邮件投递 webhook (未设置时仅记录日志)
    pub notify_webhook_url: Option<String>,
    /// 外发队列容量
    pub notify_queue_capacity: usize,
    /// 单封邮件最大投递次数
    pub notify_max_attempts: u32,
    /// 广播通道容量
    pub broadcast_capacity: usize,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/veranda".into()),
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            jwt: JwtConfig::default(),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),

            verification_ttl_minutes: std::env::var("VERIFICATION_TTL_MINUTES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(60),
            reaper_interval_secs: std::env::var("REAPER_INTERVAL_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(300),
            max_order_lines: std::env::var("MAX_ORDER_LINES")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10),
            tax_rate_percent: std::env::var("TAX_RATE_PERCENT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(10),
            notify_webhook_url: std::env::var("NOTIFY_WEBHOOK_URL").ok(),
            notify_queue_capacity: std::env::var("NOTIFY_QUEUE_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(256),
            notify_max_attempts: std::env::var("NOTIFY_MAX_ATTEMPTS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3),
            broadcast_capacity: std::env::var("BROADCAST_CAPACITY")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(1024),
        }
    }

    /// 使用自定义值覆盖部分配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(work_dir: impl Into<String>, http_port: u16) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config.http_port = http_port;
        config
    }

    /// 数据库目录
    pub fn database_dir(&self) -> std::path::PathBuf {
        std::path::Path::new(&self.work_dir).join("database")
    }

    /// 确保工作目录结构存在
    pub fn ensure_work_dir_structure(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.database_dir())?;
        std::fs::create_dir_all(std::path::Path::new(&self.work_dir).join("logs"))?;
        Ok(())
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
