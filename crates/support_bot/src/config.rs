use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::Parser;
use once_cell::sync::Lazy;

/// 配置目录，数据库默认放在这里
pub static CONFIG_DIR: Lazy<PathBuf> = Lazy::new(|| {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("support-bot")
});

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";
pub const DEFAULT_REPORT_DAYS: u32 = 7;

fn default_database_path() -> PathBuf {
    CONFIG_DIR.join("data.sqlite")
}

/// 启动参数，均可通过环境变量提供
#[derive(Debug, Clone, Parser)]
#[command(name = "support-bot", version, about)]
pub struct Config {
    /// Telegram Bot Token
    #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Bot API 地址，自建 API 服务时修改
    #[arg(long, env = "TELEGRAM_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// SQLite 数据库文件路径
    #[arg(long, env = "SUPPORT_BOT_DATABASE", default_value_os_t = default_database_path())]
    pub database: PathBuf,

    /// 启动时授予管理员权限的用户 ID，多个用逗号分隔
    #[arg(long = "admin", env = "SUPPORT_BOT_ADMINS", value_delimiter = ',')]
    pub admins: Vec<i64>,

    /// 统计报表默认覆盖的天数
    #[arg(long, env = "SUPPORT_BOT_REPORT_DAYS", default_value_t = DEFAULT_REPORT_DAYS)]
    pub report_days: u32,

    /// getUpdates 长轮询超时（秒）
    #[arg(long, env = "SUPPORT_BOT_POLL_TIMEOUT", default_value_t = 30)]
    pub poll_timeout: u64,

    #[arg(long, env = "SUPPORT_BOT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        if self.token.trim().is_empty() {
            bail!("Telegram Bot Token 不能为空");
        }
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!("无效的 API 地址: {}", self.api_url);
        }
        if self.report_days == 0 {
            bail!("统计天数必须大于 0");
        }
        if self.poll_timeout == 0 {
            bail!("长轮询超时必须大于 0");
        }
        Ok(())
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout)
    }
}
