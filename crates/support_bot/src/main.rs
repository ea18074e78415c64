mod bot;
mod config;
mod conversation;
mod database;
mod error;
mod escalation;
mod messenger;
mod registry;
mod report;
mod telegram;
mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use crate::bot::SupportBot;
use crate::config::Config;
use crate::conversation::{ConversationStore, LifecycleManager, StaticResponder};
use crate::database::setup_database;
use crate::escalation::EscalationNotifier;
use crate::registry::UserRegistry;
use crate::report::ReportAggregator;
use crate::telegram::TelegramClient;
use crate::utils::init_logger;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logger(&config.log_level);
    config.validate()?;

    info!("欢迎使用 support-bot v{}", env!("CARGO_PKG_VERSION"));
    info!("数据库: {}", config.database.display());

    let connection = setup_database(&config.database).await?;
    let registry = UserRegistry::new(connection.clone());
    registry
        .bootstrap_admins(&config.admins)
        .await
        .context("初始化管理员失败")?;

    let client = Arc::new(
        TelegramClient::new(&config.api_url, &config.token, config.poll_timeout()).context("创建 Telegram 客户端失败")?,
    );
    let lifecycle = LifecycleManager::new(
        registry,
        ConversationStore::new(connection.clone()),
        EscalationNotifier::new(client.clone()),
        Arc::new(StaticResponder),
    );
    let bot = SupportBot::new(
        lifecycle,
        ReportAggregator::new(connection.clone()),
        client.clone(),
        config.report_days,
    );

    tokio::select! {
        _ = bot.run(&client) => {}
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                error!("监听退出信号失败: {}", e);
            }
            info!("收到退出信号，正在停止");
        }
    }

    connection.close().await?;
    info!("已退出");
    Ok(())
}
