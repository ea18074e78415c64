//! 消息分发：把平台更新路由到对话生命周期与管理命令
//!
//! 同一用户的更新按到达顺序依次处理，不同用户之间并发处理。
//! 单条更新处理失败只记录日志，不影响其他更新与整个进程。

mod command;
mod texts;

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use command::{Command, Signal};
use crate::conversation::{EscalationOutcome, FeedbackOutcome, LifecycleManager};
use crate::error::SupportResult;
use crate::escalation::MAX_MESSAGE_CHARS;
use crate::messenger::{Keyboard, Messenger};
use crate::registry::AdminChange;
use crate::report::ReportAggregator;
use crate::telegram::{CallbackQuery, Message, TelegramClient, Update};
use crate::utils::split_message;

/// 拉取更新失败后的等待时间
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct SupportBot {
    lifecycle: LifecycleManager,
    reports: ReportAggregator,
    messenger: Arc<dyn Messenger>,
    report_days: u32,
}

impl SupportBot {
    pub fn new(
        lifecycle: LifecycleManager,
        reports: ReportAggregator,
        messenger: Arc<dyn Messenger>,
        report_days: u32,
    ) -> Self {
        Self {
            lifecycle,
            reports,
            messenger,
            report_days,
        }
    }

    /// 长轮询主循环，只会被外部取消
    pub async fn run(&self, client: &TelegramClient) {
        let mut offset = 0;
        info!("开始接收消息");
        loop {
            match client.get_updates(offset).await {
                Ok(updates) => {
                    if let Some(last) = updates.iter().map(|u| u.update_id).max() {
                        offset = last + 1;
                    }
                    self.dispatch(updates).await;
                }
                Err(e) => {
                    error!("获取更新失败: {}", e);
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                }
            }
        }
    }

    /// 按发送者分组处理一批更新
    pub async fn dispatch(&self, updates: Vec<Update>) {
        let mut by_sender: HashMap<Option<i64>, Vec<Update>> = HashMap::new();
        for update in updates {
            by_sender.entry(update.sender_id()).or_default().push(update);
        }

        join_all(by_sender.into_values().map(|updates| async move {
            for update in updates {
                if let Err(e) = self.handle_update(&update).await {
                    error!("处理更新 {} 失败: {}", update.update_id, e);
                }
            }
        }))
        .await;
    }

    pub async fn handle_update(&self, update: &Update) -> SupportResult<()> {
        if let Some(message) = &update.message {
            return self.handle_message(message).await;
        }
        if let Some(query) = &update.callback_query {
            return self.handle_callback(query).await;
        }
        debug!("忽略不支持的更新 {}", update.update_id);
        Ok(())
    }

    async fn handle_message(&self, message: &Message) -> SupportResult<()> {
        let Some(from) = message.from.as_ref().filter(|u| !u.is_bot) else {
            return Ok(());
        };
        let Some(text) = message.text.as_deref() else {
            debug!("忽略用户 {} 的非文本消息", from.id);
            return Ok(());
        };

        if let Some(command) = Command::parse(text) {
            return self.handle_command(from.id, message.chat.id, command).await;
        }
        if text.trim_start().starts_with('/') {
            debug!("用户 {} 发送了未知命令: {}", from.id, text);
            return self.reply(message.chat.id, texts::UNKNOWN_COMMAND, None).await;
        }

        let outcome = self.lifecycle.handle_text(from.id, text).await?;
        self.reply(message.chat.id, &outcome.answer, Some(&texts::feedback_keyboard()))
            .await
    }

    async fn handle_callback(&self, query: &CallbackQuery) -> SupportResult<()> {
        // 无论结果如何都先应答，结束客户端的加载状态
        if let Err(e) = self.messenger.answer_callback(&query.id, None).await {
            warn!("应答回调 {} 失败: {}", query.id, e);
        }

        let Some(signal) = query.data.as_deref().and_then(|data| Signal::from_str(data).ok()) else {
            debug!("忽略未知的回调数据: {:?}", query.data);
            return Ok(());
        };

        let user_id = query.from.id;
        let chat_id = match &query.message {
            Some(message) => {
                if let Err(e) = self.messenger.clear_keyboard(message.chat.id, message.message_id).await {
                    warn!("移除消息 {} 的按钮失败: {}", message.message_id, e);
                }
                message.chat.id
            }
            None => user_id,
        };

        let (text, keyboard) = match signal {
            Signal::Like => match self.lifecycle.like(user_id).await? {
                FeedbackOutcome::Closed(_) => (texts::LIKED, None),
                FeedbackOutcome::NoActiveConversation => (texts::NO_ACTIVE_CONVERSATION, None),
            },
            Signal::Dislike => match self.lifecycle.dislike(user_id).await? {
                FeedbackOutcome::Closed(_) => (texts::DISLIKED, Some(texts::consultant_keyboard())),
                FeedbackOutcome::NoActiveConversation => (texts::NO_ACTIVE_CONVERSATION, None),
            },
            Signal::RequestHuman => match self.lifecycle.request_human(user_id).await? {
                EscalationOutcome::Escalated { conversation_id, report } => {
                    if !report.is_complete() {
                        warn!("对话 #{} 的转人工请求有 {} 个管理员未送达", conversation_id, report.failed.len());
                    }
                    (texts::ESCALATED, None)
                }
                EscalationOutcome::NoActiveConversation => (texts::NO_ACTIVE_CONVERSATION, None),
            },
        };

        self.reply(chat_id, text, keyboard.as_ref()).await
    }

    async fn handle_command(&self, from: i64, chat_id: i64, command: Command) -> SupportResult<()> {
        if command.is_admin_only() && !self.lifecycle.registry().is_admin(from).await? {
            debug!("非管理员 {} 尝试执行 {:?}，已忽略", from, command);
            return Ok(());
        }

        match command {
            Command::Start => {
                self.lifecycle.register(from).await?;
                self.reply(chat_id, texts::GREETING, None).await
            }
            Command::Report => self.send_report(chat_id).await,
            Command::Stats(days) => {
                let days = days.filter(|d| *d > 0).unwrap_or(self.report_days);
                let summary = self.reports.summary(days).await?;
                self.reply(chat_id, &summary.render(), None).await
            }
            Command::AddAdmin(None) => self.reply(chat_id, texts::ADD_ADMIN_USAGE, None).await,
            Command::RemoveAdmin(None) => self.reply(chat_id, texts::REMOVE_ADMIN_USAGE, None).await,
            Command::AddAdmin(Some(target)) => self.change_admin(from, chat_id, target, true).await,
            Command::RemoveAdmin(Some(target)) => self.change_admin(from, chat_id, target, false).await,
            Command::Tag(None) => self.reply(chat_id, texts::TAG_USAGE, None).await,
            Command::Tag(Some(args)) => {
                let text = match self
                    .lifecycle
                    .store()
                    .set_category(args.conversation_id, args.category.clone())
                    .await?
                {
                    Some(_) => texts::tagged(args.conversation_id, args.category.as_deref()),
                    None => texts::ticket_not_found(args.conversation_id),
                };
                self.reply(chat_id, &text, None).await
            }
        }
    }

    async fn send_report(&self, chat_id: i64) -> SupportResult<()> {
        let open = self.lifecycle.store().open_conversations().await?;
        if open.is_empty() {
            return self.reply(chat_id, texts::NO_OPEN_TICKETS, None).await;
        }
        for (conversation, owner) in &open {
            self.reply(chat_id, &texts::open_ticket(conversation, owner), None).await?;
        }
        Ok(())
    }

    async fn change_admin(&self, from: i64, chat_id: i64, target: i64, grant: bool) -> SupportResult<()> {
        let text = match self.lifecycle.registry().set_admin(from, target, grant).await? {
            AdminChange::Forbidden => return Ok(()),
            AdminChange::SelfRevocation => texts::SELF_REVOCATION.to_string(),
            AdminChange::TargetNotFound => texts::USER_NOT_FOUND.to_string(),
            AdminChange::Unchanged(_) if grant => texts::already_admin(target),
            AdminChange::Unchanged(_) => texts::not_admin(target),
            AdminChange::Updated(_) => {
                let notice = if grant { texts::ADMIN_GRANTED } else { texts::ADMIN_REVOKED };
                if let Err(e) = self.messenger.send_text(target, notice, None).await {
                    warn!("通知用户 {} 权限变更失败: {}", target, e);
                }
                if grant {
                    texts::admin_added(target)
                } else {
                    texts::admin_removed(target)
                }
            }
        };
        self.reply(chat_id, &text, None).await
    }

    /// 发送回复，超长文本自动拆分，按钮只附在最后一段
    async fn reply(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> SupportResult<()> {
        let chunks = split_message(text, MAX_MESSAGE_CHARS);
        let last = chunks.len().saturating_sub(1);
        for (i, chunk) in chunks.iter().enumerate() {
            let keyboard = if i == last { keyboard } else { None };
            self.messenger.send_text(chat_id, chunk, keyboard).await?;
        }
        Ok(())
    }
}
