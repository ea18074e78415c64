use std::sync::Arc;

use async_trait::async_trait;
use support_bot_entity::{user, Transcript};
use tracing::{debug, info};

use super::{ClosedConversation, ConversationStore};
use crate::error::SupportResult;
use crate::escalation::{DeliveryReport, EscalationNotifier};
use crate::registry::UserRegistry;

/// 占位回答，接入真正的答案生成服务前使用
pub const PLACEHOLDER_ANSWER: &str = "Hello World! Это тестовый ответ.";

/// 答案生成服务
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, transcript: &Transcript, question: &str) -> SupportResult<String>;
}

/// 固定返回占位回答
pub struct StaticResponder;

#[async_trait]
impl Responder for StaticResponder {
    async fn respond(&self, _transcript: &Transcript, _question: &str) -> SupportResult<String> {
        Ok(PLACEHOLDER_ANSWER.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextOutcome {
    pub conversation_id: i32,
    pub answer: String,
    /// 本条消息是否开启了新对话
    pub opened: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedbackOutcome {
    Closed(ClosedConversation),
    NoActiveConversation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscalationOutcome {
    Escalated { conversation_id: i32, report: DeliveryReport },
    NoActiveConversation,
}

/// 对话生命周期管理：无对话 -> 进行中 -> 已结束
pub struct LifecycleManager {
    registry: UserRegistry,
    store: ConversationStore,
    notifier: EscalationNotifier,
    responder: Arc<dyn Responder>,
}

impl LifecycleManager {
    pub fn new(
        registry: UserRegistry,
        store: ConversationStore,
        notifier: EscalationNotifier,
        responder: Arc<dyn Responder>,
    ) -> Self {
        Self {
            registry,
            store,
            notifier,
            responder,
        }
    }

    pub fn registry(&self) -> &UserRegistry {
        &self.registry
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    /// 用户发来普通文本：记录提问与回答，必要时开启新对话
    ///
    /// 先取得回答再写入，回答失败时对话中不会留下没有回复的提问
    pub async fn handle_text(&self, external_id: i64, text: &str) -> SupportResult<TextOutcome> {
        let user = self.registry.get_or_create(external_id).await?;

        let (active, opened) = match self.store.get_active(user.id).await? {
            Some(active) => (active, false),
            None => (self.store.open(user.id).await?, true),
        };

        let answer = self.responder.respond(&active.transcript, text).await?;
        let active = self.store.append_message(active, text, false).await?;
        let active = self.store.append_message(active, &answer, true).await?;

        debug!("对话 #{} 当前共 {} 条消息", active.id, active.transcript.len());
        Ok(TextOutcome {
            conversation_id: active.id,
            answer,
            opened,
        })
    }

    pub async fn like(&self, external_id: i64) -> SupportResult<FeedbackOutcome> {
        self.feedback(external_id, true).await
    }

    /// 点踩同样会结束对话，调用方随后向用户提供转人工入口
    pub async fn dislike(&self, external_id: i64) -> SupportResult<FeedbackOutcome> {
        self.feedback(external_id, false).await
    }

    async fn feedback(&self, external_id: i64, success: bool) -> SupportResult<FeedbackOutcome> {
        let user = self.registry.get_or_create(external_id).await?;
        let Some(active) = self.store.get_active(user.id).await? else {
            debug!("用户 {} 没有进行中的对话，忽略反馈", external_id);
            return Ok(FeedbackOutcome::NoActiveConversation);
        };

        let closed = self.store.close(active, success).await?;
        Ok(FeedbackOutcome::Closed(closed))
    }

    /// 转人工：把当前对话推送给所有管理员，对话保持进行中
    pub async fn request_human(&self, external_id: i64) -> SupportResult<EscalationOutcome> {
        let user = self.registry.get_or_create(external_id).await?;
        let Some(active) = self.store.get_active(user.id).await? else {
            debug!("用户 {} 没有进行中的对话，忽略转人工请求", external_id);
            return Ok(EscalationOutcome::NoActiveConversation);
        };

        let admins = self.registry.admins().await?;
        info!("用户 {} 请求人工客服，对话 #{}", external_id, active.id);
        let report = self.notifier.notify(&admins, &user, &active.transcript).await;

        Ok(EscalationOutcome::Escalated {
            conversation_id: active.id,
            report,
        })
    }

    /// 仅注册用户，用于 /start
    pub async fn register(&self, external_id: i64) -> SupportResult<user::Model> {
        self.registry.get_or_create(external_id).await
    }
}
