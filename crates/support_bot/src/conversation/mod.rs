//! 对话生命周期
//!
//! 对话在内存中用 [`Conversation`] 表示，进行中与已结束是两个不同的类型：
//! 只有 [`ActiveConversation`] 可以追加消息或被关闭，已结束的对话无法再被修改。

mod lifecycle;
mod store;

use chrono::{DateTime, Utc};
use support_bot_entity::{conversation, Transcript};

pub use lifecycle::{
    EscalationOutcome, FeedbackOutcome, LifecycleManager, Responder, StaticResponder, TextOutcome, PLACEHOLDER_ANSWER,
};
pub use store::ConversationStore;

/// 对话结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// 用户点赞
    Resolved,
    /// 用户点踩
    Unresolved,
}

impl Outcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            Self::Resolved
        } else {
            Self::Unresolved
        }
    }

    pub fn is_successful(self) -> bool {
        matches!(self, Self::Resolved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveConversation {
    pub id: i32,
    pub user_id: i32,
    pub start_time: DateTime<Utc>,
    pub transcript: Transcript,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedConversation {
    pub id: i32,
    pub user_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub outcome: Outcome,
    pub transcript: Transcript,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversation {
    Active(ActiveConversation),
    Closed(ClosedConversation),
}

impl Conversation {
    pub fn id(&self) -> i32 {
        match self {
            Self::Active(c) => c.id,
            Self::Closed(c) => c.id,
        }
    }

    pub fn transcript(&self) -> &Transcript {
        match self {
            Self::Active(c) => &c.transcript,
            Self::Closed(c) => &c.transcript,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

impl From<conversation::Model> for Conversation {
    fn from(model: conversation::Model) -> Self {
        match model.end_time {
            None => Self::Active(ActiveConversation {
                id: model.id,
                user_id: model.user_id,
                start_time: model.start_time,
                transcript: model.messages,
                category: model.category,
            }),
            Some(end_time) => Self::Closed(ClosedConversation {
                id: model.id,
                user_id: model.user_id,
                start_time: model.start_time,
                end_time,
                // 旧数据可能只有 end_time 没有结果，按未解决处理
                outcome: Outcome::from_success(model.is_successful.unwrap_or(false)),
                transcript: model.messages,
                category: model.category,
            }),
        }
    }
}
