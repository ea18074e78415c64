use async_trait::async_trait;

use crate::error::SupportResult;

/// 内联按钮
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            data: data.into(),
        }
    }
}

/// 附在消息下方的内联键盘，按行排列
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl Keyboard {
    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }
}

/// 消息平台的出站接口
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> SupportResult<()>;

    /// 应答按钮回调，text 会以提示的形式显示给用户
    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> SupportResult<()>;

    /// 移除指定消息上的内联键盘
    async fn clear_keyboard(&self, chat_id: i64, message_id: i64) -> SupportResult<()>;
}

#[cfg(test)]
pub mod testing {
    use std::collections::HashSet;

    use tokio::sync::Mutex;

    use super::*;
    use crate::error::SupportError;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SentMessage {
        pub chat_id: i64,
        pub text: String,
        pub keyboard: Option<Keyboard>,
    }

    /// 记录所有出站调用的假消息平台，可指定发送失败的会话
    #[derive(Default)]
    pub struct RecordingMessenger {
        pub sent: Mutex<Vec<SentMessage>>,
        pub answered: Mutex<Vec<(String, Option<String>)>>,
        pub cleared: Mutex<Vec<(i64, i64)>>,
        unreachable: HashSet<i64>,
    }

    impl RecordingMessenger {
        pub fn with_unreachable(chat_ids: &[i64]) -> Self {
            Self {
                unreachable: chat_ids.iter().copied().collect(),
                ..Default::default()
            }
        }

        pub async fn sent_to(&self, chat_id: i64) -> Vec<SentMessage> {
            self.sent
                .lock()
                .await
                .iter()
                .filter(|m| m.chat_id == chat_id)
                .cloned()
                .collect()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> SupportResult<()> {
            if self.unreachable.contains(&chat_id) {
                return Err(SupportError::Transport(format!("chat {} is unreachable", chat_id)));
            }
            self.sent.lock().await.push(SentMessage {
                chat_id,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            });
            Ok(())
        }

        async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> SupportResult<()> {
            self.answered
                .lock()
                .await
                .push((callback_id.to_string(), text.map(str::to_string)));
            Ok(())
        }

        async fn clear_keyboard(&self, chat_id: i64, message_id: i64) -> SupportResult<()> {
            self.cleared.lock().await.push((chat_id, message_id));
            Ok(())
        }
    }
}
