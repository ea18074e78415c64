mod types;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
pub use types::*;

use crate::error::{SupportError, SupportResult};
use crate::messenger::{Keyboard, Messenger};

/// 普通请求的超时，长轮询在此基础上加上轮询时长
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Telegram Bot API 客户端
pub struct TelegramClient {
    client: Client,
    base_url: String,
    poll_timeout: Duration,
}

impl TelegramClient {
    pub fn new(api_url: &str, token: &str, poll_timeout: Duration) -> SupportResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT + poll_timeout)
            .build()
            .map_err(SupportError::Http)?;

        Ok(Self {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            poll_timeout,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    async fn call<Req, T>(&self, method: &str, request: &Req) -> SupportResult<T>
    where
        Req: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // 去掉错误信息里的 URL，避免 Token 出现在日志中
        let response = self
            .client
            .post(self.method_url(method))
            .json(request)
            .send()
            .await
            .map_err(|e| SupportError::Http(e.without_url()))?;
        let response_text = response.text().await.map_err(|e| SupportError::Http(e.without_url()))?;

        let parsed: ApiResponse<T> = serde_json::from_str(&response_text).map_err(|e| {
            SupportError::Transport(format!("failed to parse {} response: {}, body: {}", method, e, response_text))
        })?;

        if !parsed.ok {
            return Err(SupportError::Transport(format!(
                "{} failed ({}): {}",
                method,
                parsed.error_code.unwrap_or_default(),
                parsed.description.unwrap_or_default()
            )));
        }
        parsed
            .result
            .ok_or_else(|| SupportError::Transport(format!("{} returned no result", method)))
    }

    /// 长轮询获取 offset 之后的更新
    pub async fn get_updates(&self, offset: i64) -> SupportResult<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout.as_secs(),
            allowed_updates: vec!["message", "callback_query"],
        };
        let updates: Vec<Update> = self.call("getUpdates", &request).await?;
        if !updates.is_empty() {
            debug!("收到 {} 条更新", updates.len());
        }
        Ok(updates)
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<&Keyboard>) -> SupportResult<()> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_markup: keyboard.map(InlineKeyboardMarkup::from),
        };
        let _: Message = self.call("sendMessage", &request).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>) -> SupportResult<()> {
        let request = AnswerCallbackQueryRequest {
            callback_query_id: callback_id,
            text,
        };
        let _: bool = self.call("answerCallbackQuery", &request).await?;
        Ok(())
    }

    async fn clear_keyboard(&self, chat_id: i64, message_id: i64) -> SupportResult<()> {
        let request = EditMessageReplyMarkupRequest {
            chat_id,
            message_id,
            reply_markup: InlineKeyboardMarkup::default(),
        };
        // 成功时返回被编辑的消息，内联消息则返回 true
        let _: serde_json::Value = self.call("editMessageReplyMarkup", &request).await?;
        Ok(())
    }
}
