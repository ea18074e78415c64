use std::sync::Arc;

use support_bot_entity::{user, Transcript};
use tracing::{info, warn};

use crate::messenger::Messenger;
use crate::utils::split_message;

/// Telegram 单条消息的最大长度
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// 一次升级推送的投递结果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: Vec<i64>,
    pub failed: Vec<(i64, String)>,
}

impl DeliveryReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 将对话转交人工客服：把完整对话推送给所有管理员
pub struct EscalationNotifier {
    messenger: Arc<dyn Messenger>,
}

impl EscalationNotifier {
    pub fn new(messenger: Arc<dyn Messenger>) -> Self {
        Self { messenger }
    }

    pub fn format_request(requester_external_id: i64, transcript: &Transcript) -> String {
        format!(
            "🚨 НОВЫЙ ЗАПРОС ПОДДЕРЖКИ\nUser ID: {}\nИстория диалога:\n{}",
            requester_external_id,
            transcript.render()
        )
    }

    /// 逐个推送给管理员，单个管理员推送失败不影响其他人
    pub async fn notify(&self, admins: &[user::Model], requester: &user::Model, transcript: &Transcript) -> DeliveryReport {
        let text = Self::format_request(requester.external_id, transcript);
        let chunks = split_message(&text, MAX_MESSAGE_CHARS);
        let mut report = DeliveryReport::default();

        'admins: for admin in admins {
            for chunk in &chunks {
                if let Err(e) = self.messenger.send_text(admin.external_id, chunk, None).await {
                    warn!("向管理员 {} 推送升级请求失败: {}", admin.external_id, e);
                    report.failed.push((admin.external_id, e.to_string()));
                    continue 'admins;
                }
            }
            report.delivered.push(admin.external_id);
        }

        info!(
            "用户 {} 的升级请求已推送: 成功 {} 个，失败 {} 个",
            requester.external_id,
            report.delivered.len(),
            report.failed.len()
        );
        report
    }
}
