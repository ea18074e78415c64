use chrono::{DateTime, Utc};
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

/// 对话中的一轮发言
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub text: String,
    pub is_bot: bool,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn new(text: impl Into<String>, is_bot: bool) -> Self {
        Self {
            text: text.into(),
            is_bot,
            timestamp: Utc::now(),
        }
    }

    pub fn speaker(&self) -> &'static str {
        if self.is_bot {
            "Bot"
        } else {
            "User"
        }
    }
}

/// 完整的对话记录，以 JSON 数组形式存放在 conversation.messages 列中
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct Transcript(pub Vec<Turn>);

impl Transcript {
    pub fn push(&mut self, turn: Turn) {
        self.0.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 按时间顺序渲染为 `Bot: ...` / `User: ...` 的多行文本
    pub fn render(&self) -> String {
        self.0
            .iter()
            .map(|turn| format!("{}: {}", turn.speaker(), turn.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_render() {
        let mut transcript = Transcript::default();
        assert_eq!(transcript.render(), "");

        transcript.push(Turn::new("Hello", false));
        transcript.push(Turn::new("Hi there", true));
        assert_eq!(transcript.render(), "User: Hello\nBot: Hi there");
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_transcript_json_layout() {
        let mut transcript = Transcript::default();
        transcript.push(Turn::new("Hello", false));

        // 存储格式: [{"text": "...", "is_bot": false, "timestamp": "..."}]
        let value = serde_json::to_value(&transcript).unwrap();
        let first = &value.as_array().unwrap()[0];
        assert_eq!(first["text"], "Hello");
        assert_eq!(first["is_bot"], false);
        assert!(first["timestamp"].is_string());
    }
}
