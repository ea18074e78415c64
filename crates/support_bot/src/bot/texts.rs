use support_bot_entity::user;

use super::command::Signal;
use crate::conversation::ActiveConversation;
use crate::messenger::{InlineButton, Keyboard};

pub const GREETING: &str = "👋 Привет! Я AI-ассистент. Задай мне вопрос, и я постараюсь помочь!";
pub const LIKED: &str = "✅ Рад, что смог помочь! Обращайтесь еще!";
pub const DISLIKED: &str = "❌ Извините, что ответ не подошел. Вы можете обратиться к консультанту:";
pub const ESCALATED: &str = "🆘 Ваш запрос передан консультанту. Ожидайте ответа.";
pub const NO_ACTIVE_CONVERSATION: &str = "ℹ️ Нет активного запроса. Задайте новый вопрос, и я постараюсь помочь!";
pub const UNKNOWN_COMMAND: &str = "❓ Неизвестная команда. Просто напишите свой вопрос.";
pub const NO_OPEN_TICKETS: &str = "⛔ Нет активных запросов в поддержку";

pub const ADMIN_GRANTED: &str = "🎉 Вам выданы права администратора!";
pub const ADMIN_REVOKED: &str = "😞 Ваши права администратора были отозваны";
pub const USER_NOT_FOUND: &str = "❌ Пользователь не найден";
pub const SELF_REVOCATION: &str = "❌ Нельзя снять права с самого себя";
pub const ADD_ADMIN_USAGE: &str = "❌ Укажите ID пользователя: /add_admin <user_id>";
pub const REMOVE_ADMIN_USAGE: &str = "❌ Укажите ID пользователя: /remove_admin <user_id>";
pub const TAG_USAGE: &str = "❌ Укажите номер запроса: /tag <id> <категория>";

pub fn admin_added(external_id: i64) -> String {
    format!("✅ Пользователь {} назначен администратором", external_id)
}

pub fn admin_removed(external_id: i64) -> String {
    format!("✅ Пользователь {} лишен прав администратора", external_id)
}

pub fn already_admin(external_id: i64) -> String {
    format!("ℹ️ Пользователь {} уже администратор", external_id)
}

pub fn not_admin(external_id: i64) -> String {
    format!("ℹ️ Пользователь {} не является администратором", external_id)
}

pub fn tagged(conversation_id: i32, category: Option<&str>) -> String {
    match category {
        Some(category) => format!("✅ Запрос #ID{}: категория «{}»", conversation_id, category),
        None => format!("✅ Запрос #ID{}: категория снята", conversation_id),
    }
}

pub fn ticket_not_found(conversation_id: i32) -> String {
    format!("❌ Запрос #ID{} не найден", conversation_id)
}

/// 管理员报表中的一条未结束对话
pub fn open_ticket(conversation: &ActiveConversation, owner: &user::Model) -> String {
    format!(
        "🆘 Запрос в поддержку #ID{}\nUser ID: {}\nИстория:\n{}",
        conversation.id,
        owner.external_id,
        conversation.transcript.render()
    )
}

/// 附在每条机器人回答下方
pub fn feedback_keyboard() -> Keyboard {
    Keyboard::default().row(vec![
        InlineButton::new("👍", Signal::Like.as_ref()),
        InlineButton::new("👎", Signal::Dislike.as_ref()),
    ])
}

pub fn consultant_keyboard() -> Keyboard {
    Keyboard::default().row(vec![InlineButton::new("👨💻 Консультант", Signal::RequestHuman.as_ref())])
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use support_bot_entity::{Transcript, Turn};

    use super::*;

    #[test]
    fn test_keyboards() {
        let feedback = feedback_keyboard();
        assert_eq!(feedback.rows.len(), 1);
        let data: Vec<&str> = feedback.rows[0].iter().map(|b| b.data.as_str()).collect();
        assert_eq!(data, vec!["like", "dislike"]);

        let consultant = consultant_keyboard();
        assert_eq!(consultant.rows[0][0].data, "request_human");
    }

    #[test]
    fn test_open_ticket() {
        let mut transcript = Transcript::default();
        transcript.push(Turn::new("Где мой заказ?", false));
        transcript.push(Turn::new("Hello World! Это тестовый ответ.", true));
        let conversation = ActiveConversation {
            id: 12,
            user_id: 3,
            start_time: Utc::now(),
            transcript,
            category: None,
        };
        let owner = user::Model {
            id: 3,
            external_id: 777,
            is_admin: false,
        };
        assert_eq!(
            open_ticket(&conversation, &owner),
            "🆘 Запрос в поддержку #ID12\nUser ID: 777\nИстория:\nUser: Где мой заказ?\nBot: Hello World! Это тестовый ответ."
        );
    }
}
