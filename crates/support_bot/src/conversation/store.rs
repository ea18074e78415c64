use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set, SqlErr,
    TransactionTrait,
};
use support_bot_entity::{conversation, user, Transcript, Turn};
use tracing::{debug, info, warn};

use super::{ActiveConversation, ClosedConversation, Conversation};
use crate::database::begin_write_transaction;
use crate::error::{SupportError, SupportResult};

/// 并发开启对话时，插入冲突后重新尝试的次数上限
const OPEN_ATTEMPTS: usize = 3;

/// 对话存储，负责 conversation 表的读写
#[derive(Clone)]
pub struct ConversationStore {
    db: DatabaseConnection,
}

impl ConversationStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn get_active(&self, user_id: i32) -> SupportResult<Option<ActiveConversation>> {
        let model = conversation::Entity::find()
            .filter(conversation::Column::UserId.eq(user_id))
            .filter(conversation::Column::EndTime.is_null())
            .one(&self.db)
            .await?;
        Ok(model.and_then(|m| match Conversation::from(m) {
            Conversation::Active(active) => Some(active),
            Conversation::Closed(_) => None,
        }))
    }

    /// 原子地“无进行中对话则创建”
    ///
    /// 依赖部分唯一索引 idx_conversation_one_active：插入冲突说明另一个事件刚刚创建了对话，
    /// 此时返回已存在的那一条，保证同一用户不会出现两条进行中的对话。
    pub async fn open(&self, user_id: i32) -> SupportResult<ActiveConversation> {
        for _ in 0..OPEN_ATTEMPTS {
            let new_conversation = conversation::ActiveModel {
                user_id: Set(user_id),
                start_time: Set(Utc::now()),
                end_time: Set(None),
                is_successful: Set(None),
                messages: Set(Transcript::default()),
                category: Set(None),
                ..Default::default()
            };

            match new_conversation.insert(&self.db).await {
                Ok(model) => {
                    info!("用户 {} 开启了新对话 #{}", user_id, model.id);
                    return expect_active(model);
                }
                Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                    debug!("用户 {} 已有进行中的对话，复用现有对话", user_id);
                    if let Some(active) = self.get_active(user_id).await? {
                        return Ok(active);
                    }
                    // 现有对话恰好在这期间被关闭，重新插入
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!("用户 {} 开启对话多次冲突", user_id);
        Err(DbErr::Custom(format!("failed to open conversation for user {}", user_id)).into())
    }

    /// 追加一条消息；对话若已被关闭则返回 ConversationClosed，不会修改已结束的记录
    pub async fn append_message(&self, active: ActiveConversation, text: &str, is_bot: bool) -> SupportResult<ActiveConversation> {
        let txn = begin_write_transaction(&self.db).await?;

        let Some(model) = conversation::Entity::find_by_id(active.id).one(&txn).await? else {
            txn.rollback().await?;
            return Err(SupportError::ConversationNotFound(active.id));
        };
        if model.end_time.is_some() {
            txn.rollback().await?;
            return Err(SupportError::ConversationClosed(active.id));
        }

        let mut transcript = model.messages.clone();
        transcript.push(Turn::new(text, is_bot));

        let mut updated: conversation::ActiveModel = model.into();
        updated.messages = Set(transcript);
        let model = updated.update(&txn).await?;
        txn.commit().await?;

        expect_active(model)
    }

    /// 关闭对话，幂等：已经关闭的对话保持原有的结束时间与结果
    pub async fn close(&self, active: ActiveConversation, success: bool) -> SupportResult<ClosedConversation> {
        // 保证 end_time 不早于 start_time
        let end_time = Utc::now().max(active.start_time);

        let result = conversation::Entity::update_many()
            .col_expr(conversation::Column::EndTime, Expr::value(end_time))
            .col_expr(conversation::Column::IsSuccessful, Expr::value(success))
            .filter(conversation::Column::Id.eq(active.id))
            .filter(conversation::Column::EndTime.is_null())
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            debug!("对话 #{} 已经结束，忽略重复关闭", active.id);
        } else {
            info!("对话 #{} 已结束，结果: {}", active.id, if success { "满意" } else { "不满意" });
        }

        match self.find(active.id).await? {
            Some(Conversation::Closed(closed)) => Ok(closed),
            Some(Conversation::Active(_)) => Err(DbErr::Custom(format!("conversation {} was not closed", active.id)).into()),
            None => Err(SupportError::ConversationNotFound(active.id)),
        }
    }

    pub async fn find(&self, id: i32) -> SupportResult<Option<Conversation>> {
        Ok(conversation::Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .map(Conversation::from))
    }

    /// 所有仍在进行中的对话及其所属用户，按创建顺序
    pub async fn open_conversations(&self) -> SupportResult<Vec<(ActiveConversation, user::Model)>> {
        let rows = conversation::Entity::find()
            .filter(conversation::Column::EndTime.is_null())
            .find_also_related(user::Entity)
            .order_by_asc(conversation::Column::Id)
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|(model, owner)| match (Conversation::from(model), owner) {
                (Conversation::Active(active), Some(owner)) => Some((active, owner)),
                _ => None,
            })
            .collect())
    }

    /// 设置对话分类，已结束的对话同样可以补充分类
    pub async fn set_category(&self, id: i32, category: Option<String>) -> SupportResult<Option<Conversation>> {
        let txn = self.db.begin().await?;
        let Some(model) = conversation::Entity::find_by_id(id).one(&txn).await? else {
            txn.rollback().await?;
            return Ok(None);
        };

        let mut updated: conversation::ActiveModel = model.into();
        updated.category = Set(category);
        let model = updated.update(&txn).await?;
        txn.commit().await?;

        Ok(Some(Conversation::from(model)))
    }
}

fn expect_active(model: conversation::Model) -> SupportResult<ActiveConversation> {
    match Conversation::from(model) {
        Conversation::Active(active) => Ok(active),
        Conversation::Closed(closed) => Err(SupportError::ConversationClosed(closed.id)),
    }
}
