use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use support_bot_entity::user;
use tracing::{debug, info};

use crate::error::SupportResult;

/// 管理员权限变更结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminChange {
    /// 发起人不是管理员，未做任何修改
    Forbidden,
    /// 管理员不能撤销自己的权限
    SelfRevocation,
    /// 目标用户从未与机器人交互过
    TargetNotFound,
    Updated(user::Model),
    Unchanged(user::Model),
}

/// 用户注册表，按消息平台的用户 ID 查找或创建用户
#[derive(Clone)]
pub struct UserRegistry {
    db: DatabaseConnection,
}

impl UserRegistry {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// 幂等地查找或创建用户，重复调用不会产生重复记录
    pub async fn get_or_create(&self, external_id: i64) -> SupportResult<user::Model> {
        let inserted = user::Entity::insert(user::ActiveModel {
            external_id: Set(external_id),
            is_admin: Set(false),
            ..Default::default()
        })
        .on_conflict(OnConflict::column(user::Column::ExternalId).do_nothing().to_owned())
        .exec_without_returning(&self.db)
        .await?;

        if inserted > 0 {
            info!("新用户已注册: {}", external_id);
        }

        let user = user::Entity::find()
            .filter(user::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await?;
        // 刚刚执行过 upsert，记录必然存在；仍按数据库错误处理以防被外部删除
        user.ok_or_else(|| sea_orm::DbErr::RecordNotFound(format!("user with external id {}", external_id)).into())
    }

    pub async fn find(&self, external_id: i64) -> SupportResult<Option<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::ExternalId.eq(external_id))
            .one(&self.db)
            .await?)
    }

    pub async fn admins(&self) -> SupportResult<Vec<user::Model>> {
        Ok(user::Entity::find()
            .filter(user::Column::IsAdmin.eq(true))
            .order_by_asc(user::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn is_admin(&self, external_id: i64) -> SupportResult<bool> {
        Ok(self.find(external_id).await?.is_some_and(|u| u.is_admin))
    }

    /// 授予或撤销管理员权限，仅管理员可以调用
    pub async fn set_admin(&self, actor_external_id: i64, target_external_id: i64, is_admin: bool) -> SupportResult<AdminChange> {
        if !self.is_admin(actor_external_id).await? {
            return Ok(AdminChange::Forbidden);
        }
        if !is_admin && actor_external_id == target_external_id {
            return Ok(AdminChange::SelfRevocation);
        }

        let Some(target) = self.find(target_external_id).await? else {
            return Ok(AdminChange::TargetNotFound);
        };
        if target.is_admin == is_admin {
            return Ok(AdminChange::Unchanged(target));
        }

        let mut active: user::ActiveModel = target.into();
        active.is_admin = Set(is_admin);
        let updated = active.update(&self.db).await?;
        info!(
            "用户 {} 的管理员权限已{}（操作人: {}）",
            target_external_id,
            if is_admin { "授予" } else { "撤销" },
            actor_external_id
        );
        Ok(AdminChange::Updated(updated))
    }

    /// 启动时为配置中的用户授予管理员权限
    pub async fn bootstrap_admins(&self, external_ids: &[i64]) -> SupportResult<()> {
        for &external_id in external_ids {
            let user = self.get_or_create(external_id).await?;
            if user.is_admin {
                debug!("用户 {} 已是管理员", external_id);
                continue;
            }
            let mut active: user::ActiveModel = user.into();
            active.is_admin = Set(true);
            active.update(&self.db).await?;
            info!("已根据启动配置授予用户 {} 管理员权限", external_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use sea_orm::PaginatorTrait;

    use super::*;
    use crate::database::setup_test_database;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let registry = UserRegistry::new(setup_test_database().await);

        let first = registry.get_or_create(42).await.unwrap();
        let second = registry.get_or_create(42).await.unwrap();
        assert_eq!(first.id, second.id);
        assert!(!first.is_admin);

        let count = user::Entity::find().count(&registry.db).await.unwrap();
        assert_eq!(count, 1);

        let other = registry.get_or_create(43).await.unwrap();
        assert_ne!(other.id, first.id);
    }

    #[tokio::test]
    async fn test_bootstrap_and_admin_list() {
        let registry = UserRegistry::new(setup_test_database().await);
        registry.get_or_create(1).await.unwrap();
        registry.bootstrap_admins(&[2, 3]).await.unwrap();
        registry.bootstrap_admins(&[2]).await.unwrap();

        let admins: Vec<i64> = registry.admins().await.unwrap().into_iter().map(|u| u.external_id).collect();
        assert_eq!(admins, vec![2, 3]);
        assert!(!registry.is_admin(1).await.unwrap());
        assert!(!registry.is_admin(999).await.unwrap());
    }

    #[tokio::test]
    async fn test_set_admin_access_control() {
        let registry = UserRegistry::new(setup_test_database().await);
        registry.bootstrap_admins(&[1]).await.unwrap();
        registry.get_or_create(2).await.unwrap();

        // 非管理员无权操作
        assert_eq!(registry.set_admin(2, 2, true).await.unwrap(), AdminChange::Forbidden);
        assert!(!registry.is_admin(2).await.unwrap());

        assert_matches!(registry.set_admin(1, 2, true).await.unwrap(), AdminChange::Updated(u) if u.is_admin);
        assert_matches!(registry.set_admin(1, 2, true).await.unwrap(), AdminChange::Unchanged(_));
        assert_eq!(registry.set_admin(1, 777, true).await.unwrap(), AdminChange::TargetNotFound);
        assert_eq!(registry.set_admin(1, 1, false).await.unwrap(), AdminChange::SelfRevocation);

        assert_matches!(registry.set_admin(2, 1, false).await.unwrap(), AdminChange::Updated(u) if !u.is_admin);
        assert!(!registry.is_admin(1).await.unwrap());
    }
}
