use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Select};
use support_bot_entity::conversation;

use crate::error::SupportResult;

const UNCATEGORIZED: &str = "без категории";

/// 统计窗口内已结束对话的汇总
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSummary {
    pub period_days: u32,
    pub total: u64,
    pub by_category: BTreeMap<Option<String>, u64>,
}

impl ReportSummary {
    pub fn render(&self) -> String {
        let mut text = format!("📊 Диалогов за {} дн.: {}", self.period_days, self.total);
        if self.by_category.is_empty() {
            return text;
        }
        text.push_str("\n\nПо категориям:");
        for (category, count) in &self.by_category {
            let percent = if self.total == 0 {
                0.0
            } else {
                *count as f64 * 100.0 / self.total as f64
            };
            text.push_str(&format!(
                "\n• {}: {} ({:.1}%)",
                category.as_deref().unwrap_or(UNCATEGORIZED),
                count,
                percent
            ));
        }
        text
    }
}

/// 报表统计，只读
#[derive(Clone)]
pub struct ReportAggregator {
    db: DatabaseConnection,
}

impl ReportAggregator {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// 统计窗口的起点，超出时间可表示范围时从 UNIX 纪元开始
    fn window_start(now: DateTime<Utc>, period_days: u32) -> DateTime<Utc> {
        Duration::try_days(i64::from(period_days))
            .and_then(|window| now.checked_sub_signed(window))
            .map_or(DateTime::<Utc>::UNIX_EPOCH, |since| since.max(DateTime::<Utc>::UNIX_EPOCH))
    }

    /// 窗口内开始且已经结束的对话
    fn closed_since(now: DateTime<Utc>, period_days: u32) -> Select<conversation::Entity> {
        let since = Self::window_start(now, period_days);
        conversation::Entity::find()
            .filter(conversation::Column::StartTime.gte(since))
            .filter(conversation::Column::EndTime.is_not_null())
    }

    pub async fn category_counts(&self, period_days: u32) -> SupportResult<BTreeMap<Option<String>, u64>> {
        self.category_counts_at(Utc::now(), period_days).await
    }

    pub async fn category_counts_at(
        &self,
        now: DateTime<Utc>,
        period_days: u32,
    ) -> SupportResult<BTreeMap<Option<String>, u64>> {
        let rows: Vec<(Option<String>, i64)> = Self::closed_since(now, period_days)
            .select_only()
            .column(conversation::Column::Category)
            .column_as(Expr::col(conversation::Column::Id).count(), "count")
            .group_by(conversation::Column::Category)
            .into_tuple()
            .all(&self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(category, count)| (category, count.max(0) as u64))
            .collect())
    }

    pub async fn total_count(&self, period_days: u32) -> SupportResult<u64> {
        self.total_count_at(Utc::now(), period_days).await
    }

    pub async fn total_count_at(&self, now: DateTime<Utc>, period_days: u32) -> SupportResult<u64> {
        Ok(Self::closed_since(now, period_days).count(&self.db).await?)
    }

    pub async fn summary(&self, period_days: u32) -> SupportResult<ReportSummary> {
        let now = Utc::now();
        Ok(ReportSummary {
            period_days,
            total: self.total_count_at(now, period_days).await?,
            by_category: self.category_counts_at(now, period_days).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use sea_orm::{ActiveModelTrait, Set};
    use support_bot_entity::Transcript;

    use super::*;
    use crate::conversation::ConversationStore;
    use crate::database::setup_test_database;
    use crate::registry::UserRegistry;

    /// 直接写入一条指定开始时间的对话
    async fn insert(
        db: &DatabaseConnection,
        user_id: i32,
        start: DateTime<Utc>,
        closed: bool,
        category: Option<&str>,
    ) -> conversation::Model {
        conversation::ActiveModel {
            user_id: Set(user_id),
            start_time: Set(start),
            end_time: Set(closed.then(|| start + Duration::minutes(5))),
            is_successful: Set(closed.then_some(true)),
            messages: Set(Transcript::default()),
            category: Set(category.map(str::to_string)),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_empty_window() {
        let aggregator = ReportAggregator::new(setup_test_database().await);
        assert!(aggregator.category_counts(7).await.unwrap().is_empty());
        assert_eq!(aggregator.total_count(7).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_window_and_closed_filter() {
        let db = setup_test_database().await;
        let registry = UserRegistry::new(db.clone());
        let now = Utc::now();
        let u1 = registry.get_or_create(1).await.unwrap();
        let u2 = registry.get_or_create(2).await.unwrap();
        let u3 = registry.get_or_create(3).await.unwrap();

        // 开始于 1、3、10 天前，分类 A、A、B；3 天前的那条仍在进行中
        insert(&db, u1.id, now - Duration::days(1), true, Some("A")).await;
        insert(&db, u2.id, now - Duration::days(3), false, Some("A")).await;
        insert(&db, u3.id, now - Duration::days(10), true, Some("B")).await;

        let aggregator = ReportAggregator::new(db);
        let counts = aggregator.category_counts_at(now, 7).await.unwrap();
        assert_eq!(counts, BTreeMap::from([(Some("A".to_string()), 1)]));
        assert_eq!(aggregator.total_count_at(now, 7).await.unwrap(), 1);

        let wide = aggregator.category_counts_at(now, 30).await.unwrap();
        assert_eq!(
            wide,
            BTreeMap::from([(Some("A".to_string()), 1), (Some("B".to_string()), 1)])
        );
    }

    #[tokio::test]
    async fn test_closure_moves_conversation_into_report() {
        let db = setup_test_database().await;
        let user = UserRegistry::new(db.clone()).get_or_create(1).await.unwrap();
        let store = ConversationStore::new(db.clone());
        let aggregator = ReportAggregator::new(db);

        let active = store.open(user.id).await.unwrap();
        assert_eq!(aggregator.total_count(7).await.unwrap(), 0);

        store.close(active, false).await.unwrap();
        assert_eq!(aggregator.total_count(7).await.unwrap(), 1);
        assert_eq!(
            aggregator.category_counts(7).await.unwrap(),
            BTreeMap::from([(None, 1)])
        );
    }

    #[tokio::test]
    async fn test_huge_window_covers_all_history() {
        let db = setup_test_database().await;
        let user = UserRegistry::new(db.clone()).get_or_create(1).await.unwrap();
        let now = Utc::now();
        insert(&db, user.id, now - Duration::days(4000), true, Some("A")).await;
        insert(&db, user.id, now - Duration::days(1), true, None).await;

        let aggregator = ReportAggregator::new(db);
        for days in [100_000_000, u32::MAX] {
            assert_eq!(aggregator.total_count_at(now, days).await.unwrap(), 2);
            assert_eq!(
                aggregator.category_counts_at(now, days).await.unwrap(),
                BTreeMap::from([(None, 1), (Some("A".to_string()), 1)])
            );
        }
        assert_eq!(aggregator.summary(u32::MAX).await.unwrap().total, 2);
    }

    #[test]
    fn test_window_start_is_clamped() {
        let now = Utc::now();
        assert_eq!(ReportAggregator::window_start(now, 7), now - Duration::days(7));
        assert_eq!(ReportAggregator::window_start(now, u32::MAX), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_summary_render() {
        let summary = ReportSummary {
            period_days: 7,
            total: 4,
            by_category: BTreeMap::from([(None, 1), (Some("оплата".to_string()), 3)]),
        };
        assert_eq!(
            summary.render(),
            "📊 Диалогов за 7 дн.: 4\n\nПо категориям:\n• без категории: 1 (25.0%)\n• оплата: 3 (75.0%)"
        );

        let empty = ReportSummary {
            period_days: 7,
            total: 0,
            by_category: BTreeMap::new(),
        };
        assert_eq!(empty.render(), "📊 Диалогов за 7 дн.: 0");
    }
}
