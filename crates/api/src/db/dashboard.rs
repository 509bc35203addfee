//! Dashboard aggregates, computed on every request.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crm_core::UserId;
use crm_core::models::{Activity, DashboardStats, StageSummary};

use super::RepositoryError;
use super::activities::ACTIVITY_COLUMNS;

/// Number of activities in `recent_activities`.
const RECENT_ACTIVITY_LIMIT: i64 = 5;

#[derive(sqlx::FromRow)]
struct Totals {
    total_contacts: i64,
    total_companies: i64,
    total_deals: i64,
    total_deals_value: Decimal,
    won_deals: i64,
    won_deals_value: Decimal,
    open_tasks: i64,
    overdue_tasks: i64,
    activities_this_week: i64,
}

/// Repository for dashboard aggregates.
pub struct DashboardRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DashboardRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Compute the owner's dashboard.
    ///
    /// Tasks due strictly before `today` and not completed are overdue.
    /// Activities created at or after `week_start` count toward this week.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn stats(
        &self,
        owner: UserId,
        today: NaiveDate,
        week_start: DateTime<Utc>,
    ) -> Result<DashboardStats, RepositoryError> {
        let totals = sqlx::query_as::<_, Totals>(
            "SELECT
                (SELECT COUNT(*) FROM crm.contacts WHERE owner_id = $1) AS total_contacts,
                (SELECT COUNT(*) FROM crm.companies WHERE owner_id = $1) AS total_companies,
                (SELECT COUNT(*) FROM crm.deals WHERE owner_id = $1) AS total_deals,
                (SELECT COALESCE(SUM(amount), 0) FROM crm.deals
                  WHERE owner_id = $1) AS total_deals_value,
                (SELECT COUNT(*) FROM crm.deals
                  WHERE owner_id = $1 AND stage = 'Closed Won') AS won_deals,
                (SELECT COALESCE(SUM(amount), 0) FROM crm.deals
                  WHERE owner_id = $1 AND stage = 'Closed Won') AS won_deals_value,
                (SELECT COUNT(*) FROM crm.tasks
                  WHERE owner_id = $1 AND status <> 'completed') AS open_tasks,
                (SELECT COUNT(*) FROM crm.tasks
                  WHERE owner_id = $1 AND status <> 'completed' AND due_date < $2) AS overdue_tasks,
                (SELECT COUNT(*) FROM crm.activities
                  WHERE owner_id = $1 AND created_at >= $3) AS activities_this_week",
        )
        .bind(owner)
        .bind(today)
        .bind(week_start)
        .fetch_one(self.pool)
        .await?;

        let deals_by_stage = sqlx::query_as::<_, StageSummary>(
            "SELECT stage, COUNT(*) AS count, COALESCE(SUM(amount), 0) AS value
             FROM crm.deals
             WHERE owner_id = $1
             GROUP BY stage
             ORDER BY stage",
        )
        .bind(owner)
        .fetch_all(self.pool)
        .await?;

        let recent_activities = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM crm.activities
             WHERE owner_id = $1
             ORDER BY created_at DESC, id DESC
             LIMIT $2"
        ))
        .bind(owner)
        .bind(RECENT_ACTIVITY_LIMIT)
        .fetch_all(self.pool)
        .await?;

        Ok(DashboardStats {
            total_contacts: totals.total_contacts,
            total_companies: totals.total_companies,
            total_deals: totals.total_deals,
            total_deals_value: totals.total_deals_value,
            won_deals: totals.won_deals,
            won_deals_value: totals.won_deals_value,
            open_tasks: totals.open_tasks,
            overdue_tasks: totals.overdue_tasks,
            activities_this_week: totals.activities_this_week,
            deals_by_stage,
            recent_activities,
        })
    }
}
