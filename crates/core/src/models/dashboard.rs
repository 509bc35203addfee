//! Per-user dashboard aggregates.

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::Activity;
use crate::types::DealStage;

/// Counts and sums over everything the caller owns, computed per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_contacts: i64,
    pub total_companies: i64,
    pub total_deals: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_deals_value: Decimal,
    /// Deals at exactly `Closed Won`.
    pub won_deals: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub won_deals_value: Decimal,
    /// Tasks not yet completed.
    pub open_tasks: i64,
    /// Open tasks due before today.
    pub overdue_tasks: i64,
    /// Activities created since the start of the week.
    pub activities_this_week: i64,
    pub deals_by_stage: Vec<StageSummary>,
    /// The five newest activities.
    pub recent_activities: Vec<Activity>,
}

/// Deal count and value for one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct StageSummary {
    pub stage: DealStage,
    pub count: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub value: Decimal,
}

/// Monday 00:00 UTC of the week containing `now`.
#[must_use]
pub fn start_of_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_since_monday = i64::from(now.weekday().num_days_from_monday());
    let monday = now.date_naive() - Duration::days(days_since_monday);
    monday.and_time(NaiveTime::MIN).and_utc()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_start_of_week_midweek() {
        // Thursday
        let now = Utc.with_ymd_and_hms(2026, 10, 15, 16, 45, 3).unwrap();
        assert_eq!(
            start_of_week(now),
            Utc.with_ymd_and_hms(2026, 10, 12, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_start_of_week_on_monday_and_sunday() {
        let monday = Utc.with_ymd_and_hms(2026, 10, 19, 0, 0, 0).unwrap();
        assert_eq!(start_of_week(monday), monday);

        let sunday = Utc.with_ymd_and_hms(2026, 10, 25, 23, 59, 59).unwrap();
        assert_eq!(start_of_week(sunday), monday);
    }

    #[test]
    fn test_stage_summary_serializes_value_as_number() {
        let summary = StageSummary {
            stage: DealStage::ClosedWon,
            count: 2,
            value: Decimal::new(1_250_050, 2),
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["stage"], "Closed Won");
        assert_eq!(json["value"], serde_json::json!(12500.5));
    }
}
