//! Closed label sets stored as Postgres enums.
//!
//! Each enum serializes to the exact label the API accepts and stores, and
//! implements `Display`/`FromStr` over the same label.

use serde::{Deserialize, Serialize};

/// Error returned when a string is not one of an enum's labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseLabelError {
    /// Name of the label set.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

macro_rules! labels {
    ($name:ident, $kind:literal { $($variant:ident => $label:literal),+ $(,)? }) => {
        impl $name {
            /// Every label in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored label.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label),+
                }
            }

            /// All labels as strings, for validation messages and filters.
            #[must_use]
            pub fn labels() -> Vec<&'static str> {
                Self::ALL.iter().map(|value| value.as_str()).collect()
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ParseLabelError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(ParseLabelError {
                        kind: $kind,
                        value: s.to_owned(),
                    }),
                }
            }
        }
    };
}

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "crm.user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Operator account (created through the CLI).
    Admin,
    /// Self-registered account.
    #[default]
    User,
}

labels!(UserRole, "role" { Admin => "admin", User => "user" });

/// Pipeline stage of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(type_name = "crm.deal_stage"))]
pub enum DealStage {
    #[default]
    #[serde(rename = "New")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "New"))]
    New,
    #[serde(rename = "Qualification")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Qualification"))]
    Qualification,
    #[serde(rename = "Needs Analysis")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Needs Analysis"))]
    NeedsAnalysis,
    #[serde(rename = "Proposal/Price Quote")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Proposal/Price Quote"))]
    Proposal,
    #[serde(rename = "Negotiation/Review")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Negotiation/Review"))]
    Negotiation,
    #[serde(rename = "Closed Won")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Closed Won"))]
    ClosedWon,
    #[serde(rename = "Closed Lost")]
    #[cfg_attr(feature = "postgres", sqlx(rename = "Closed Lost"))]
    ClosedLost,
}

labels!(DealStage, "stage" {
    New => "New",
    Qualification => "Qualification",
    NeedsAnalysis => "Needs Analysis",
    Proposal => "Proposal/Price Quote",
    Negotiation => "Negotiation/Review",
    ClosedWon => "Closed Won",
    ClosedLost => "Closed Lost",
});

/// Task urgency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "crm.task_priority", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

labels!(TaskPriority, "priority" { Low => "low", Medium => "medium", High => "high" });

/// Task progress. Transitions between statuses are not enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "crm.task_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Overdue,
}

labels!(TaskStatus, "status" {
    Pending => "pending",
    InProgress => "in_progress",
    Completed => "completed",
    Overdue => "overdue",
});

/// Kind of logged interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "crm.activity_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Call,
    Meeting,
    Note,
    Email,
}

labels!(ActivityType, "type" {
    Call => "call",
    Meeting => "meeting",
    Note => "note",
    Email => "email",
});

/// Quote lifecycle label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "crm.quote_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Declined,
    Expired,
}

labels!(QuoteStatus, "status" {
    Draft => "draft",
    Sent => "sent",
    Accepted => "accepted",
    Declined => "declined",
    Expired => "expired",
});

/// Invoice lifecycle label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "crm.invoice_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

labels!(InvoiceStatus, "status" {
    Draft => "draft",
    Sent => "sent",
    Paid => "paid",
    Overdue => "overdue",
    Cancelled => "cancelled",
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_stage_labels_round_trip_through_serde() {
        for stage in DealStage::ALL {
            let json = serde_json::to_string(stage).unwrap();
            assert_eq!(json, format!("\"{}\"", stage.as_str()));
            let parsed: DealStage = stage.as_str().parse().unwrap();
            assert_eq!(parsed, *stage);
        }
    }

    #[test]
    fn test_deal_stage_default_is_new() {
        assert_eq!(DealStage::default(), DealStage::New);
        assert_eq!(DealStage::ClosedWon.to_string(), "Closed Won");
    }

    #[test]
    fn test_task_status_snake_case() {
        assert_eq!(TaskStatus::InProgress.as_str(), "in_progress");
        assert_eq!(
            serde_json::to_string(&TaskStatus::InProgress).unwrap(),
            "\"in_progress\""
        );
        assert_eq!("completed".parse::<TaskStatus>().unwrap(), TaskStatus::Completed);
    }

    #[test]
    fn test_parse_rejects_unknown_label() {
        let err = "archived".parse::<QuoteStatus>().unwrap_err();
        assert_eq!(err.kind, "status");
        assert_eq!(err.to_string(), "invalid status: archived");
        assert!("closed won".parse::<DealStage>().is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(TaskPriority::default(), TaskPriority::Medium);
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
        assert_eq!(QuoteStatus::default(), QuoteStatus::Draft);
        assert_eq!(InvoiceStatus::default(), InvoiceStatus::Draft);
        assert_eq!(UserRole::default(), UserRole::User);
    }

    #[test]
    fn test_labels_listing() {
        assert_eq!(ActivityType::labels(), vec!["call", "meeting", "note", "email"]);
    }
}
