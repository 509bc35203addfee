//! Human-readable quote and invoice numbers.
//!
//! Numbers are `<prefix>-<unix seconds>`. Two documents of the same kind
//! created within the same second receive the same number; the unique index
//! on the number column rejects the second insert.

use chrono::{DateTime, Utc};

/// Kind of numbered sales document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Quote,
    Invoice,
}

impl DocumentKind {
    /// Number prefix for this kind.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Quote => "QT",
            Self::Invoice => "INV",
        }
    }

    /// Generate the number for a document created at `at`.
    #[must_use]
    pub fn number_at(self, at: DateTime<Utc>) -> String {
        format!("{}-{}", self.prefix(), at.timestamp())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_quote_number_uses_unix_seconds() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(DocumentKind::Quote.number_at(at), "QT-1704067200");
        assert_eq!(DocumentKind::Invoice.number_at(at), "INV-1704067200");
    }

    #[test]
    fn test_same_second_collides() {
        let first = Utc.timestamp_millis_opt(1_704_067_200_100).unwrap();
        let second = Utc.timestamp_millis_opt(1_704_067_200_900).unwrap();
        assert_eq!(
            DocumentKind::Quote.number_at(first),
            DocumentKind::Quote.number_at(second)
        );

        let next = Utc.timestamp_millis_opt(1_704_067_201_000).unwrap();
        assert_ne!(
            DocumentKind::Quote.number_at(first),
            DocumentKind::Quote.number_at(next)
        );
    }
}
