//! Quote entity: the pre-order pricing record with one-way conversion.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::UnknownVariant;

/// Quote lifecycle status. Conversion is one-way: a converted quote can never
/// return to pending, and `converted_order_id` is set exactly once with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum QuoteStatus {
    Pending,
    Converted,
    Archived,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Pending => "pending",
            QuoteStatus::Converted => "converted",
            QuoteStatus::Archived => "archived",
        }
    }

    pub fn parse(value: &str) -> Result<Self, UnknownVariant> {
        match value {
            "pending" => Ok(QuoteStatus::Pending),
            "converted" => Ok(QuoteStatus::Converted),
            "archived" => Ok(QuoteStatus::Archived),
            other => Err(UnknownVariant {
                kind: "quote status",
                value: other.to_string(),
            }),
        }
    }

    /// Quotes are mutable only while pending.
    pub fn is_terminal(&self) -> bool {
        matches!(self, QuoteStatus::Converted | QuoteStatus::Archived)
    }
}

/// A priced mailing quote, convertible into an order exactly once.
#[derive(Debug, Clone)]
pub struct Quote {
    pub id: Uuid,
    /// Sequential, assigned by the store at insert.
    pub quote_number: i64,
    pub practice_id: Uuid,
    pub user_id: Uuid,
    pub status: QuoteStatus,
    pub service_type: String,
    pub recipient_count: i64,
    pub total_cost_cents: i64,
    /// Set exactly once, together with the flip to `Converted`.
    pub converted_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a quote.
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub practice_id: Uuid,
    pub user_id: Uuid,
    pub service_type: String,
    pub recipient_count: i64,
    pub total_cost_cents: i64,
}
