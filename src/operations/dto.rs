use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{format_description::well_known::Rfc3339, OffsetDateTime, UtcOffset};

use crate::error::AppError;
use crate::operations::repo_types::{OperationType, OperationWithCategory};

#[derive(Debug, Deserialize)]
pub struct OperationRequest {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: String,
}

/// Structurally valid operation whose category reference is still unresolved.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDraft {
    pub kind: OperationType,
    pub amount: Decimal,
    pub date: OffsetDateTime,
    pub description: String,
    pub category_id: String,
}

impl OperationRequest {
    /// Checks type, amount and date against `now`. The category is left to the
    /// service, which needs the store to resolve it.
    pub fn into_draft(self, now: OffsetDateTime) -> Result<OperationDraft, AppError> {
        let kind = self
            .kind
            .parse::<OperationType>()
            .map_err(|_| AppError::InvalidParameters)?;

        let amount = self.amount.round_dp(2);
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidParameters);
        }

        let date = parse_date(&self.date).ok_or(AppError::InvalidParameters)?;
        if date > now {
            return Err(AppError::InvalidParameters);
        }

        Ok(OperationDraft {
            kind,
            amount,
            date,
            description: self.description,
            category_id: self.category_id.trim().to_owned(),
        })
    }
}

/// RFC 3339 in any offset, normalized to UTC at the store's microsecond precision.
fn parse_date(raw: &str) -> Option<OffsetDateTime> {
    let date = OffsetDateTime::parse(raw.trim(), &Rfc3339)
        .ok()?
        .to_offset(UtcOffset::UTC);
    date.replace_nanosecond(date.nanosecond() / 1_000 * 1_000).ok()
}

#[derive(Debug, Serialize)]
pub struct CategorySummary {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Serialize)]
pub struct OperationSummary {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: OperationType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub category: CategorySummary,
}

impl From<OperationWithCategory> for OperationSummary {
    fn from(o: OperationWithCategory) -> Self {
        Self {
            id: o.operation.id,
            kind: o.operation.kind,
            amount: o.operation.amount,
            date: o.operation.date,
            category: CategorySummary {
                name: o.category.name,
                color: o.category.color,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryDetails {
    pub name: String,
    pub color: String,
    pub description: String,
    pub is_default: bool,
}

#[derive(Debug, Serialize)]
pub struct OperationDetails {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: OperationType,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub category: CategoryDetails,
    pub description: String,
}

impl From<OperationWithCategory> for OperationDetails {
    fn from(o: OperationWithCategory) -> Self {
        Self {
            id: o.operation.id,
            kind: o.operation.kind,
            amount: o.operation.amount,
            date: o.operation.date,
            category: CategoryDetails {
                name: o.category.name,
                color: o.category.color,
                description: o.category.description,
                is_default: o.category.is_default,
            },
            description: o.operation.description,
        }
    }
}
