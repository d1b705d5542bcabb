use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Income,
    Expense,
}

impl OperationType {
    pub fn as_str(self) -> &'static str {
        match self {
            OperationType::Income => "income",
            OperationType::Expense => "expense",
        }
    }

    /// Contribution of `amount` to the balance.
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            OperationType::Income => amount,
            OperationType::Expense => -amount,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation type: {0}")]
pub struct UnknownOperationType(pub String);

impl FromStr for OperationType {
    type Err = UnknownOperationType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(OperationType::Income),
            "expense" => Ok(OperationType::Expense),
            other => Err(UnknownOperationType(other.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub id: i64,
    pub user_id: i64,
    pub category_id: i64,
    pub kind: OperationType,
    pub amount: Decimal,
    pub date: OffsetDateTime,
    pub description: String,
}

/// Display fields of the category an operation points at.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryLabel {
    pub name: String,
    pub color: String,
    pub description: String,
    pub is_default: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationWithCategory {
    pub operation: Operation,
    pub category: CategoryLabel,
}

/// Fully validated write, with the category already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOperation {
    pub category_id: i64,
    pub kind: OperationType,
    pub amount: Decimal,
    pub date: OffsetDateTime,
    pub description: String,
}
