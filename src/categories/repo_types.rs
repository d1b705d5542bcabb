use serde::Serialize;
use sqlx::FromRow;

/// Category row. `user_id` is `None` for system-wide defaults.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub color: String,
    pub is_default: bool,
    #[serde(skip_serializing)]
    pub user_id: Option<i64>,
}

impl Category {
    /// Defaults are visible to everybody; the rest only to their owner.
    pub fn is_visible_to(&self, user_id: i64) -> bool {
        self.is_default || self.user_id == Some(user_id)
    }
}

/// Validated category payload used by both create and update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryFields {
    pub name: String,
    pub color: String,
    pub description: String,
}
