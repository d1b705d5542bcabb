use serde::{Deserialize, Serialize};

use crate::categories::repo_types::{Category, CategoryFields};
use crate::error::AppError;

/// `#RRGGBB`-shaped: seven bytes, leading `#`.
pub fn is_valid_color(color: &str) -> bool {
    color.len() == 7 && color.starts_with('#')
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub description: String,
}

impl TryFrom<CategoryRequest> for CategoryFields {
    type Error = AppError;

    fn try_from(req: CategoryRequest) -> Result<Self, Self::Error> {
        let name = req.name.trim();
        if name.is_empty() || !is_valid_color(&req.color) {
            return Err(AppError::InvalidParameters);
        }
        Ok(CategoryFields {
            name: name.to_owned(),
            color: req.color,
            description: req.description,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub description: String,
    pub is_default: bool,
}

impl From<Category> for CategoryResponse {
    fn from(c: Category) -> Self {
        Self {
            id: c.id,
            name: c.name,
            color: c.color,
            description: c.description,
            is_default: c.is_default,
        }
    }
}
