use async_trait::async_trait;
use sqlx::PgPool;

use crate::categories::repo_types::{Category, CategoryFields};
use crate::db::RepoError;

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Category>, RepoError>;
    async fn list_defaults(&self) -> Result<Vec<Category>, RepoError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, RepoError>;
    /// Ownership-scoped lookup: a foreign category is reported as absent.
    async fn find_by_owner_and_id(&self, user_id: i64, id: i64)
        -> Result<Option<Category>, RepoError>;
    async fn save(&self, user_id: i64, fields: &CategoryFields) -> Result<Category, RepoError>;
    async fn update(&self, id: i64, fields: &CategoryFields) -> Result<Category, RepoError>;
    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}

pub struct PgCategoryRepo {
    db: PgPool,
}

impl PgCategoryRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CategoryRepo for PgCategoryRepo {
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Category>, RepoError> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, color, is_default, user_id
            FROM categories
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn list_defaults(&self) -> Result<Vec<Category>, RepoError> {
        let rows = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, color, is_default, user_id
            FROM categories
            WHERE is_default
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, RepoError> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, color, is_default, user_id
            FROM categories
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn find_by_owner_and_id(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<Category>, RepoError> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            SELECT id, name, description, color, is_default, user_id
            FROM categories
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(row)
    }

    async fn save(&self, user_id: i64, fields: &CategoryFields) -> Result<Category, RepoError> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, description, color, is_default, user_id)
            VALUES ($1, $2, $3, FALSE, $4)
            RETURNING id, name, description, color, is_default, user_id
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.color)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: i64, fields: &CategoryFields) -> Result<Category, RepoError> {
        let row = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
               SET name = $1, description = $2, color = $3, updated_at = now()
             WHERE id = $4
            RETURNING id, name, description, color, is_default, user_id
            "#,
        )
        .bind(&fields.name)
        .bind(&fields.description)
        .bind(&fields.color)
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
