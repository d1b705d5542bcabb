use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::db::RepoError;
use crate::operations::repo_types::{
    CategoryLabel, NewOperation, Operation, OperationType, OperationWithCategory,
};

#[async_trait]
pub trait OperationRepo: Send + Sync {
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<OperationWithCategory>, RepoError>;
    /// Ownership-scoped lookup: a foreign operation is reported as absent.
    async fn find_by_owner_and_id(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<OperationWithCategory>, RepoError>;
    async fn save(&self, user_id: i64, op: &NewOperation) -> Result<Operation, RepoError>;
    async fn update(&self, id: i64, op: &NewOperation) -> Result<Operation, RepoError>;
    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}

#[derive(Debug, FromRow)]
struct OperationRow {
    id: i64,
    user_id: i64,
    category_id: i64,
    kind: String,
    amount: Decimal,
    date: OffsetDateTime,
    description: String,
}

#[derive(Debug, FromRow)]
struct OperationDetailsRow {
    #[sqlx(flatten)]
    operation: OperationRow,
    category_name: String,
    category_color: String,
    category_description: String,
    category_is_default: bool,
}

impl TryFrom<OperationRow> for Operation {
    type Error = RepoError;

    fn try_from(r: OperationRow) -> Result<Self, Self::Error> {
        let kind = r
            .kind
            .parse::<OperationType>()
            .map_err(|e| RepoError::Decode(e.to_string()))?;
        Ok(Operation {
            id: r.id,
            user_id: r.user_id,
            category_id: r.category_id,
            kind,
            amount: r.amount,
            date: r.date,
            description: r.description,
        })
    }
}

impl TryFrom<OperationDetailsRow> for OperationWithCategory {
    type Error = RepoError;

    fn try_from(r: OperationDetailsRow) -> Result<Self, Self::Error> {
        Ok(OperationWithCategory {
            operation: r.operation.try_into()?,
            category: CategoryLabel {
                name: r.category_name,
                color: r.category_color,
                description: r.category_description,
                is_default: r.category_is_default,
            },
        })
    }
}

const SELECT_WITH_CATEGORY: &str = r#"
    SELECT o.id, o.user_id, o.category_id, o.kind, o.amount, o.date, o.description,
           c.name        AS category_name,
           c.color       AS category_color,
           c.description AS category_description,
           c.is_default  AS category_is_default
      FROM operations o
      JOIN categories c ON c.id = o.category_id
"#;

pub struct PgOperationRepo {
    db: PgPool,
}

impl PgOperationRepo {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl OperationRepo for PgOperationRepo {
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<OperationWithCategory>, RepoError> {
        let sql = format!("{SELECT_WITH_CATEGORY} WHERE o.user_id = $1 ORDER BY o.id");
        let rows = sqlx::query_as::<_, OperationDetailsRow>(&sql)
            .bind(user_id)
            .fetch_all(&self.db)
            .await?;
        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn find_by_owner_and_id(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<OperationWithCategory>, RepoError> {
        let sql = format!("{SELECT_WITH_CATEGORY} WHERE o.id = $1 AND o.user_id = $2");
        let row = sqlx::query_as::<_, OperationDetailsRow>(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?;
        row.map(TryInto::try_into).transpose()
    }

    async fn save(&self, user_id: i64, op: &NewOperation) -> Result<Operation, RepoError> {
        let row = sqlx::query_as::<_, OperationRow>(
            r#"
            INSERT INTO operations (user_id, category_id, kind, amount, date, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, category_id, kind, amount, date, description
            "#,
        )
        .bind(user_id)
        .bind(op.category_id)
        .bind(op.kind.as_str())
        .bind(op.amount)
        .bind(op.date)
        .bind(&op.description)
        .fetch_one(&self.db)
        .await?;
        row.try_into()
    }

    async fn update(&self, id: i64, op: &NewOperation) -> Result<Operation, RepoError> {
        let row = sqlx::query_as::<_, OperationRow>(
            r#"
            UPDATE operations
               SET category_id = $1, kind = $2, amount = $3, date = $4,
                   description = $5, updated_at = now()
             WHERE id = $6
            RETURNING id, user_id, category_id, kind, amount, date, description
            "#,
        )
        .bind(op.category_id)
        .bind(op.kind.as_str())
        .bind(op.amount)
        .bind(op.date)
        .bind(&op.description)
        .bind(id)
        .fetch_one(&self.db)
        .await?;
        row.try_into()
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM operations WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
