//! In-memory gateways for tests. Enforces the same unique and foreign-key
//! rules as the Postgres schema.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard,
};

use async_trait::async_trait;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use crate::auth::{repo::UserRepo, repo_types::User};
use crate::categories::{
    repo::CategoryRepo,
    repo_types::{Category, CategoryFields},
};
use crate::db::RepoError;
use crate::operations::{
    repo::OperationRepo,
    repo_types::{CategoryLabel, NewOperation, Operation, OperationType, OperationWithCategory},
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    operations: Vec<Operation>,
    next_user: i64,
    next_category: i64,
    next_operation: i64,
}

impl Tables {
    fn with_category(&self, op: &Operation) -> Option<OperationWithCategory> {
        let c = self.categories.iter().find(|c| c.id == op.category_id)?;
        Some(OperationWithCategory {
            operation: op.clone(),
            category: CategoryLabel {
                name: c.name.clone(),
                color: c.color.clone(),
                description: c.description.clone(),
                is_default: c.is_default,
            },
        })
    }

    fn add_user(&mut self, username: &str, email: &str, password_hash: &str) -> Result<User, RepoError> {
        if self
            .users
            .iter()
            .any(|u| u.username == username || u.email == email)
        {
            return Err(RepoError::Conflict);
        }
        self.next_user += 1;
        let user = User {
            id: self.next_user,
            username: username.to_owned(),
            email: email.to_owned(),
            password_hash: password_hash.to_owned(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.users.push(user.clone());
        Ok(user)
    }

    fn add_category(&mut self, user_id: Option<i64>, fields: &CategoryFields) -> Result<Category, RepoError> {
        if let Some(id) = user_id {
            if !self.users.iter().any(|u| u.id == id) {
                return Err(RepoError::Referenced);
            }
        }
        self.next_category += 1;
        let category = Category {
            id: self.next_category,
            name: fields.name.clone(),
            description: fields.description.clone(),
            color: fields.color.clone(),
            is_default: user_id.is_none(),
            user_id,
        };
        self.categories.push(category.clone());
        Ok(category)
    }

    fn add_operation(&mut self, user_id: i64, op: &NewOperation) -> Result<Operation, RepoError> {
        self.check_operation_refs(user_id, op.category_id)?;
        self.next_operation += 1;
        let operation = Operation {
            id: self.next_operation,
            user_id,
            category_id: op.category_id,
            kind: op.kind,
            amount: op.amount,
            date: op.date,
            description: op.description.clone(),
        };
        self.operations.push(operation.clone());
        Ok(operation)
    }

    fn check_operation_refs(&self, user_id: i64, category_id: i64) -> Result<(), RepoError> {
        let user_exists = self.users.iter().any(|u| u.id == user_id);
        let category_exists = self.categories.iter().any(|c| c.id == category_id);
        if user_exists && category_exists {
            Ok(())
        } else {
            Err(RepoError::Referenced)
        }
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    fn writable(&self) -> Result<(), RepoError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepoError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    /// Makes every subsequent write fail as if the database were unreachable.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn insert_user(&self, username: &str, email: &str, password_hash: &str) -> User {
        self.lock().add_user(username, email, password_hash).unwrap()
    }

    pub fn remove_user(&self, id: i64) {
        let mut t = self.lock();
        t.users.retain(|u| u.id != id);
        t.categories.retain(|c| c.user_id != Some(id));
        t.operations.retain(|o| o.user_id != id);
    }

    /// `None` owner makes a system default.
    pub fn insert_category(&self, user_id: Option<i64>, name: &str, color: &str) -> Category {
        let fields = CategoryFields {
            name: name.into(),
            color: color.into(),
            description: name.into(),
        };
        self.lock().add_category(user_id, &fields).unwrap()
    }

    pub fn insert_operation(
        &self,
        user_id: i64,
        category_id: i64,
        kind: OperationType,
        amount: Decimal,
        date: OffsetDateTime,
        description: &str,
    ) -> Operation {
        let op = NewOperation {
            category_id,
            kind,
            amount,
            date,
            description: description.into(),
        };
        self.lock().add_operation(user_id, &op).unwrap()
    }

    pub fn category(&self, id: i64) -> Option<Category> {
        self.lock().categories.iter().find(|c| c.id == id).cloned()
    }
}

#[async_trait]
impl UserRepo for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, RepoError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn save(&self, username: &str, email: &str, password_hash: &str) -> Result<User, RepoError> {
        self.writable()?;
        self.lock().add_user(username, email, password_hash)
    }
}

#[async_trait]
impl CategoryRepo for MemoryStore {
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<Category>, RepoError> {
        let t = self.lock();
        Ok(t.categories
            .iter()
            .filter(|c| c.user_id == Some(user_id))
            .cloned()
            .collect())
    }

    async fn list_defaults(&self) -> Result<Vec<Category>, RepoError> {
        let t = self.lock();
        Ok(t.categories.iter().filter(|c| c.is_default).cloned().collect())
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Category>, RepoError> {
        Ok(self.category(id))
    }

    async fn find_by_owner_and_id(&self, user_id: i64, id: i64) -> Result<Option<Category>, RepoError> {
        Ok(self.category(id).filter(|c| c.user_id == Some(user_id)))
    }

    async fn save(&self, user_id: i64, fields: &CategoryFields) -> Result<Category, RepoError> {
        self.writable()?;
        self.lock().add_category(Some(user_id), fields)
    }

    async fn update(&self, id: i64, fields: &CategoryFields) -> Result<Category, RepoError> {
        self.writable()?;
        let mut t = self.lock();
        let category = t
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(RepoError::Database(sqlx::Error::RowNotFound))?;
        category.name = fields.name.clone();
        category.color = fields.color.clone();
        category.description = fields.description.clone();
        Ok(category.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.writable()?;
        let mut t = self.lock();
        if t.operations.iter().any(|o| o.category_id == id) {
            return Err(RepoError::Referenced);
        }
        t.categories.retain(|c| c.id != id);
        Ok(())
    }
}

#[async_trait]
impl OperationRepo for MemoryStore {
    async fn list_by_owner(&self, user_id: i64) -> Result<Vec<OperationWithCategory>, RepoError> {
        let t = self.lock();
        Ok(t.operations
            .iter()
            .filter(|o| o.user_id == user_id)
            .filter_map(|o| t.with_category(o))
            .collect())
    }

    async fn find_by_owner_and_id(
        &self,
        user_id: i64,
        id: i64,
    ) -> Result<Option<OperationWithCategory>, RepoError> {
        let t = self.lock();
        Ok(t.operations
            .iter()
            .find(|o| o.id == id && o.user_id == user_id)
            .and_then(|o| t.with_category(o)))
    }

    async fn save(&self, user_id: i64, op: &NewOperation) -> Result<Operation, RepoError> {
        self.writable()?;
        self.lock().add_operation(user_id, op)
    }

    async fn update(&self, id: i64, op: &NewOperation) -> Result<Operation, RepoError> {
        self.writable()?;
        let mut t = self.lock();
        let user_id = t
            .operations
            .iter()
            .find(|o| o.id == id)
            .map(|o| o.user_id)
            .ok_or(RepoError::Database(sqlx::Error::RowNotFound))?;
        t.check_operation_refs(user_id, op.category_id)?;
        let operation = t
            .operations
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(RepoError::Database(sqlx::Error::RowNotFound))?;
        operation.category_id = op.category_id;
        operation.kind = op.kind;
        operation.amount = op.amount;
        operation.date = op.date;
        operation.description = op.description.clone();
        Ok(operation.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.writable()?;
        self.lock().operations.retain(|o| o.id != id);
        Ok(())
    }
}
