//! In-process store used when no `DATABASE_URL` is configured, and by tests.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::{
    auth::{CreateUserError, NewUser, User, UserRepo},
    returns::{NewReturn, ReturnRecord, ReturnRepo},
};

#[derive(Debug, Default)]
pub struct MemoryDb {
    /// Keyed by username; the map is the uniqueness constraint.
    users: Mutex<HashMap<String, User>>,
    returns: RwLock<Vec<ReturnRecord>>,
    return_seq: AtomicI64,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_return_id(&self) -> i64 {
        self.return_seq.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl UserRepo for MemoryDb {
    async fn create(&self, new: NewUser<'_>) -> Result<User, CreateUserError> {
        let mut users = self.users.lock().await;
        if users.contains_key(new.username) {
            return Err(CreateUserError::UsernameTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: new.username.to_owned(),
            password_hash: new.password_hash.to_owned(),
            role: new.role,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        Ok(self.users.lock().await.get(username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let users = self.users.lock().await;
        Ok(users.values().find(|u| u.id == id).cloned())
    }
}

#[async_trait]
impl ReturnRepo for MemoryDb {
    async fn insert(&self, new: NewReturn<'_>) -> anyhow::Result<ReturnRecord> {
        let record = ReturnRecord {
            id: Uuid::new_v4(),
            return_id: self.next_return_id(),
            user_id: new.user_id,
            description: new.description.to_owned(),
            image: new.image.clone(),
            created_at: OffsetDateTime::now_utc(),
        };
        self.returns.write().await.push(record.clone());
        Ok(record)
    }

    async fn list_by_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<ReturnRecord>> {
        let mut out: Vec<ReturnRecord> = self
            .returns
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then(b.return_id.cmp(&a.return_id))
        });
        Ok(out)
    }

    async fn find_by_return_id(&self, return_id: i64) -> anyhow::Result<Option<ReturnRecord>> {
        let returns = self.returns.read().await;
        Ok(returns.iter().find(|r| r.return_id == return_id).cloned())
    }
}
