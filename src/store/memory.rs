use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use uuid::Uuid;

use super::models::{InterviewRecord, User};
use super::{InterviewStore, Result, UserStore};

/// In-memory store backing tests and throwaway deployments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<Uuid, User>>,
    interviews: Mutex<HashMap<Uuid, InterviewRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        self.users.lock().insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .users
            .lock()
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.lock().get(&id).cloned())
    }
}

#[async_trait]
impl InterviewStore for MemoryStore {
    async fn insert_interview(&self, record: InterviewRecord) -> Result<InterviewRecord> {
        self.interviews.lock().insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_interview(&self, id: Uuid) -> Result<Option<InterviewRecord>> {
        Ok(self.interviews.lock().get(&id).cloned())
    }

    async fn list_interviews(&self, owner_id: Uuid, offset: u64, limit: u64) -> Result<Vec<InterviewRecord>> {
        let mut records: Vec<InterviewRecord> = self
            .interviews
            .lock()
            .values()
            .filter(|r| r.owner_id == owner_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_interviews(&self, owner_id: Uuid) -> Result<u64> {
        Ok(self
            .interviews
            .lock()
            .values()
            .filter(|r| r.owner_id == owner_id)
            .count() as u64)
    }

    async fn replace_interview(&self, record: InterviewRecord) -> Result<InterviewRecord> {
        self.interviews.lock().insert(record.id, record.clone());
        Ok(record)
    }

    async fn delete_interview(&self, id: Uuid) -> Result<bool> {
        Ok(self.interviews.lock().remove(&id).is_some())
    }
}
