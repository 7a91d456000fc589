//! Persistence layer for users and interview records: trait seams, the
//! Postgres-backed store used in production and an in-memory store for tests.

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::{InterviewRecord, InterviewUpdate, TranscriptEntry, User};
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert_user(&self, user: User) -> Result<User>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
}

#[async_trait]
pub trait InterviewStore: Send + Sync {
    async fn insert_interview(&self, record: InterviewRecord) -> Result<InterviewRecord>;
    async fn find_interview(&self, id: Uuid) -> Result<Option<InterviewRecord>>;
    /// The owner's records, newest-first by creation time.
    async fn list_interviews(&self, owner_id: Uuid, offset: u64, limit: u64) -> Result<Vec<InterviewRecord>>;
    async fn count_interviews(&self, owner_id: Uuid) -> Result<u64>;
    /// Replaces the mutable fields of an existing record.
    async fn replace_interview(&self, record: InterviewRecord) -> Result<InterviewRecord>;
    /// Returns false when the id did not resolve.
    async fn delete_interview(&self, id: Uuid) -> Result<bool>;
}

/// Everything the REST handlers need from persistence.
pub trait Store: UserStore + InterviewStore {}

impl<T: UserStore + InterviewStore> Store for T {}
