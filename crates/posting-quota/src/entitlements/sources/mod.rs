//! Collaborator boundaries for subscription and usage data.
//!
//! Fetching is asynchronous and owned by the caller's infrastructure; the engine only
//! consumes what these traits return.

mod cache;
mod memory;
mod snapshot;

use async_trait::async_trait;

use super::domain::{Subscription, UsageSnapshot, UserId};

pub use cache::CachingUsageSource;
pub use memory::{InMemorySubscriptionSource, InMemoryUsageSource};
pub use snapshot::{SnapshotDocument, SnapshotSource};

#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, SourceError>;
}

#[async_trait]
pub trait UsageSource: Send + Sync {
    async fn counts_for_user(&self, user_id: &UserId) -> Result<UsageSnapshot, SourceError>;

    /// Drop any cached counts for `user_id` after a job was created.
    fn invalidate(&self, _user_id: &UserId) {}
}

/// Failure to obtain data from a collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("source unavailable: {0}")]
    Unavailable(String),
    #[error("malformed source data: {0}")]
    Malformed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for SourceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Malformed(value.to_string())
    }
}
