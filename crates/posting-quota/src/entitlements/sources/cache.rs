use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::{SourceError, UsageSource};
use crate::entitlements::domain::{UsageSnapshot, UserId};

/// Memoises usage snapshots per user until the job-creation workflow invalidates them.
///
/// Failed fetches are not cached.
pub struct CachingUsageSource<S> {
    inner: S,
    cache: Mutex<HashMap<UserId, UsageSnapshot>>,
}

impl<S> CachingUsageSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn cached(&self, user_id: &UserId) -> Option<UsageSnapshot> {
        self.cache
            .lock()
            .ok()
            .and_then(|cache| cache.get(user_id).cloned())
    }
}

#[async_trait]
impl<S> UsageSource for CachingUsageSource<S>
where
    S: UsageSource,
{
    async fn counts_for_user(&self, user_id: &UserId) -> Result<UsageSnapshot, SourceError> {
        if let Some(snapshot) = self.cached(user_id) {
            debug!(user = %user_id, "usage cache hit");
            return Ok(snapshot);
        }

        let snapshot = self.inner.counts_for_user(user_id).await?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(user_id.clone(), snapshot.clone());
        }
        Ok(snapshot)
    }

    fn invalidate(&self, user_id: &UserId) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.remove(user_id);
        }
        self.inner.invalidate(user_id);
    }
}
