use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{SourceError, SubscriptionSource, UsageSource};
use crate::entitlements::domain::{PostType, Subscription, UsageSnapshot, UserId};

/// Subscription source backed by a shared map, with an optional forced outage.
#[derive(Default, Clone)]
pub struct InMemorySubscriptionSource {
    records: Arc<Mutex<HashMap<UserId, Vec<Subscription>>>>,
    outage: Arc<Mutex<Option<String>>>,
}

impl InMemorySubscriptionSource {
    pub fn with_subscriptions(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let source = Self::default();
        for subscription in subscriptions {
            source.insert(subscription);
        }
        source
    }

    pub fn insert(&self, subscription: Subscription) {
        if let Ok(mut records) = self.records.lock() {
            records
                .entry(subscription.user_id.clone())
                .or_default()
                .push(subscription);
        }
    }

    /// Every subsequent fetch fails with `message` until `restore` is called.
    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut outage) = self.outage.lock() {
            *outage = Some(message.into());
        }
    }

    pub fn restore(&self) {
        if let Ok(mut outage) = self.outage.lock() {
            *outage = None;
        }
    }
}

#[async_trait]
impl SubscriptionSource for InMemorySubscriptionSource {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, SourceError> {
        check_outage(&self.outage)?;
        let records = self
            .records
            .lock()
            .map_err(|_| SourceError::Unavailable("subscription store poisoned".to_string()))?;
        Ok(records.get(user_id).cloned().unwrap_or_default())
    }
}

/// Usage source that also plays the authoritative job counter in demos and tests.
#[derive(Default, Clone)]
pub struct InMemoryUsageSource {
    counts: Arc<Mutex<HashMap<UserId, UsageSnapshot>>>,
    outage: Arc<Mutex<Option<String>>>,
    invalidations: Arc<Mutex<Vec<UserId>>>,
}

impl InMemoryUsageSource {
    pub fn set(&self, user_id: UserId, snapshot: UsageSnapshot) {
        if let Ok(mut counts) = self.counts.lock() {
            counts.insert(user_id, snapshot);
        }
    }

    /// Count a created job against `post_type`, keeping the reported total in step.
    pub fn record_job(&self, user_id: &UserId, post_type: PostType) {
        if let Ok(mut counts) = self.counts.lock() {
            let snapshot = counts.entry(user_id.clone()).or_default();
            *snapshot.by_post_type.entry(post_type).or_insert(0) += 1;
            snapshot.total = Some(snapshot.total.unwrap_or(0) + 1);
        }
    }

    pub fn fail_with(&self, message: impl Into<String>) {
        if let Ok(mut outage) = self.outage.lock() {
            *outage = Some(message.into());
        }
    }

    pub fn restore(&self) {
        if let Ok(mut outage) = self.outage.lock() {
            *outage = None;
        }
    }

    pub fn invalidations(&self) -> Vec<UserId> {
        self.invalidations
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl UsageSource for InMemoryUsageSource {
    async fn counts_for_user(&self, user_id: &UserId) -> Result<UsageSnapshot, SourceError> {
        check_outage(&self.outage)?;
        let counts = self
            .counts
            .lock()
            .map_err(|_| SourceError::Unavailable("usage store poisoned".to_string()))?;
        Ok(counts.get(user_id).cloned().unwrap_or_default())
    }

    fn invalidate(&self, user_id: &UserId) {
        if let Ok(mut events) = self.invalidations.lock() {
            events.push(user_id.clone());
        }
    }
}

fn check_outage(outage: &Mutex<Option<String>>) -> Result<(), SourceError> {
    let outage = outage
        .lock()
        .map_err(|_| SourceError::Unavailable("outage flag poisoned".to_string()))?;
    match outage.as_ref() {
        Some(message) => Err(SourceError::Unavailable(message.clone())),
        None => Ok(()),
    }
}
