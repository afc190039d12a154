use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{SourceError, SubscriptionSource, UsageSource};
use crate::entitlements::domain::{Subscription, UsageSnapshot, UserId};

/// JSON export holding every subscription plus usage counts keyed by user id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotDocument {
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub usage: BTreeMap<String, UsageSnapshot>,
}

/// Read-only source answering both subscription and usage lookups from one export.
#[derive(Debug, Clone, Default)]
pub struct SnapshotSource {
    subscriptions: HashMap<UserId, Vec<Subscription>>,
    usage: HashMap<UserId, UsageSnapshot>,
}

impl SnapshotSource {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        let document: SnapshotDocument = serde_json::from_reader(reader)?;
        Ok(Self::from_document(document))
    }

    pub fn from_document(document: SnapshotDocument) -> Self {
        let mut subscriptions: HashMap<UserId, Vec<Subscription>> = HashMap::new();
        for subscription in document.subscriptions {
            subscriptions
                .entry(subscription.user_id.clone())
                .or_default()
                .push(subscription);
        }

        let usage = document
            .usage
            .into_iter()
            .map(|(user_id, snapshot)| (UserId(user_id), snapshot))
            .collect();

        Self {
            subscriptions,
            usage,
        }
    }

    pub fn users(&self) -> Vec<&UserId> {
        let mut users: Vec<&UserId> = self.subscriptions.keys().chain(self.usage.keys()).collect();
        users.sort();
        users.dedup();
        users
    }
}

#[async_trait]
impl SubscriptionSource for SnapshotSource {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, SourceError> {
        Ok(self.subscriptions.get(user_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl UsageSource for SnapshotSource {
    async fn counts_for_user(&self, user_id: &UserId) -> Result<UsageSnapshot, SourceError> {
        Ok(self.usage.get(user_id).cloned().unwrap_or_default())
    }
}
