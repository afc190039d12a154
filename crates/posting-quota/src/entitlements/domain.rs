use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

/// Identifier wrapper for purchased subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FeatureId(pub u64);

/// Recruiter account owning subscriptions and job postings.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job listing category with an independent posting quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Standard,
    Urgent,
    Premium,
    Proposal,
}

impl PostType {
    pub const fn ordered() -> [Self; 4] {
        [Self::Standard, Self::Urgent, Self::Premium, Self::Proposal]
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Urgent => "urgent",
            Self::Premium => "premium",
            Self::Proposal => "proposal",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Urgent => "Urgent",
            Self::Premium => "Premium",
            Self::Proposal => "Proposal",
        }
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown post type '{0}' (expected standard, urgent, premium or proposal)")]
pub struct UnknownPostType(pub String);

impl FromStr for PostType {
    type Err = UnknownPostType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .find(|post_type| post_type.as_str() == normalized)
            .ok_or_else(|| UnknownPostType(value.to_string()))
    }
}

/// Unrecognised post types become `None` so the feature is reported as misconfigured
/// instead of failing the whole package.
fn lenient_post_type<'de, D>(deserializer: D) -> Result<Option<PostType>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.parse().ok()))
}

/// A named entitlement granting a number of postings for one post type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub id: FeatureId,
    pub feature_name: String,
    #[serde(default, deserialize_with = "lenient_post_type")]
    pub post_type: Option<PostType>,
    pub job_post_limit: i64,
    #[serde(default)]
    pub description: String,
}

/// Reasons a feature cannot contribute to a quota.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidFeatureConfiguration {
    #[error("feature {} has no recognised post type", .feature_id.0)]
    MissingPostType { feature_id: FeatureId },
    #[error("feature {} declares a negative job post limit ({limit})", .feature_id.0)]
    NegativeLimit { feature_id: FeatureId, limit: i64 },
}

impl Feature {
    /// Returns the post type this feature governs, provided it is well formed.
    pub fn validate(&self) -> Result<PostType, InvalidFeatureConfiguration> {
        let post_type = self
            .post_type
            .ok_or(InvalidFeatureConfiguration::MissingPostType {
                feature_id: self.id,
            })?;

        if self.job_post_limit < 0 {
            return Err(InvalidFeatureConfiguration::NegativeLimit {
                feature_id: self.id,
                limit: self.job_post_limit,
            });
        }

        Ok(post_type)
    }

    pub fn grants(&self, post_type: PostType) -> bool {
        self.post_type == Some(post_type) && self.job_post_limit > 0
    }
}

/// Catalog availability. Matched case-insensitively; unrecognised values are `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageStatus {
    Active,
    Inactive,
    Unknown,
}

impl PackageStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "inactive" => Self::Inactive,
            _ => Self::Unknown,
        }
    }
}

impl<'de> Deserialize<'de> for PackageStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Catalog offering bundling one or more features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicePackage {
    pub id: PackageId,
    pub name: String,
    pub price: f64,
    pub duration_days: u32,
    #[serde(default)]
    pub features: Vec<Feature>,
    pub status: PackageStatus,
}

/// Lifecycle status of a purchased subscription. Matched case-insensitively like post
/// types; anything unrecognised is `Unknown` and never counts as active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Expired,
    Cancelled,
    Unknown,
}

impl<'de> Deserialize<'de> for SubscriptionStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

impl SubscriptionStatus {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "active" => Self::Active,
            "expired" => Self::Expired,
            "cancelled" | "canceled" => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }
}

/// A purchased instance of a service package with its own validity window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub service_package: ServicePackage,
    pub purchase_date: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub status: SubscriptionStatus,
    pub price_paid: f64,
}

impl Subscription {
    pub fn has_valid_window(&self) -> bool {
        self.expiration_date > self.purchase_date
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.expiration_date > now
    }

    pub fn days_remaining(&self, now: DateTime<Utc>) -> i64 {
        (self.expiration_date - now).num_days().max(0)
    }

    /// First well-formed feature granting at least one posting of `post_type`.
    pub fn entitled_feature(&self, post_type: PostType) -> Option<&Feature> {
        self.service_package
            .features
            .iter()
            .find(|feature| feature.grants(post_type))
    }
}

/// Jobs already created by a user, as of the moment the counts were fetched.
///
/// Counts are signed so that malformed negative values coming from the usage source can
/// be represented and clamped rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSnapshot {
    #[serde(default)]
    pub total: Option<i64>,
    #[serde(default, deserialize_with = "lenient_usage_counts")]
    pub by_post_type: BTreeMap<PostType, i64>,
}

/// Keys are parsed like feature post types. Counts under unrecognised keys are dropped
/// with a warning, so they never reach the breakdown total.
fn lenient_usage_counts<'de, D>(deserializer: D) -> Result<BTreeMap<PostType, i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, i64>>::deserialize(deserializer)?.unwrap_or_default();
    let mut counts = BTreeMap::new();

    for (key, count) in raw {
        match key.parse::<PostType>() {
            Ok(post_type) => {
                let entry = counts.entry(post_type).or_insert(0i64);
                *entry = entry.saturating_add(count);
            }
            Err(err) => warn!(key = %key, count, error = %err, "ignoring usage count"),
        }
    }

    Ok(counts)
}

impl UsageSnapshot {
    pub fn new<I>(counts: I, total: Option<i64>) -> Self
    where
        I: IntoIterator<Item = (PostType, i64)>,
    {
        Self {
            total,
            by_post_type: counts.into_iter().collect(),
        }
    }

    pub fn used_for(&self, post_type: PostType) -> u32 {
        self.by_post_type
            .get(&post_type)
            .copied()
            .map(clamp_count)
            .unwrap_or(0)
    }

    pub fn breakdown_total(&self) -> u32 {
        self.by_post_type
            .values()
            .fold(0u32, |acc, count| acc.saturating_add(clamp_count(*count)))
    }

    pub fn reported_total(&self) -> Option<u32> {
        self.total.map(clamp_count)
    }
}

pub(crate) fn clamp_count(value: i64) -> u32 {
    u32::try_from(value.max(0)).unwrap_or(u32::MAX)
}
