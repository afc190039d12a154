use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::config::{AggregateUsagePolicy, EngineConfig};
use super::domain::{clamp_count, FeatureId, PostType, Subscription, SubscriptionId, UsageSnapshot};

/// Remaining allowance for a single post type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostTypeQuota {
    pub post_type: PostType,
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    pub is_available: bool,
    pub feature_ids: Vec<FeatureId>,
}

/// Where the aggregate `total_used` figure was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateSource {
    PerTypeBreakdown,
    ReportedTotal,
}

impl AggregateSource {
    pub const fn label(self) -> &'static str {
        match self {
            Self::PerTypeBreakdown => "per-type breakdown",
            Self::ReportedTotal => "reported total",
        }
    }
}

/// Derived quota view for one subscription and one usage snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotaReport {
    pub subscription_id: SubscriptionId,
    pub entries: Vec<PostTypeQuota>,
    pub total_limit: u32,
    pub total_used: u32,
    pub total_remaining: u32,
    pub aggregate_source: AggregateSource,
    pub usage_consistent: bool,
}

impl QuotaReport {
    pub fn entry(&self, post_type: PostType) -> Option<&PostTypeQuota> {
        self.entries.iter().find(|entry| entry.post_type == post_type)
    }

    /// Presentation order: available types first, then by remaining allowance.
    pub fn sorted_entries(&self) -> Vec<&PostTypeQuota> {
        let mut sorted: Vec<&PostTypeQuota> = self.entries.iter().collect();
        sorted.sort_by(|left, right| {
            right
                .is_available
                .cmp(&left.is_available)
                .then_with(|| right.remaining.cmp(&left.remaining))
                .then_with(|| left.post_type.cmp(&right.post_type))
        });
        sorted
    }

    pub fn available_post_types(&self) -> Vec<PostType> {
        self.sorted_entries()
            .into_iter()
            .filter(|entry| entry.is_available)
            .map(|entry| entry.post_type)
            .collect()
    }
}

/// Stateless calculator turning feature limits and usage counts into a `QuotaReport`.
#[derive(Debug, Clone, Default)]
pub struct QuotaCalculator {
    policy: AggregateUsagePolicy,
}

impl QuotaCalculator {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            policy: config.aggregate_usage,
        }
    }

    pub fn policy(&self) -> AggregateUsagePolicy {
        self.policy
    }

    pub fn calculate(&self, subscription: &Subscription, usage: &UsageSnapshot) -> QuotaReport {
        let mut entries = collect_limits(subscription);

        for entry in &mut entries {
            entry.used = usage.used_for(entry.post_type);
            entry.remaining = entry.limit.saturating_sub(entry.used);
            entry.is_available = entry.remaining > 0;
        }

        let total_limit = entries
            .iter()
            .fold(0u32, |acc, entry| acc.saturating_add(entry.limit));

        let breakdown = usage.breakdown_total();
        let reported = usage.reported_total();
        let usage_consistent = reported.map_or(true, |total| total == breakdown);

        if !usage_consistent {
            warn!(
                subscription_id = subscription.id.0,
                reported_total = reported,
                breakdown_total = breakdown,
                policy = self.policy.label(),
                "usage total disagrees with per-post-type breakdown"
            );
        }

        let (total_used, aggregate_source) = match reported {
            Some(total) if usage_consistent => (total, AggregateSource::ReportedTotal),
            Some(total) if self.policy == AggregateUsagePolicy::ReportedTotal => {
                (total, AggregateSource::ReportedTotal)
            }
            _ => (breakdown, AggregateSource::PerTypeBreakdown),
        };

        let report = QuotaReport {
            subscription_id: subscription.id,
            entries,
            total_limit,
            total_used,
            total_remaining: total_limit.saturating_sub(total_used),
            aggregate_source,
            usage_consistent,
        };

        debug!(
            subscription_id = report.subscription_id.0,
            total_limit = report.total_limit,
            total_used = report.total_used,
            total_remaining = report.total_remaining,
            "calculated posting quota"
        );

        report
    }
}

/// One entry per post type in feature declaration order. Features sharing a post type
/// add their limits together; misconfigured features are skipped.
fn collect_limits(subscription: &Subscription) -> Vec<PostTypeQuota> {
    let mut entries: Vec<PostTypeQuota> = Vec::new();

    for feature in &subscription.service_package.features {
        let post_type = match feature.validate() {
            Ok(post_type) => post_type,
            Err(err) => {
                warn!(
                    subscription_id = subscription.id.0,
                    package_id = subscription.service_package.id.0,
                    error = %err,
                    "skipping invalid feature configuration"
                );
                continue;
            }
        };

        if feature.job_post_limit == 0 {
            continue;
        }

        let limit = clamp_count(feature.job_post_limit);
        match entries.iter_mut().find(|entry| entry.post_type == post_type) {
            Some(entry) => {
                entry.limit = entry.limit.saturating_add(limit);
                entry.feature_ids.push(feature.id);
            }
            None => entries.push(PostTypeQuota {
                post_type,
                limit,
                used: 0,
                remaining: 0,
                is_available: false,
                feature_ids: vec![feature.id],
            }),
        }
    }

    entries
}
