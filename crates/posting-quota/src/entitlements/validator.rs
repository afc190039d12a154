use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use super::domain::{Feature, PostType, Subscription, SubscriptionStatus};
use super::quota::{PostTypeQuota, QuotaReport};

/// Outcome of a posting pre-check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PostingDecision {
    Allowed {
        feature: Feature,
        quota: PostTypeQuota,
    },
    Denied {
        reason: DenialReason,
    },
    Unknown {
        cause: UnknownCause,
    },
}

impl PostingDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, PostingDecision::Allowed { .. })
    }

    pub fn code(&self) -> &'static str {
        match self {
            PostingDecision::Allowed { .. } => "allowed",
            PostingDecision::Denied { reason } => reason.code(),
            PostingDecision::Unknown { cause } => cause.code(),
        }
    }

    pub fn summary(&self) -> String {
        match self {
            PostingDecision::Allowed { feature, quota } => format!(
                "allowed via '{}': {} of {} {} posting(s) remaining",
                feature.feature_name, quota.remaining, quota.limit, quota.post_type
            ),
            PostingDecision::Denied { reason } => reason.summary(),
            PostingDecision::Unknown { cause } => cause.summary(),
        }
    }
}

/// Business reasons a posting is refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DenialReason {
    NoActiveSubscription,
    SubscriptionInactive {
        status: SubscriptionStatus,
    },
    SubscriptionExpired {
        expired_at: DateTime<Utc>,
    },
    PostTypeNotEntitled {
        post_type: PostType,
    },
    QuotaExhausted {
        post_type: PostType,
        limit: u32,
        used: u32,
    },
}

impl DenialReason {
    pub const fn code(&self) -> &'static str {
        match self {
            DenialReason::NoActiveSubscription => "no_active_subscription",
            DenialReason::SubscriptionInactive { .. } => "subscription_inactive",
            DenialReason::SubscriptionExpired { .. } => "subscription_expired",
            DenialReason::PostTypeNotEntitled { .. } => "post_type_not_entitled",
            DenialReason::QuotaExhausted { .. } => "quota_exhausted",
        }
    }

    pub fn summary(&self) -> String {
        match self {
            DenialReason::NoActiveSubscription => {
                "denied: no active subscription covers job posting".to_string()
            }
            DenialReason::SubscriptionInactive { status } => {
                format!("denied: subscription is {}", status.label())
            }
            DenialReason::SubscriptionExpired { expired_at } => {
                format!("denied: subscription expired at {expired_at}")
            }
            DenialReason::PostTypeNotEntitled { post_type } => {
                format!("denied: package does not include {post_type} postings")
            }
            DenialReason::QuotaExhausted {
                post_type,
                limit,
                used,
            } => format!("denied: {post_type} quota exhausted ({used} of {limit} used)"),
        }
    }
}

/// The collaborator whose data could not be obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    Subscriptions,
    Usage,
}

impl DataSource {
    pub const fn label(self) -> &'static str {
        match self {
            DataSource::Subscriptions => "subscriptions",
            DataSource::Usage => "usage counts",
        }
    }
}

/// Why no decision could be reached. Callers should retry rather than report a denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum UnknownCause {
    DataUnavailable { source: DataSource, message: String },
    InconsistentSnapshot { detail: String },
}

impl UnknownCause {
    pub fn unavailable(source: DataSource, message: impl Into<String>) -> Self {
        UnknownCause::DataUnavailable {
            source,
            message: message.into(),
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            UnknownCause::DataUnavailable { .. } => "data_unavailable",
            UnknownCause::InconsistentSnapshot { .. } => "inconsistent_snapshot",
        }
    }

    pub fn summary(&self) -> String {
        match self {
            UnknownCause::DataUnavailable { source, message } => {
                format!("unknown: {} unavailable ({message})", source.label())
            }
            UnknownCause::InconsistentSnapshot { detail } => {
                format!("unknown: inconsistent snapshot ({detail})")
            }
        }
    }
}

/// Pure admit/deny decision for a requested post type. Never decrements quota.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostingValidator;

impl PostingValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(
        &self,
        subscription: Option<&Subscription>,
        quota: Option<&QuotaReport>,
        post_type: PostType,
        now: DateTime<Utc>,
    ) -> PostingDecision {
        let decision = decide(subscription, quota, post_type, now);
        debug!(
            subscription_id = subscription.map(|subscription| subscription.id.0),
            %post_type,
            decision = decision.code(),
            "validated posting request"
        );
        decision
    }
}

fn decide(
    subscription: Option<&Subscription>,
    quota: Option<&QuotaReport>,
    post_type: PostType,
    now: DateTime<Utc>,
) -> PostingDecision {
    let Some(subscription) = subscription else {
        return denied(DenialReason::NoActiveSubscription);
    };

    if subscription.status != SubscriptionStatus::Active {
        return denied(DenialReason::SubscriptionInactive {
            status: subscription.status,
        });
    }

    if subscription.expiration_date <= now {
        return denied(DenialReason::SubscriptionExpired {
            expired_at: subscription.expiration_date,
        });
    }

    let Some(feature) = subscription.entitled_feature(post_type) else {
        return denied(DenialReason::PostTypeNotEntitled { post_type });
    };

    let Some(quota) = quota else {
        return PostingDecision::Unknown {
            cause: UnknownCause::unavailable(DataSource::Usage, "no usage snapshot supplied"),
        };
    };

    if quota.subscription_id != subscription.id {
        return inconsistent(format!(
            "quota computed for subscription {} but subscription {} governs",
            quota.subscription_id.0, subscription.id.0
        ));
    }

    let Some(entry) = quota.entry(post_type) else {
        return inconsistent(format!(
            "quota report for subscription {} has no {post_type} entry",
            subscription.id.0
        ));
    };

    if entry.remaining == 0 {
        return denied(DenialReason::QuotaExhausted {
            post_type,
            limit: entry.limit,
            used: entry.used,
        });
    }

    PostingDecision::Allowed {
        feature: feature.clone(),
        quota: entry.clone(),
    }
}

fn denied(reason: DenialReason) -> PostingDecision {
    PostingDecision::Denied { reason }
}

fn inconsistent(detail: String) -> PostingDecision {
    PostingDecision::Unknown {
        cause: UnknownCause::InconsistentSnapshot { detail },
    }
}
