use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::entitlements::domain::{
    Feature, FeatureId, PackageId, PackageStatus, PostType, ServicePackage, Subscription,
    SubscriptionId, SubscriptionStatus, UsageSnapshot, UserId,
};
use crate::entitlements::{EngineConfig, QuotaCalculator};

pub(super) fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn recruiter() -> UserId {
    UserId("recruiter-42".to_string())
}

pub(super) fn feature(id: u64, post_type: PostType, limit: i64) -> Feature {
    Feature {
        id: FeatureId(id),
        feature_name: format!("{} postings", post_type.label()),
        post_type: Some(post_type),
        job_post_limit: limit,
        description: format!("Publish up to {limit} {post_type} jobs"),
    }
}

pub(super) fn package(features: Vec<Feature>) -> ServicePackage {
    ServicePackage {
        id: PackageId(7),
        name: "Growth".to_string(),
        price: 149.0,
        duration_days: 30,
        features,
        status: PackageStatus::Active,
    }
}

/// Standard, urgent and proposal postings with five of each.
pub(super) fn growth_package() -> ServicePackage {
    package(vec![
        feature(1, PostType::Standard, 5),
        feature(2, PostType::Urgent, 5),
        feature(3, PostType::Proposal, 5),
    ])
}

pub(super) fn subscription_expiring(id: u64, expires_in_days: i64) -> Subscription {
    let expiration_date = now() + Duration::days(expires_in_days);
    Subscription {
        id: SubscriptionId(id),
        user_id: recruiter(),
        service_package: growth_package(),
        purchase_date: expiration_date - Duration::days(30),
        expiration_date,
        status: SubscriptionStatus::Active,
        price_paid: 149.0,
    }
}

pub(super) fn active_subscription() -> Subscription {
    subscription_expiring(100, 10)
}

pub(super) fn usage(counts: &[(PostType, i64)], total: Option<i64>) -> UsageSnapshot {
    UsageSnapshot::new(counts.iter().copied(), total)
}

pub(super) fn calculator() -> QuotaCalculator {
    QuotaCalculator::new(&EngineConfig::default())
}
