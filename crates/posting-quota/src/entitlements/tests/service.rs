use std::sync::Arc;

use async_trait::async_trait;

use super::common::*;
use crate::entitlements::domain::{
    PostType, Subscription, SubscriptionId, SubscriptionStatus, UserId,
};
use crate::entitlements::{
    DataSource, DenialReason, EngineConfig, InMemorySubscriptionSource, InMemoryUsageSource,
    PostingDecision, PostingEligibilityService, SourceError, SubscriptionSource, UnknownCause,
};

fn service(
    subscriptions: &InMemorySubscriptionSource,
    usage: &InMemoryUsageSource,
) -> PostingEligibilityService<InMemorySubscriptionSource, InMemoryUsageSource> {
    PostingEligibilityService::new(
        Arc::new(subscriptions.clone()),
        Arc::new(usage.clone()),
        EngineConfig::default(),
    )
}

#[tokio::test]
async fn assess_allows_and_reports_quota() {
    let subscriptions = InMemorySubscriptionSource::with_subscriptions([active_subscription()]);
    let usage_source = InMemoryUsageSource::default();
    usage_source.set(recruiter(), usage(&[(PostType::Standard, 1)], Some(1)));

    let assessment = service(&subscriptions, &usage_source)
        .assess(&recruiter(), PostType::Standard, now())
        .await;

    assert!(assessment.decision.is_allowed());
    let quota = assessment.quota.expect("quota computed");
    assert_eq!(quota.entry(PostType::Standard).expect("standard").remaining, 4);
    assert_eq!(
        assessment.subscription.map(|subscription| subscription.id),
        Some(SubscriptionId(100))
    );
}

#[tokio::test]
async fn assess_denies_users_without_subscriptions() {
    let subscriptions = InMemorySubscriptionSource::default();
    let usage_source = InMemoryUsageSource::default();
    usage_source.fail_with("usage should not be consulted");

    let assessment = service(&subscriptions, &usage_source)
        .assess(&recruiter(), PostType::Urgent, now())
        .await;

    assert_eq!(
        assessment.decision,
        PostingDecision::Denied {
            reason: DenialReason::NoActiveSubscription
        }
    );
    assert!(assessment.quota.is_none());
}

#[tokio::test]
async fn subscription_outage_surfaces_as_unknown() {
    let subscriptions = InMemorySubscriptionSource::with_subscriptions([active_subscription()]);
    subscriptions.fail_with("billing api timed out");
    let usage_source = InMemoryUsageSource::default();

    let assessment = service(&subscriptions, &usage_source)
        .assess(&recruiter(), PostType::Standard, now())
        .await;

    match assessment.decision {
        PostingDecision::Unknown {
            cause: UnknownCause::DataUnavailable { source, message },
        } => {
            assert_eq!(source, DataSource::Subscriptions);
            assert!(message.contains("billing api timed out"));
        }
        other => panic!("expected unknown decision, got {other:?}"),
    }
}

#[tokio::test]
async fn usage_outage_surfaces_as_unknown_for_entitled_types() {
    let subscriptions = InMemorySubscriptionSource::with_subscriptions([active_subscription()]);
    let usage_source = InMemoryUsageSource::default();
    usage_source.fail_with("jobs api unavailable");

    let assessment = service(&subscriptions, &usage_source)
        .assess(&recruiter(), PostType::Proposal, now())
        .await;

    match assessment.decision {
        PostingDecision::Unknown {
            cause: UnknownCause::DataUnavailable { source, message },
        } => {
            assert_eq!(source, DataSource::Usage);
            assert!(message.contains("jobs api unavailable"));
        }
        other => panic!("expected unknown decision, got {other:?}"),
    }
}

#[tokio::test]
async fn usage_outage_does_not_mask_entitlement_denial() {
    let subscriptions = InMemorySubscriptionSource::with_subscriptions([active_subscription()]);
    let usage_source = InMemoryUsageSource::default();
    usage_source.fail_with("jobs api unavailable");

    let assessment = service(&subscriptions, &usage_source)
        .assess(&recruiter(), PostType::Premium, now())
        .await;

    assert_eq!(assessment.decision.code(), "post_type_not_entitled");
}

#[tokio::test]
async fn assess_uses_renewed_subscription_over_expiring_one() {
    let expiring = subscription_expiring(1, 2);
    let mut renewed = subscription_expiring(2, 32);
    renewed.service_package.features = vec![feature(20, PostType::Premium, 2)];
    let mut cancelled = subscription_expiring(3, 365);
    cancelled.status = SubscriptionStatus::Cancelled;
    let subscriptions =
        InMemorySubscriptionSource::with_subscriptions([expiring, renewed, cancelled]);
    let usage_source = InMemoryUsageSource::default();
    let service = service(&subscriptions, &usage_source);

    let premium = service.assess(&recruiter(), PostType::Premium, now()).await;
    assert!(premium.decision.is_allowed());

    let standard = service.assess(&recruiter(), PostType::Standard, now()).await;
    assert_eq!(standard.decision.code(), "post_type_not_entitled");
}

#[tokio::test]
async fn quota_overview_lists_overlapping_subscriptions() {
    let subscriptions = InMemorySubscriptionSource::with_subscriptions([
        subscription_expiring(1, 2),
        subscription_expiring(2, 32),
    ]);
    let usage_source = InMemoryUsageSource::default();
    usage_source.set(recruiter(), usage(&[(PostType::Urgent, 5)], Some(5)));

    let overview = service(&subscriptions, &usage_source)
        .quota_overview(&recruiter(), now())
        .await
        .expect("sources respond")
        .expect("subscription governs");

    assert_eq!(overview.subscription.id, SubscriptionId(2));
    assert_eq!(overview.overlapping, vec![SubscriptionId(1)]);
    assert_eq!(
        overview.report.available_post_types(),
        vec![PostType::Standard, PostType::Proposal]
    );
}

#[tokio::test]
async fn quota_overview_is_none_without_subscription() {
    let subscriptions = InMemorySubscriptionSource::default();
    let usage_source = InMemoryUsageSource::default();

    let overview = service(&subscriptions, &usage_source)
        .quota_overview(&recruiter(), now())
        .await
        .expect("sources respond");

    assert!(overview.is_none());
}

#[tokio::test]
async fn record_job_created_invalidates_usage() {
    let subscriptions = InMemorySubscriptionSource::with_subscriptions([active_subscription()]);
    let usage_source = InMemoryUsageSource::default();
    let service = service(&subscriptions, &usage_source);

    service.record_job_created(&recruiter());

    assert_eq!(usage_source.invalidations(), vec![recruiter()]);
}

struct BorrowedSubscriptions<'a> {
    records: &'a [Subscription],
}

#[async_trait]
impl<'a> SubscriptionSource for BorrowedSubscriptions<'a> {
    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Subscription>, SourceError> {
        Ok(self
            .records
            .iter()
            .filter(|subscription| &subscription.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[tokio::test]
async fn service_accepts_sources_borrowing_local_data() {
    let records = vec![active_subscription()];
    let service = PostingEligibilityService::new(
        Arc::new(BorrowedSubscriptions { records: &records }),
        Arc::new(InMemoryUsageSource::default()),
        EngineConfig::default(),
    );

    let assessment = service.assess(&recruiter(), PostType::Standard, now()).await;

    assert!(assessment.decision.is_allowed());
}
