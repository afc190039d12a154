use chrono::Duration;

use super::common::*;
use crate::entitlements::domain::{PostType, SubscriptionId, SubscriptionStatus};
use crate::entitlements::{
    DataSource, DenialReason, PostingDecision, PostingValidator, UnknownCause,
};

#[test]
fn allows_when_quota_remains() {
    let subscription = active_subscription();
    let report =
        calculator().calculate(&subscription, &usage(&[(PostType::Urgent, 2)], Some(2)));

    let decision = PostingValidator::new().validate(
        Some(&subscription),
        Some(&report),
        PostType::Urgent,
        now(),
    );

    match decision {
        PostingDecision::Allowed { feature, quota } => {
            assert_eq!(feature.post_type, Some(PostType::Urgent));
            assert_eq!(quota.limit, 5);
            assert_eq!(quota.remaining, 3);
        }
        other => panic!("expected allowed decision, got {other:?}"),
    }
}

#[test]
fn denies_without_subscription() {
    let decision = PostingValidator::new().validate(None, None, PostType::Standard, now());

    assert_eq!(
        decision,
        PostingDecision::Denied {
            reason: DenialReason::NoActiveSubscription
        }
    );
}

#[test]
fn denies_inactive_subscription_before_checking_expiry() {
    let mut subscription = subscription_expiring(1, -5);
    subscription.status = SubscriptionStatus::Cancelled;

    let decision =
        PostingValidator::new().validate(Some(&subscription), None, PostType::Standard, now());

    match decision {
        PostingDecision::Denied {
            reason: DenialReason::SubscriptionInactive { status },
        } => assert_eq!(status, SubscriptionStatus::Cancelled),
        other => panic!("expected inactive denial, got {other:?}"),
    }
}

#[test]
fn denies_expired_subscription_even_with_quota() {
    let mut subscription = active_subscription();
    subscription.expiration_date = now();
    let report = calculator().calculate(&subscription, &usage(&[], Some(0)));

    let decision = PostingValidator::new().validate(
        Some(&subscription),
        Some(&report),
        PostType::Standard,
        now(),
    );

    assert_eq!(decision.code(), "subscription_expired");
    assert!(!decision.is_allowed());
}

#[test]
fn denies_post_type_outside_package_even_with_capacity() {
    let subscription = active_subscription();
    let report = calculator().calculate(&subscription, &usage(&[], Some(0)));
    assert!(report.total_remaining > 0);

    let decision = PostingValidator::new().validate(
        Some(&subscription),
        Some(&report),
        PostType::Premium,
        now(),
    );

    assert_eq!(
        decision,
        PostingDecision::Denied {
            reason: DenialReason::PostTypeNotEntitled {
                post_type: PostType::Premium
            }
        }
    );
}

#[test]
fn denies_exhausted_quota() {
    let subscription = active_subscription();
    let report =
        calculator().calculate(&subscription, &usage(&[(PostType::Standard, 6)], Some(6)));

    let decision = PostingValidator::new().validate(
        Some(&subscription),
        Some(&report),
        PostType::Standard,
        now(),
    );

    match decision {
        PostingDecision::Denied {
            reason:
                DenialReason::QuotaExhausted {
                    post_type,
                    limit,
                    used,
                },
        } => {
            assert_eq!(post_type, PostType::Standard);
            assert_eq!(limit, 5);
            assert_eq!(used, 6);
        }
        other => panic!("expected exhausted quota, got {other:?}"),
    }
}

#[test]
fn missing_quota_is_unknown_not_denied() {
    let subscription = active_subscription();

    let decision =
        PostingValidator::new().validate(Some(&subscription), None, PostType::Standard, now());

    match decision {
        PostingDecision::Unknown {
            cause: UnknownCause::DataUnavailable { source, .. },
        } => assert_eq!(source, DataSource::Usage),
        other => panic!("expected unknown decision, got {other:?}"),
    }
}

#[test]
fn quota_for_another_subscription_is_inconsistent() {
    let subscription = active_subscription();
    let mut report = calculator().calculate(&subscription, &usage(&[], None));
    report.subscription_id = SubscriptionId(999);

    let decision = PostingValidator::new().validate(
        Some(&subscription),
        Some(&report),
        PostType::Standard,
        now(),
    );

    assert_eq!(decision.code(), "inconsistent_snapshot");
}

#[test]
fn allowed_for_every_unused_feature() {
    let validator = PostingValidator::new();
    let subscription = subscription_expiring(5, 1);
    let later = now() + Duration::hours(23);

    for used in 0..5 {
        let report = calculator().calculate(
            &subscription,
            &usage(&[(PostType::Proposal, used)], Some(used)),
        );
        let decision =
            validator.validate(Some(&subscription), Some(&report), PostType::Proposal, later);
        assert!(decision.is_allowed(), "used {used} of 5 should be allowed");
    }
}

#[test]
fn summaries_are_human_readable() {
    let subscription = active_subscription();
    let report =
        calculator().calculate(&subscription, &usage(&[(PostType::Standard, 5)], Some(5)));
    let validator = PostingValidator::new();

    let exhausted =
        validator.validate(Some(&subscription), Some(&report), PostType::Standard, now());
    assert!(exhausted.summary().contains("5 of 5 used"));

    let allowed = validator.validate(Some(&subscription), Some(&report), PostType::Urgent, now());
    assert!(allowed.summary().contains("5 of 5 urgent"));
}
