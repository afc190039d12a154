use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::config::EngineConfig;
use super::domain::{PostType, Subscription, SubscriptionId, UserId};
use super::quota::{QuotaCalculator, QuotaReport};
use super::resolver::EntitlementResolver;
use super::sources::{SourceError, SubscriptionSource, UsageSource};
use super::validator::{DataSource, PostingDecision, PostingValidator, UnknownCause};

/// Everything the job-creation workflow needs to gate the publish action.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingAssessment {
    pub user_id: UserId,
    pub post_type: PostType,
    pub evaluated_at: DateTime<Utc>,
    pub decision: PostingDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaReport>,
}

/// Governing subscription and its quota, for rendering selectable post types.
#[derive(Debug, Clone, Serialize)]
pub struct QuotaOverview {
    pub subscription: Subscription,
    pub overlapping: Vec<SubscriptionId>,
    pub report: QuotaReport,
}

/// Service composing the collaborator sources with the resolver, calculator and validator.
///
/// The check is advisory. Two requests validated against the same stale usage snapshot can
/// both be allowed, so the backend must still enforce limits atomically at creation time.
pub struct PostingEligibilityService<S, U> {
    subscriptions: Arc<S>,
    usage: Arc<U>,
    resolver: EntitlementResolver,
    calculator: QuotaCalculator,
    validator: PostingValidator,
}

impl<S, U> PostingEligibilityService<S, U>
where
    S: SubscriptionSource,
    U: UsageSource,
{
    pub fn new(subscriptions: Arc<S>, usage: Arc<U>, config: EngineConfig) -> Self {
        Self {
            subscriptions,
            usage,
            resolver: EntitlementResolver::new(),
            calculator: QuotaCalculator::new(&config),
            validator: PostingValidator::new(),
        }
    }

    /// Decide whether `user_id` may publish a job of `post_type` right now.
    pub async fn assess(
        &self,
        user_id: &UserId,
        post_type: PostType,
        now: DateTime<Utc>,
    ) -> PostingAssessment {
        let assessment = |decision: PostingDecision,
                          subscription: Option<Subscription>,
                          quota: Option<QuotaReport>| PostingAssessment {
            user_id: user_id.clone(),
            post_type,
            evaluated_at: now,
            decision,
            subscription,
            quota,
        };

        let subscriptions = match self.subscriptions.list_for_user(user_id).await {
            Ok(subscriptions) => subscriptions,
            Err(err) => {
                warn!(user = %user_id, error = %err, "subscription fetch failed");
                let cause = UnknownCause::unavailable(DataSource::Subscriptions, err.to_string());
                return assessment(PostingDecision::Unknown { cause }, None, None);
            }
        };

        let subscription = self.resolver.resolve(&subscriptions, now);

        let mut usage_failure = None;
        let quota = match &subscription {
            Some(governing) => match self.usage.counts_for_user(user_id).await {
                Ok(usage) => Some(self.calculator.calculate(governing, &usage)),
                Err(err) => {
                    warn!(user = %user_id, error = %err, "usage fetch failed");
                    usage_failure = Some(err);
                    None
                }
            },
            None => None,
        };

        let decision =
            self.validator
                .validate(subscription.as_ref(), quota.as_ref(), post_type, now);

        let decision = match (decision, usage_failure) {
            (
                PostingDecision::Unknown {
                    cause:
                        UnknownCause::DataUnavailable {
                            source: DataSource::Usage,
                            ..
                        },
                },
                Some(err),
            ) => PostingDecision::Unknown {
                cause: UnknownCause::unavailable(DataSource::Usage, err.to_string()),
            },
            (decision, _) => decision,
        };

        info!(
            user = %user_id,
            %post_type,
            decision = decision.code(),
            "posting eligibility assessed"
        );

        assessment(decision, subscription, quota)
    }

    /// Quota for the governing subscription, or `None` when nothing governs.
    pub async fn quota_overview(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<QuotaOverview>, SourceError> {
        let subscriptions = self.subscriptions.list_for_user(user_id).await?;
        let candidates = self.resolver.candidates(&subscriptions, now);

        let Some(governing) = candidates.first().copied().cloned() else {
            return Ok(None);
        };

        let overlapping = candidates
            .iter()
            .skip(1)
            .map(|subscription| subscription.id)
            .collect();

        let usage = self.usage.counts_for_user(user_id).await?;
        let report = self.calculator.calculate(&governing, &usage);

        Ok(Some(QuotaOverview {
            subscription: governing,
            overlapping,
            report,
        }))
    }

    /// Called once the backend confirmed a job was created, so the next check sees fresh
    /// usage counts.
    pub fn record_job_created(&self, user_id: &UserId) {
        info!(user = %user_id, "job created; invalidating usage snapshot");
        self.usage.invalidate(user_id);
    }
}
