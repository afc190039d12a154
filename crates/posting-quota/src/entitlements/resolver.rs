use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::domain::Subscription;

/// Picks the subscription that currently governs posting rights.
///
/// Only subscriptions that are `active` and unexpired at `now` are eligible. Among several
/// eligible subscriptions the latest expiration wins, and equal expirations fall back to
/// the highest subscription id, so the result never depends on input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntitlementResolver;

impl EntitlementResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(
        &self,
        subscriptions: &[Subscription],
        now: DateTime<Utc>,
    ) -> Option<Subscription> {
        let selected = self.candidates(subscriptions, now).into_iter().next().cloned();

        match &selected {
            Some(subscription) => debug!(
                subscription_id = subscription.id.0,
                expires = %subscription.expiration_date,
                "resolved governing subscription"
            ),
            None => debug!(
                considered = subscriptions.len(),
                "no active subscription governs posting"
            ),
        }

        selected
    }

    /// Every governing candidate, highest precedence first.
    pub fn candidates<'a>(
        &self,
        subscriptions: &'a [Subscription],
        now: DateTime<Utc>,
    ) -> Vec<&'a Subscription> {
        let mut candidates: Vec<&Subscription> = subscriptions
            .iter()
            .filter(|subscription| is_eligible(subscription, now))
            .collect();

        candidates.sort_by(|left, right| precedence(right, left));
        candidates
    }
}

fn is_eligible(subscription: &Subscription, now: DateTime<Utc>) -> bool {
    if !subscription.has_valid_window() {
        warn!(
            subscription_id = subscription.id.0,
            purchased = %subscription.purchase_date,
            expires = %subscription.expiration_date,
            "ignoring subscription whose expiration does not follow its purchase"
        );
        return false;
    }

    subscription.is_active_at(now)
}

fn precedence(left: &Subscription, right: &Subscription) -> Ordering {
    left.expiration_date
        .cmp(&right.expiration_date)
        .then_with(|| left.id.cmp(&right.id))
}
