//! Package entitlement and job-posting quota engine.
//!
//! `EntitlementResolver`, `QuotaCalculator` and `PostingValidator` are pure functions of
//! already-fetched snapshots. `PostingEligibilityService` wires them to the asynchronous
//! subscription and usage sources in the order the job-creation workflow calls them.

pub mod config;
pub mod domain;
pub mod quota;
pub mod resolver;
pub mod service;
pub mod sources;
pub mod validator;

#[cfg(test)]
mod tests;

pub use config::{AggregateUsagePolicy, EngineConfig};
pub use domain::{
    Feature, FeatureId, InvalidFeatureConfiguration, PackageId, PackageStatus, PostType,
    ServicePackage, Subscription, SubscriptionId, SubscriptionStatus, UnknownPostType,
    UsageSnapshot, UserId,
};
pub use quota::{AggregateSource, PostTypeQuota, QuotaCalculator, QuotaReport};
pub use resolver::EntitlementResolver;
pub use service::{PostingAssessment, PostingEligibilityService, QuotaOverview};
pub use sources::{
    CachingUsageSource, InMemorySubscriptionSource, InMemoryUsageSource, SnapshotDocument,
    SnapshotSource, SourceError, SubscriptionSource, UsageSource,
};
pub use validator::{DataSource, DenialReason, PostingDecision, PostingValidator, UnknownCause};
