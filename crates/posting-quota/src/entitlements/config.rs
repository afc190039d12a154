use serde::{Deserialize, Serialize};

/// Which figure is authoritative for aggregate usage when the usage source reports a
/// `total` that disagrees with its per-post-type breakdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateUsagePolicy {
    #[default]
    PerTypeBreakdown,
    ReportedTotal,
}

impl AggregateUsagePolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "per_type_breakdown" | "breakdown" => Some(Self::PerTypeBreakdown),
            "reported_total" | "total" => Some(Self::ReportedTotal),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::PerTypeBreakdown => "per_type_breakdown",
            Self::ReportedTotal => "reported_total",
        }
    }
}

/// Tunables for the quota engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub aggregate_usage: AggregateUsagePolicy,
}
