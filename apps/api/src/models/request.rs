use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Subscription level. Bounds which analysis modules a request may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTier {
    Basic,
    Pro,
    Enterprise,
}

impl ServiceTier {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "pro" => Some(Self::Pro),
            "enterprise" => Some(Self::Enterprise),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Pro => "pro",
            Self::Enterprise => "enterprise",
        }
    }
}

/// Per-request knob that filters the tier's module set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Basic,
    Standard,
    Deep,
}

impl AnalysisDepth {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "basic" => Some(Self::Basic),
            "standard" => Some(Self::Standard),
            "deep" => Some(Self::Deep),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Standard => "standard",
            Self::Deep => "deep",
        }
    }
}

/// Request priority, always within 1–10.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "i64")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    /// Requests at or above this level may use reserved limiter slots.
    pub const HIGH: u8 = 8;

    /// Clamps out-of-range input instead of rejecting it.
    pub fn new(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_high(&self) -> bool {
        self.0 >= Self::HIGH
    }
}

impl From<i64> for Priority {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self(5)
    }
}

/// The record under analysis. Known fields are typed; anything else lands in
/// `attributes`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_style: Option<String>,
    /// Declared dimension scores, 0–100.
    #[serde(default)]
    pub dimension_scores: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_work_style: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, Value>,
}

/// Inbound request body as sent by callers. Tier and depth stay strings here so
/// unknown values can be normalized rather than rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    pub subject_record: SubjectRecord,
    #[serde(default)]
    pub business_context: Option<BusinessContext>,
    #[serde(default = "default_level")]
    pub tier: String,
    #[serde(default = "default_level")]
    pub depth: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
}

fn default_level() -> String {
    "basic".to_string()
}

fn default_priority() -> i64 {
    Priority::default().value() as i64
}

impl InboundRequest {
    /// Builds the immutable request. If either tier or depth is unrecognized the
    /// pair falls back to Basic/basic.
    pub fn into_request(self) -> AnalysisRequest {
        let (tier, depth, tier_fallback) =
            match (ServiceTier::parse(&self.tier), AnalysisDepth::parse(&self.depth)) {
                (Some(tier), Some(depth)) => (tier, depth, false),
                _ => {
                    tracing::warn!(
                        tier = %self.tier,
                        depth = %self.depth,
                        "Unrecognized tier/depth, falling back to basic/basic"
                    );
                    (ServiceTier::Basic, AnalysisDepth::Basic, true)
                }
            };

        AnalysisRequest {
            subject: self.subject_record,
            business_context: self.business_context,
            tier,
            depth,
            priority: Priority::new(self.priority),
            tier_fallback,
        }
    }
}

/// One analysis invocation. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest {
    pub subject: SubjectRecord,
    pub business_context: Option<BusinessContext>,
    pub tier: ServiceTier,
    pub depth: AnalysisDepth,
    pub priority: Priority,
    /// Set when the inbound tier/depth was unrecognized and normalized.
    pub tier_fallback: bool,
}

impl AnalysisRequest {
    pub fn new(subject: SubjectRecord, tier: ServiceTier, depth: AnalysisDepth) -> Self {
        Self {
            subject,
            business_context: None,
            tier,
            depth,
            priority: Priority::default(),
            tier_fallback: false,
        }
    }

    #[cfg(test)]
    pub fn with_context(mut self, context: BusinessContext) -> Self {
        self.business_context = Some(context);
        self
    }

    #[cfg(test)]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Lowercased title, description and industry, used for bucket classification.
    pub fn classification_text(&self) -> String {
        [
            self.subject.title.as_deref(),
            self.subject.description.as_deref(),
            self.business_context
                .as_ref()
                .and_then(|c| c.industry.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
    }
}
