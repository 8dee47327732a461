use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Surface,
    Tactical,
    Structural,
    Systemic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub confidence: f64,
    pub analysis_depth: AnalysisDepth,
    /// Ordered as produced by the remote engine.
    #[serde(default)]
    pub secondary_effects: Vec<String>,
}

/// One answer from the remote analysis capability. Not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub signal: String,
    pub constraint: String,
    pub structural_risk: String,
    pub strategic_vector: String,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub query: String,
}

/// Failure reported by the remote side, before classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFailure {
    #[serde(rename = "error")]
    pub message: String,
    /// Structured code when the remote provides one (`rate_limited`, `quota_exhausted`, ...).
    #[serde(default)]
    pub code: Option<String>,
}

impl RemoteFailure {
    pub fn new(message: impl Into<String>) -> Self { Self { message: message.into(), code: None } }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}
