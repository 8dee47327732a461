//!
//! Core configuration
//! ------------------
//! Defaults, optional overrides layered on top, and loaders for the
//! environment (`STRATUM_*`) and JSON override files.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: u64,
    pub confidence_min: f64,
    pub confidence_max: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self { endpoint: None, api_key: None, timeout_ms: 60_000, confidence_min: 0.0, confidence_max: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    pub audit_default_limit: usize,
    /// Larger list requests are clamped to this.
    pub audit_max_limit: usize,
    /// 0 disables the query cache.
    pub cache_ttl_ms: u64,
    pub badge_cap: usize,
    pub analysis: AnalysisConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            audit_default_limit: 100,
            audit_max_limit: 1000,
            cache_ttl_ms: 30_000,
            badge_cap: 9,
            analysis: AnalysisConfig::default(),
        }
    }
}

/// Unspecified values inherit from the base layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct CoreConfigOverrides {
    pub audit_default_limit: Option<usize>,
    pub audit_max_limit: Option<usize>,
    pub cache_ttl_ms: Option<u64>,
    pub badge_cap: Option<usize>,
    pub analysis_endpoint: Option<String>,
    pub analysis_api_key: Option<String>,
    pub analysis_timeout_ms: Option<u64>,
    pub confidence_min: Option<f64>,
    pub confidence_max: Option<f64>,
}

fn parse_env<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    let raw = lookup(name)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(target: "stratum::config", "ignoring {}={:?}: not a valid value", name, raw);
            None
        }
    }
}

fn string_env(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl CoreConfigOverrides {
    /// Build overrides from a variable lookup. Unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            audit_default_limit: parse_env(&lookup, "STRATUM_AUDIT_DEFAULT_LIMIT"),
            audit_max_limit: parse_env(&lookup, "STRATUM_AUDIT_MAX_LIMIT"),
            cache_ttl_ms: parse_env(&lookup, "STRATUM_CACHE_TTL_MS"),
            badge_cap: parse_env(&lookup, "STRATUM_BADGE_CAP"),
            analysis_endpoint: string_env(&lookup, "STRATUM_ANALYSIS_ENDPOINT"),
            analysis_api_key: string_env(&lookup, "STRATUM_ANALYSIS_API_KEY"),
            analysis_timeout_ms: parse_env(&lookup, "STRATUM_ANALYSIS_TIMEOUT_MS"),
            confidence_min: parse_env(&lookup, "STRATUM_CONFIDENCE_MIN"),
            confidence_max: parse_env(&lookup, "STRATUM_CONFIDENCE_MAX"),
        }
    }

    pub fn from_env() -> Self { Self::from_lookup(|name| std::env::var(name).ok()) }
}

impl CoreConfig {
    pub fn from_layers(base: &CoreConfig, ov: &CoreConfigOverrides) -> CoreResult<Self> {
        let cfg = Self {
            audit_default_limit: ov.audit_default_limit.unwrap_or(base.audit_default_limit),
            audit_max_limit: ov.audit_max_limit.unwrap_or(base.audit_max_limit),
            cache_ttl_ms: ov.cache_ttl_ms.unwrap_or(base.cache_ttl_ms),
            badge_cap: ov.badge_cap.unwrap_or(base.badge_cap),
            analysis: AnalysisConfig {
                endpoint: ov.analysis_endpoint.clone().or_else(|| base.analysis.endpoint.clone()),
                api_key: ov.analysis_api_key.clone().or_else(|| base.analysis.api_key.clone()),
                timeout_ms: ov.analysis_timeout_ms.unwrap_or(base.analysis.timeout_ms),
                confidence_min: ov.confidence_min.unwrap_or(base.analysis.confidence_min),
                confidence_max: ov.confidence_max.unwrap_or(base.analysis.confidence_max),
            },
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.audit_default_limit == 0 || self.audit_max_limit == 0 {
            return Err(CoreError::config("invalid_limit", "audit limits must be at least 1"));
        }
        if self.audit_default_limit > self.audit_max_limit {
            return Err(CoreError::config(
                "invalid_limit",
                format!("audit default limit {} exceeds max {}", self.audit_default_limit, self.audit_max_limit),
            ));
        }
        if self.badge_cap == 0 {
            return Err(CoreError::config("invalid_badge_cap", "badge cap must be at least 1"));
        }
        let (min, max) = (self.analysis.confidence_min, self.analysis.confidence_max);
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(CoreError::config(
                "invalid_confidence_range",
                format!("confidence range [{}, {}] is not valid", min, max),
            ));
        }
        if self.analysis.timeout_ms == 0 {
            return Err(CoreError::config("invalid_timeout", "analysis timeout must be positive"));
        }
        Ok(())
    }

    /// Defaults with `STRATUM_*` environment overrides applied.
    pub fn from_env() -> CoreResult<Self> { Self::from_layers(&Self::default(), &CoreConfigOverrides::from_env()) }

    /// Defaults with overrides read from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let ov: CoreConfigOverrides =
            serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))?;
        Ok(Self::from_layers(&Self::default(), &ov)?)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
