use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::classify::classify;
use super::client::AnalysisClient;
use super::model::{AnalysisRequest, AnalysisResult};
use crate::error::{CoreError, CoreResult};

/// Last outcome of the gateway. `result` and `error` are never both set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayState {
    pub busy: bool,
    pub result: Option<AnalysisResult>,
    pub error: Option<CoreError>,
}

#[derive(Default)]
struct Slot {
    result: Option<AnalysisResult>,
    error: Option<CoreError>,
}

/// Decrements the in-flight counter even when the caller drops the future.
struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        InFlight(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) { self.0.fetch_sub(1, Ordering::SeqCst); }
}

/// Validation, classification and result shaping around one remote call.
/// No retries; concurrent calls run independently and the last to finish
/// owns the stored outcome.
pub struct AnalysisGateway {
    client: Arc<dyn AnalysisClient>,
    confidence_min: f64,
    confidence_max: f64,
    in_flight: AtomicUsize,
    slot: Mutex<Slot>,
}

impl AnalysisGateway {
    pub fn new(client: Arc<dyn AnalysisClient>) -> Self {
        Self { client, confidence_min: 0.0, confidence_max: 1.0, in_flight: AtomicUsize::new(0), slot: Mutex::new(Slot::default()) }
    }

    pub fn with_confidence_range(mut self, min: f64, max: f64) -> Self {
        self.confidence_min = min;
        self.confidence_max = max;
        self
    }

    pub async fn analyze(&self, query: &str) -> CoreResult<AnalysisResult> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CoreError::validation("empty_query", "Query cannot be empty"));
        }
        let _busy = InFlight::enter(&self.in_flight);
        let request = AnalysisRequest { query: query.to_string() };
        debug!(target: "stratum::analysis", "analysis.invoke chars={}", query.chars().count());

        let outcome = match self.client.invoke(&request).await {
            Ok(raw) => self.shape(raw),
            Err(failure) => Err(classify(&failure)),
        };

        let mut slot = self.slot.lock();
        match &outcome {
            Ok(result) => {
                info!(
                    target: "stratum::analysis",
                    "analysis.completed depth={:?} confidence={:.2} effects={}",
                    result.diagnostics.analysis_depth, result.diagnostics.confidence, result.diagnostics.secondary_effects.len()
                );
                slot.result = Some(result.clone());
                slot.error = None;
            }
            Err(err) => {
                warn!(target: "stratum::analysis", "analysis.failed kind={:?} code={} msg={}", err.kind(), err.code_str(), err.message());
                slot.error = Some(err.clone());
                slot.result = None;
            }
        }
        outcome
    }

    /// Clear the stored result and error. The busy flag is left alone.
    pub fn reset(&self) {
        let mut slot = self.slot.lock();
        slot.result = None;
        slot.error = None;
    }

    pub fn is_busy(&self) -> bool { self.in_flight.load(Ordering::SeqCst) > 0 }

    pub fn result(&self) -> Option<AnalysisResult> { self.slot.lock().result.clone() }

    pub fn error(&self) -> Option<CoreError> { self.slot.lock().error.clone() }

    pub fn state(&self) -> GatewayState {
        let slot = self.slot.lock();
        GatewayState { busy: self.is_busy(), result: slot.result.clone(), error: slot.error.clone() }
    }

    fn shape(&self, mut raw: AnalysisResult) -> CoreResult<AnalysisResult> {
        let c = raw.diagnostics.confidence;
        if !c.is_finite() {
            return Err(CoreError::remote("malformed_result", "malformed analysis result: confidence is not a number"));
        }
        let clamped = c.max(self.confidence_min).min(self.confidence_max);
        if clamped != c {
            debug!(target: "stratum::analysis", "analysis.confidence_clamped from={} to={}", c, clamped);
        }
        raw.diagnostics.confidence = clamped;
        Ok(raw)
    }
}

#[cfg(test)]
#[path = "gateway_tests.rs"]
mod gateway_tests;
