use super::*;
use crate::analysis::{AnalysisDepth, Diagnostics, RemoteFailure};
use crate::error::ErrorKind;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Notify;

/// Replies keyed by query; a query with a gate waits until the gate is notified.
#[derive(Default)]
struct ScriptedClient {
    calls: AtomicUsize,
    replies: Mutex<HashMap<String, Result<AnalysisResult, RemoteFailure>>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl ScriptedClient {
    fn reply(self, query: &str, r: Result<AnalysisResult, RemoteFailure>) -> Self {
        self.replies.lock().insert(query.to_string(), r);
        self
    }

    fn gate(&self, query: &str) -> Arc<Notify> {
        self.gates.lock().entry(query.to_string()).or_insert_with(|| Arc::new(Notify::new())).clone()
    }

    fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl AnalysisClient for ScriptedClient {
    async fn invoke(&self, request: &AnalysisRequest) -> Result<AnalysisResult, RemoteFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().get(&request.query).cloned();
        if let Some(g) = gate {
            g.notified().await;
        }
        self.replies
            .lock()
            .get(&request.query)
            .cloned()
            .unwrap_or_else(|| Err(RemoteFailure::new(format!("no scripted reply for '{}'", request.query))))
    }
}

fn sample(signal: &str, confidence: f64) -> AnalysisResult {
    AnalysisResult {
        signal: signal.to_string(),
        constraint: "capacity".into(),
        structural_risk: "moderate".into(),
        strategic_vector: "consolidate".into(),
        diagnostics: Diagnostics { confidence, analysis_depth: AnalysisDepth::Tactical, secondary_effects: vec!["churn".into()] },
    }
}

#[tokio::test]
async fn blank_queries_fail_validation_without_remote_call() {
    let client = Arc::new(ScriptedClient::default());
    let gw = AnalysisGateway::new(client.clone());
    for q in ["", "   ", "\n\t"] {
        let err = gw.analyze(q).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.user_message(), "Query cannot be empty");
    }
    assert_eq!(client.calls(), 0);
    assert_eq!(gw.state(), GatewayState::default());
}

#[tokio::test]
async fn success_stores_result_and_clears_error() {
    let client = Arc::new(
        ScriptedClient::default()
            .reply("bad", Err(RemoteFailure::new("engine exploded")))
            .reply("good", Ok(sample("ok", 0.8))),
    );
    let gw = AnalysisGateway::new(client.clone());

    let err = gw.analyze("bad").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(gw.error().map(|e| e.message().to_string()).as_deref(), Some("engine exploded"));
    assert!(gw.result().is_none());

    let r = gw.analyze("  good  ").await.unwrap();
    assert_eq!(r.signal, "ok");
    let st = gw.state();
    assert!(!st.busy);
    assert_eq!(st.result.as_ref().map(|r| r.signal.as_str()), Some("ok"));
    assert!(st.error.is_none());

    gw.analyze("bad").await.unwrap_err();
    assert!(gw.result().is_none(), "a failure replaces the previous result");
    assert_eq!(client.calls(), 3, "exactly one remote call per analyze, no retries");
}

#[tokio::test]
async fn remote_failures_are_classified() {
    let client = Arc::new(
        ScriptedClient::default()
            .reply("a", Err(RemoteFailure::new("Rate limit exceeded")))
            .reply("b", Err(RemoteFailure::new("AI credits exhausted")))
            .reply("c", Err(RemoteFailure::new("x").with_code("rate_limited"))),
    );
    let gw = AnalysisGateway::new(client);
    assert_eq!(gw.analyze("a").await.unwrap_err().kind(), ErrorKind::RateLimit);
    assert_eq!(gw.analyze("b").await.unwrap_err().kind(), ErrorKind::Quota);
    assert_eq!(gw.analyze("c").await.unwrap_err().kind(), ErrorKind::RateLimit);
}

#[tokio::test]
async fn confidence_is_clamped_and_nan_rejected() {
    let client = Arc::new(
        ScriptedClient::default()
            .reply("hi", Ok(sample("hi", 1.7)))
            .reply("nan", Ok(sample("nan", f64::NAN))),
    );
    let gw = AnalysisGateway::new(client);
    assert_eq!(gw.analyze("hi").await.unwrap().diagnostics.confidence, 1.0);
    let err = gw.analyze("nan").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Remote);
    assert_eq!(err.code_str(), "malformed_result");
}

#[tokio::test]
async fn busy_only_while_outstanding_and_reset_keeps_it() {
    let client = Arc::new(ScriptedClient::default().reply("slow", Ok(sample("slow", 0.5))));
    let gate = client.gate("slow");
    let gw = Arc::new(AnalysisGateway::new(client.clone()));
    assert!(!gw.is_busy());

    let task = {
        let gw = gw.clone();
        tokio::spawn(async move { gw.analyze("slow").await })
    };
    while client.calls() < 1 {
        tokio::task::yield_now().await;
    }
    assert!(gw.is_busy());
    gw.reset();
    assert!(gw.is_busy());

    gate.notify_one();
    task.await.unwrap().unwrap();
    assert!(!gw.is_busy());
    assert!(gw.result().is_some());

    gw.reset();
    assert_eq!(gw.state(), GatewayState::default());
}

#[tokio::test]
async fn concurrent_calls_last_to_resolve_wins() {
    let client = Arc::new(
        ScriptedClient::default()
            .reply("first", Err(RemoteFailure::new("timeout talking to engine")))
            .reply("second", Ok(sample("second", 0.4))),
    );
    let g1 = client.gate("first");
    let g2 = client.gate("second");
    let gw = Arc::new(AnalysisGateway::new(client.clone()));

    let h1 = { let gw = gw.clone(); tokio::spawn(async move { gw.analyze("first").await }) };
    let h2 = { let gw = gw.clone(); tokio::spawn(async move { gw.analyze("second").await }) };
    while client.calls() < 2 {
        tokio::task::yield_now().await;
    }

    g2.notify_one();
    assert!(h2.await.unwrap().is_ok());
    assert!(gw.is_busy(), "first call still outstanding");
    assert!(gw.result().is_some());

    g1.notify_one();
    assert!(h1.await.unwrap().is_err());
    let st = gw.state();
    assert!(!st.busy);
    assert!(st.result.is_none());
    assert_eq!(st.error.map(|e| e.kind()), Some(ErrorKind::Remote));
}
