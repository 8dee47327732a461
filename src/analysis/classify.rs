//! Maps remote failures onto the error taxonomy.
//!
//! A structured code from the remote wins. Message matching is kept for remotes
//! that only send prose; it will misfire if their wording changes.

use once_cell::sync::Lazy;
use regex::Regex;

use super::model::RemoteFailure;
use crate::error::CoreError;

static RATE_LIMIT_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)rate[\s_-]*limit|too many requests|throttl").expect("rate limit pattern"));
static QUOTA_RX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)credits?\b|quota|payment required|insufficient[\s_-]*funds").expect("quota pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    RateLimit,
    Quota,
}

fn class_from_code(code: &str) -> Option<Class> {
    match code.trim().to_ascii_lowercase().as_str() {
        "rate_limited" | "rate_limit" | "too_many_requests" | "429" => Some(Class::RateLimit),
        "quota_exhausted" | "insufficient_credits" | "payment_required" | "402" => Some(Class::Quota),
        _ => None,
    }
}

fn class_from_message(message: &str) -> Option<Class> {
    if RATE_LIMIT_RX.is_match(message) {
        Some(Class::RateLimit)
    } else if QUOTA_RX.is_match(message) {
        Some(Class::Quota)
    } else {
        None
    }
}

pub fn classify(failure: &RemoteFailure) -> CoreError {
    let class = failure
        .code
        .as_deref()
        .and_then(class_from_code)
        .or_else(|| class_from_message(&failure.message));
    match class {
        Some(Class::RateLimit) => CoreError::rate_limit("rate_limited", failure.message.clone()),
        Some(Class::Quota) => CoreError::quota("quota_exhausted", failure.message.clone()),
        None => CoreError::remote(
            failure.code.clone().unwrap_or_else(|| "remote_error".to_string()),
            failure.message.clone(),
        ),
    }
}
