//! Gateway around the remote strategic-analysis capability.

mod classify;
mod client;
mod gateway;
mod model;

pub use classify::classify;
pub use client::{decode_reply, AnalysisClient, HttpAnalysisClient};
pub use gateway::{AnalysisGateway, GatewayState};
pub use model::{AnalysisDepth, AnalysisRequest, AnalysisResult, Diagnostics, RemoteFailure};
