//! Upstream matchup data API

pub mod client;
pub mod retry;
pub mod wire;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{build_client, AnalysisClient, LegacyClient, MatchupApi};
pub use retry::RetryPolicy;
pub use wire::MatrixPayload;
