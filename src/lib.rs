//! Metagame matchup matrix
//!
//! Fetches archetype-vs-archetype win/loss records, caches one snapshot per
//! filter combination and projects them into a sortable matrix with Wilson
//! confidence intervals.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod matrix;
pub mod render;
pub mod stats;
pub mod view;

// Re-export commonly used types
pub use config::Config;
pub use error::{Error, Result};
