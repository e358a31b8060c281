//! Win-rate statistics
//!
//! Pure functions over matchup counts: confidence intervals for single
//! cells and aggregate records per archetype.

pub mod aggregate;
pub mod confidence;

pub use aggregate::{filtered_aggregate, total_aggregate, ArchetypeAggregate, WinrateOption};
pub use confidence::{matchup_stat, wilson, Confidence, MatchupStat, WinRateInterval};
