//! Per-archetype aggregate records
//!
//! Two flavours exist side by side: the server-computed total for the
//! active filter, and a local projection summed over a chosen set of
//! opponents. They can disagree, so callers always carry the kind along.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::matrix::MatchupMatrix;

/// Combined win/loss/draw record for one archetype
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeAggregate {
    pub wins: u64,
    pub losses: u64,
    pub draws: u64,
    pub total_matches: u64,
    /// Percent, 0.0 when nothing was decided
    pub win_rate: f64,
}

impl ArchetypeAggregate {
    /// Record for an archetype that had no matches in the period
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn from_counts(wins: u64, losses: u64, draws: u64) -> Self {
        let decided = wins + losses;
        let win_rate = if decided == 0 {
            0.0
        } else {
            wins as f64 / decided as f64 * 100.0
        };
        Self {
            wins,
            losses,
            draws,
            total_matches: decided + draws,
            win_rate,
        }
    }

    /// Games played, the sort key for "games"
    pub fn games(&self) -> u64 {
        self.wins + self.losses
    }

    /// wins / (wins + losses), 0.0 for an empty record
    pub fn win_fraction(&self) -> f64 {
        let games = self.games();
        if games == 0 {
            0.0
        } else {
            self.wins as f64 / games as f64
        }
    }
}

/// Which aggregate a row shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinrateOption {
    #[default]
    Total,
    Filtered,
}

impl fmt::Display for WinrateOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WinrateOption::Total => f.write_str("total"),
            WinrateOption::Filtered => f.write_str("filtered"),
        }
    }
}

impl FromStr for WinrateOption {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "total" => Ok(WinrateOption::Total),
            "filtered" => Ok(WinrateOption::Filtered),
            other => Err(Error::Config(format!("unknown winrate option: {}", other))),
        }
    }
}

/// Server total for `archetype`; missing archetypes read as the zero record
pub fn total_aggregate(
    aggregates: &HashMap<String, ArchetypeAggregate>,
    archetype: &str,
) -> ArchetypeAggregate {
    aggregates.get(archetype).copied().unwrap_or_default()
}

/// Sum of `archetype`'s cells across `columns`.
///
/// Opponents without a cell and the diagonal contribute nothing. Returns
/// `None` when no decided game remains, which is distinct from a record of
/// zero wins.
pub fn filtered_aggregate<S: AsRef<str>>(
    matrix: &MatchupMatrix,
    archetype: &str,
    columns: &[S],
) -> Option<ArchetypeAggregate> {
    let row = matrix.row(archetype)?;

    let (wins, losses, draws) = columns
        .iter()
        .map(|column| -> &str { column.as_ref() })
        .filter(|opponent| *opponent != archetype)
        .filter_map(|opponent| row.get(opponent))
        .fold((0u64, 0u64, 0u64), |(w, l, d), cell| {
            (w + cell.wins, l + cell.losses, d + cell.draws)
        });

    if wins + losses == 0 {
        return None;
    }

    Some(ArchetypeAggregate::from_counts(wins, losses, draws))
}
