//! Archetype ordering
//!
//! All orderings are stable: equal keys keep their input order in both
//! directions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::stats::ArchetypeAggregate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMethod {
    /// wins + losses
    #[default]
    Games,
    /// wins / (wins + losses)
    Winrate,
    /// Identifier, lexicographic
    Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Active method and direction, with the toggle contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub method: SortMethod,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(method: SortMethod, direction: SortDirection) -> Self {
        Self { method, direction }
    }

    /// Same method flips the direction; a new method starts descending
    pub fn toggle(&mut self, method: SortMethod) {
        if method == self.method {
            self.direction = self.direction.flipped();
        } else {
            self.method = method;
            self.direction = SortDirection::Desc;
        }
    }
}

/// Order `archetypes` by `method`.
///
/// Archetypes without an aggregate count as zero games and 0% win rate.
/// For `Alpha`, `Asc` is A to Z.
pub fn sort_archetypes(
    method: SortMethod,
    direction: SortDirection,
    archetypes: &[String],
    aggregates: &HashMap<String, ArchetypeAggregate>,
) -> Vec<String> {
    let mut sorted = archetypes.to_vec();

    match method {
        SortMethod::Games => {
            let games = |a: &str| aggregates.get(a).map(|r| r.games()).unwrap_or(0);
            sorted.sort_by(|a, b| direction.apply(games(a).cmp(&games(b))));
        }
        SortMethod::Winrate => {
            let rate = |a: &str| aggregates.get(a).map(|r| r.win_fraction()).unwrap_or(0.0);
            sorted.sort_by(|a, b| {
                direction.apply(rate(a).partial_cmp(&rate(b)).unwrap_or(Ordering::Equal))
            });
        }
        SortMethod::Alpha => {
            sorted.sort_by(|a, b| direction.apply(a.cmp(b)));
        }
    }

    sorted
}

impl fmt::Display for SortMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortMethod::Games => "games",
            SortMethod::Winrate => "winrate",
            SortMethod::Alpha => "alpha",
        })
    }
}

impl FromStr for SortMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "games" => Ok(SortMethod::Games),
            "winrate" => Ok(SortMethod::Winrate),
            "alpha" => Ok(SortMethod::Alpha),
            other => Err(Error::Config(format!("unknown sort method: {}", other))),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        })
    }
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(Error::Config(format!("unknown sort direction: {}", other))),
        }
    }
}
