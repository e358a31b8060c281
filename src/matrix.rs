//! Pairwise matchup records between archetypes

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Record of one archetype against one opponent, from the first archetype's side
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchupCell {
    pub wins: u64,
    pub losses: u64,
    #[serde(default)]
    pub draws: u64,
}

impl MatchupCell {
    pub fn new(wins: u64, losses: u64, draws: u64) -> Self {
        Self {
            wins,
            losses,
            draws,
        }
    }

    /// Decided games (draws are outside the binomial model)
    pub fn games(&self) -> u64 {
        self.wins + self.losses
    }
}

/// archetype -> opponent -> cell. Not necessarily symmetric.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchupMatrix {
    rows: HashMap<String, HashMap<String, MatchupCell>>,
}

impl MatchupMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, archetype: &str, opponent: &str, cell: MatchupCell) {
        self.rows
            .entry(archetype.to_string())
            .or_default()
            .insert(opponent.to_string(), cell);
    }

    /// Cell for `archetype` vs `opponent`, `None` when no record exists
    pub fn cell(&self, archetype: &str, opponent: &str) -> Option<&MatchupCell> {
        self.rows.get(archetype).and_then(|row| row.get(opponent))
    }

    pub fn row(&self, archetype: &str) -> Option<&HashMap<String, MatchupCell>> {
        self.rows.get(archetype)
    }

    pub fn contains(&self, archetype: &str) -> bool {
        self.rows.contains_key(archetype)
    }

    /// Archetypes with a row, sorted for determinism
    pub fn archetypes(&self) -> Vec<String> {
        let mut names: Vec<String> = self.rows.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<(String, HashMap<String, MatchupCell>)> for MatchupMatrix {
    fn from_iter<I: IntoIterator<Item = (String, HashMap<String, MatchupCell>)>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}
