//! Wire shapes of the upstream API and their normalization
//!
//! Two collaborators exist: the authenticated analysis API and the older
//! cached endpoints. Both are converted here into [`MatchupCell`],
//! [`ArchetypeAggregate`] and [`MatrixPayload`] so nothing downstream
//! branches on response shape.

use serde::Deserialize;
use std::collections::HashMap;

use crate::cache::ResolvedPeriod;
use crate::filter::TimeFrame;
use crate::matrix::{MatchupCell, MatchupMatrix};
use crate::stats::ArchetypeAggregate;

/// A matchup cell in either wire format
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WireCell {
    Standard {
        wins: u64,
        losses: u64,
        #[serde(default)]
        draws: u64,
    },
    /// `{archetype_1_wins, archetype_2_wins}`, no draws
    Legacy {
        archetype_1_wins: u64,
        archetype_2_wins: u64,
    },
}

impl From<WireCell> for MatchupCell {
    fn from(cell: WireCell) -> Self {
        match cell {
            WireCell::Standard {
                wins,
                losses,
                draws,
            } => MatchupCell::new(wins, losses, draws),
            WireCell::Legacy {
                archetype_1_wins,
                archetype_2_wins,
            } => MatchupCell::new(archetype_1_wins, archetype_2_wins, 0),
        }
    }
}

type WireMatrix = HashMap<String, HashMap<String, WireCell>>;

fn normalize_matrix(matrix: WireMatrix) -> MatchupMatrix {
    matrix
        .into_iter()
        .map(|(archetype, row)| {
            let row = row
                .into_iter()
                .map(|(opponent, cell)| (opponent, MatchupCell::from(cell)))
                .collect();
            (archetype, row)
        })
        .collect()
}

/// `GET /analysis/archetype-matrix`
#[derive(Debug, Clone, Deserialize)]
pub struct ArchetypeMatrixResponse {
    #[serde(default)]
    pub archetypes: Vec<String>,
    pub matrix: WireMatrix,
    #[serde(default)]
    pub time_frame: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub min_percentage: Option<f64>,
}

/// `GET /matchup/cached`
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyMatrixResponse {
    pub results: WireMatrix,
}

/// One element of `GET /analysis/win-loss-records`
#[derive(Debug, Clone, Deserialize)]
pub struct WinLossRecord {
    pub archetype: String,
    pub wins: u64,
    pub losses: u64,
    #[serde(default)]
    pub draws: u64,
    #[serde(default)]
    pub total_matches: Option<u64>,
    #[serde(default)]
    pub win_rate: Option<f64>,
}

impl From<WinLossRecord> for ArchetypeAggregate {
    fn from(record: WinLossRecord) -> Self {
        let computed = ArchetypeAggregate::from_counts(record.wins, record.losses, record.draws);
        ArchetypeAggregate {
            total_matches: record.total_matches.unwrap_or(computed.total_matches),
            win_rate: record.win_rate.unwrap_or(computed.win_rate),
            ..computed
        }
    }
}

/// `GET /archetype/overallrecord`
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRecord {
    pub wins: u64,
    pub losses: u64,
}

impl From<LegacyRecord> for ArchetypeAggregate {
    fn from(record: LegacyRecord) -> Self {
        ArchetypeAggregate::from_counts(record.wins, record.losses, 0)
    }
}

/// Find the entry for `archetype` in a win-loss listing
pub fn find_record(records: Vec<WinLossRecord>, archetype: &str) -> Option<ArchetypeAggregate> {
    records
        .into_iter()
        .find(|r| r.archetype == archetype)
        .map(ArchetypeAggregate::from)
}

/// Matrix result in canonical form, whichever collaborator produced it
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixPayload {
    pub archetypes: Vec<String>,
    pub matrix: MatchupMatrix,
    pub period: ResolvedPeriod,
}

impl From<ArchetypeMatrixResponse> for MatrixPayload {
    fn from(response: ArchetypeMatrixResponse) -> Self {
        let matrix = normalize_matrix(response.matrix);
        let archetypes = if response.archetypes.is_empty() {
            matrix.archetypes()
        } else {
            response.archetypes
        };

        MatrixPayload {
            archetypes,
            matrix,
            period: ResolvedPeriod {
                time_frame: response
                    .time_frame
                    .unwrap_or_else(|| TimeFrame::AllTime.as_str().to_string()),
                start_date: response.start_date,
                end_date: response.end_date,
                min_percentage: response.min_percentage,
            },
        }
    }
}

impl From<LegacyMatrixResponse> for MatrixPayload {
    fn from(response: LegacyMatrixResponse) -> Self {
        let matrix = normalize_matrix(response.results);
        MatrixPayload {
            archetypes: matrix.archetypes(),
            matrix,
            period: ResolvedPeriod {
                time_frame: TimeFrame::AllTime.as_str().to_string(),
                ..Default::default()
            },
        }
    }
}
