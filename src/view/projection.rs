//! Projection of a cached snapshot through the view state
//!
//! The result is everything a renderer needs: ordered rows and columns,
//! a labelled aggregate per row, a statistic and colour per cell and the
//! A to Z selector list. Filtered aggregates are recomputed here on every
//! call, never stored.

use serde::Serialize;

use crate::cache::{CacheEntry, FilterKey, ResolvedPeriod};
use crate::render::winrate_color;
use crate::stats::{filtered_aggregate, matchup_stat, ArchetypeAggregate, MatchupStat, WinrateOption};
use crate::view::state::{MatrixViewMode, ViewState};

/// Row aggregate together with which flavour it is
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowAggregate {
    pub kind: WinrateOption,
    /// `None` only for a filtered aggregate with no decided games
    pub record: Option<ArchetypeAggregate>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixCell {
    pub stat: MatchupStat,
    /// Hue for rated cells only
    pub color: Option<String>,
}

impl MatrixCell {
    fn new(stat: MatchupStat) -> Self {
        let color = match &stat {
            MatchupStat::Rated { interval, .. } => Some(winrate_color(interval.win_rate)),
            _ => None,
        };
        Self { stat, color }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub archetype: String,
    pub aggregate: RowAggregate,
    /// One entry per column, same order as [`MatrixView::columns`]
    pub cells: Vec<MatrixCell>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixView {
    pub key: FilterKey,
    pub period: ResolvedPeriod,
    pub view_mode: MatrixViewMode,
    pub columns: Vec<String>,
    pub rows: Vec<MatrixRow>,
    /// Every archetype of the snapshot, A to Z
    pub selector: Vec<String>,
}

pub fn project(entry: &CacheEntry, state: &ViewState) -> MatrixView {
    let columns = state.columns().to_vec();

    let rows = state
        .rows()
        .iter()
        .map(|archetype| {
            let record = match state.winrate_option() {
                WinrateOption::Total => Some(entry.total_aggregate(archetype)),
                WinrateOption::Filtered => filtered_aggregate(&entry.matrix, archetype, &columns),
            };

            MatrixRow {
                archetype: archetype.clone(),
                aggregate: RowAggregate {
                    kind: state.winrate_option(),
                    record,
                },
                cells: columns
                    .iter()
                    .map(|opponent| MatrixCell::new(matchup_stat(&entry.matrix, archetype, opponent)))
                    .collect(),
            }
        })
        .collect();

    MatrixView {
        key: entry.key.clone(),
        period: entry.period.clone(),
        view_mode: state.view_mode(),
        columns,
        rows,
        selector: state.selector_archetypes(),
    }
}
