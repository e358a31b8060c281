//! Per-session view state: filters, visibility, sort and layout

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::cache::CacheEntry;
use crate::config::ViewConfig;
use crate::error::Error;
use crate::filter::FilterState;
use crate::stats::{ArchetypeAggregate, WinrateOption};
use crate::view::sort::{sort_archetypes, SortDirection, SortMethod, SortState};

/// Which archetypes make up rows and columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixViewMode {
    /// Rows: visible set. Columns: every archetype in the snapshot.
    #[default]
    FilteredVsAll,
    /// Rows and columns: visible set
    FilteredVsFiltered,
}

impl fmt::Display for MatrixViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatrixViewMode::FilteredVsAll => "filtered_vs_all",
            MatrixViewMode::FilteredVsFiltered => "filtered_vs_filtered",
        })
    }
}

impl FromStr for MatrixViewMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "filtered_vs_all" => Ok(MatrixViewMode::FilteredVsAll),
            "filtered_vs_filtered" => Ok(MatrixViewMode::FilteredVsFiltered),
            other => Err(Error::Config(format!("unknown view mode: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ViewState {
    pub filter: FilterState,
    sort: SortState,
    view_mode: MatrixViewMode,
    winrate: WinrateOption,
    /// Every archetype of the displayed snapshot, in sort order
    ordered: Vec<String>,
    /// Subset of `ordered`, in sort order
    visible: Vec<String>,
    adopted_once: bool,
}

impl ViewState {
    pub fn new(
        filter: FilterState,
        sort: SortState,
        view_mode: MatrixViewMode,
        winrate: WinrateOption,
    ) -> Self {
        Self {
            filter,
            sort,
            view_mode,
            winrate,
            ..Default::default()
        }
    }

    pub fn from_config(config: &ViewConfig) -> Self {
        Self::new(
            FilterState::new(config.time_frame),
            SortState::new(config.sort_method, config.sort_direction),
            config.view_mode,
            config.winrate,
        )
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn view_mode(&self) -> MatrixViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: MatrixViewMode) {
        self.view_mode = mode;
    }

    pub fn winrate_option(&self) -> WinrateOption {
        self.winrate
    }

    pub fn set_winrate_option(&mut self, option: WinrateOption) {
        self.winrate = option;
    }

    /// All archetypes of the displayed snapshot, in sort order
    pub fn archetypes(&self) -> &[String] {
        &self.ordered
    }

    pub fn visible(&self) -> &[String] {
        &self.visible
    }

    pub fn is_visible(&self, archetype: &str) -> bool {
        self.visible.iter().any(|a| a == archetype)
    }

    /// Selector list: always A to Z, independent of the active sort
    pub fn selector_archetypes(&self) -> Vec<String> {
        let mut names = self.ordered.clone();
        names.sort();
        names
    }

    pub fn rows(&self) -> &[String] {
        &self.visible
    }

    pub fn columns(&self) -> &[String] {
        match self.view_mode {
            MatrixViewMode::FilteredVsAll => &self.ordered,
            MatrixViewMode::FilteredVsFiltered => &self.visible,
        }
    }

    /// Switch to a newly displayed snapshot.
    ///
    /// The first snapshot makes everything visible. Later ones keep the
    /// current selection, dropping archetypes the snapshot does not have.
    pub fn adopt(&mut self, entry: &CacheEntry) {
        let previous: HashSet<String> = self.visible.drain(..).collect();

        self.ordered = sort_archetypes(
            self.sort.method,
            self.sort.direction,
            &entry.archetypes,
            &entry.aggregates,
        );

        self.visible = if self.adopted_once {
            self.ordered
                .iter()
                .filter(|a| previous.contains(*a))
                .cloned()
                .collect()
        } else {
            self.ordered.clone()
        };
        self.adopted_once = true;
    }

    /// Sort-button contract: same method flips, new method starts descending
    pub fn handle_sort(
        &mut self,
        method: SortMethod,
        aggregates: &HashMap<String, ArchetypeAggregate>,
    ) {
        self.sort.toggle(method);
        self.resort(aggregates);
    }

    pub fn sort_by(
        &mut self,
        method: SortMethod,
        direction: SortDirection,
        aggregates: &HashMap<String, ArchetypeAggregate>,
    ) {
        self.sort = SortState::new(method, direction);
        self.resort(aggregates);
    }

    /// Show or hide one archetype; the visible set is re-sorted afterwards.
    /// Returns `false` for archetypes the snapshot does not contain.
    pub fn set_visible(
        &mut self,
        archetype: &str,
        visible: bool,
        aggregates: &HashMap<String, ArchetypeAggregate>,
    ) -> bool {
        if !self.ordered.iter().any(|a| a == archetype) {
            return false;
        }

        if visible {
            if !self.is_visible(archetype) {
                self.visible.push(archetype.to_string());
            }
        } else {
            self.visible.retain(|a| a != archetype);
        }

        self.visible = self.sorted(&self.visible, aggregates);
        true
    }

    /// Replace the visible set; unknown archetypes are ignored
    pub fn set_visible_set<S: AsRef<str>>(
        &mut self,
        archetypes: &[S],
        aggregates: &HashMap<String, ArchetypeAggregate>,
    ) {
        let wanted: HashSet<&str> = archetypes.iter().map(|a| a.as_ref()).collect();
        let selection: Vec<String> = self
            .ordered
            .iter()
            .filter(|a| wanted.contains(a.as_str()))
            .cloned()
            .collect();
        self.visible = self.sorted(&selection, aggregates);
    }

    pub fn select_all(&mut self, selected: bool) {
        self.visible = if selected {
            self.ordered.clone()
        } else {
            Vec::new()
        };
    }

    pub fn all_selected(&self) -> bool {
        self.visible.len() == self.ordered.len()
    }

    fn resort(&mut self, aggregates: &HashMap<String, ArchetypeAggregate>) {
        self.ordered = self.sorted(&self.ordered, aggregates);
        self.visible = self.sorted(&self.visible, aggregates);
    }

    fn sorted(
        &self,
        list: &[String],
        aggregates: &HashMap<String, ArchetypeAggregate>,
    ) -> Vec<String> {
        sort_archetypes(self.sort.method, self.sort.direction, list, aggregates)
    }
}
