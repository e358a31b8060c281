//! View layer: ordering, visibility, projection and the dashboard controller

pub mod dashboard;
pub mod projection;
pub mod sort;
pub mod state;

pub use dashboard::{Dashboard, FilterChange};
pub use projection::{project, MatrixCell, MatrixRow, MatrixView, RowAggregate};
pub use sort::{sort_archetypes, SortDirection, SortMethod, SortState};
pub use state::{MatrixViewMode, ViewState};
