//! Plain-text rendering of matrix projections

use std::fmt::Write;

use crate::stats::{ArchetypeAggregate, MatchupStat};
use crate::view::{MatrixView, RowAggregate};

const NAME_WIDTH: usize = 24;
const CELL_WIDTH: usize = 22;

/// Cell colour on a red (0%) to green (100%) hue scale
pub fn winrate_color(win_rate: f64) -> String {
    let hue = (win_rate.clamp(0.0, 100.0) / 100.0) * 120.0;
    format!("hsl({}, 70%, 45%)", hue)
}

pub fn format_cell(stat: &MatchupStat) -> String {
    match stat {
        MatchupStat::Diagonal => "-".to_string(),
        MatchupStat::NoData => String::new(),
        MatchupStat::ZeroMatches { draws: 0 } => "0 games".to_string(),
        MatchupStat::ZeroMatches { draws } => format!("0 games ({}D)", draws),
        MatchupStat::Rated {
            wins,
            losses,
            interval,
            ..
        } => format!(
            "{:.1}% [{:.0}-{:.0}] {}-{}",
            interval.win_rate, interval.lower, interval.upper, wins, losses
        ),
    }
}

pub fn format_aggregate(aggregate: &RowAggregate) -> String {
    match &aggregate.record {
        Some(record) => format!(
            "{:.1}% {}-{}-{} ({})",
            record.win_fraction() * 100.0,
            record.wins,
            record.losses,
            record.draws,
            aggregate.kind
        ),
        None => format!("n/a ({})", aggregate.kind),
    }
}

fn truncate(name: &str, width: usize) -> String {
    if name.chars().count() <= width {
        name.to_string()
    } else {
        let mut short: String = name.chars().take(width.saturating_sub(1)).collect();
        short.push('~');
        short
    }
}

pub fn render_matrix(view: &MatrixView) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Matchups: {} ({}, {})",
        view.key, view.period.time_frame, view.view_mode
    );
    if let (Some(start), Some(end)) = (&view.period.start_date, &view.period.end_date) {
        let _ = writeln!(out, "Range: {} to {}", start, end);
    }
    if let Some(pct) = view.period.min_percentage {
        let _ = writeln!(out, "Minimum share: {}%", pct);
    }
    out.push('\n');

    let _ = write!(out, "{:<w$} {:<w2$}", "", "Overall", w = NAME_WIDTH, w2 = CELL_WIDTH + 6);
    for column in &view.columns {
        let _ = write!(out, " {:<w$}", truncate(column, CELL_WIDTH), w = CELL_WIDTH);
    }
    out.push('\n');

    for row in &view.rows {
        let _ = write!(
            out,
            "{:<w$} {:<w2$}",
            truncate(&row.archetype, NAME_WIDTH),
            format_aggregate(&row.aggregate),
            w = NAME_WIDTH,
            w2 = CELL_WIDTH + 6
        );
        for cell in &row.cells {
            let _ = write!(out, " {:<w$}", format_cell(&cell.stat), w = CELL_WIDTH);
        }
        out.push('\n');
    }

    if view.rows.is_empty() {
        out.push_str("No archetypes selected.\n");
    }

    out.push_str("\nArchetypes:\n");
    for name in &view.selector {
        let mark = if view.rows.iter().any(|row| &row.archetype == name) {
            'x'
        } else {
            ' '
        };
        let _ = writeln!(out, "  [{}] {}", mark, name);
    }

    out
}

/// One line per archetype: record and win rate
pub fn render_records(records: &[(String, ArchetypeAggregate)]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<w$} {:>7} {:>7} {:>6} {:>8} {:>8}",
        "Archetype", "Wins", "Losses", "Draws", "Games", "Win %",
        w = NAME_WIDTH
    );
    for (name, record) in records {
        let _ = writeln!(
            out,
            "{:<w$} {:>7} {:>7} {:>6} {:>8} {:>7.1}%",
            truncate(name, NAME_WIDTH),
            record.wins,
            record.losses,
            record.draws,
            record.games(),
            record.win_fraction() * 100.0,
            w = NAME_WIDTH
        );
    }
    out
}
