//! Win rate and Wilson score interval
//!
//! Draws are excluded: `total` is always `wins + losses`. The interval is
//! the two-sided 95% Wilson score interval, reported in percent.

use serde::Serialize;

use crate::matrix::MatchupMatrix;

/// z for a two-sided 95% interval
pub const Z_95: f64 = 1.959_963_984_540_054;

/// Point estimate and bounds, all in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WinRateInterval {
    pub win_rate: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Outcome of evaluating a win/loss count
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum Confidence {
    /// Nothing decided yet (wins + losses == 0)
    ZeroMatches,
    Interval(WinRateInterval),
}

impl Confidence {
    pub fn interval(&self) -> Option<&WinRateInterval> {
        match self {
            Confidence::ZeroMatches => None,
            Confidence::Interval(interval) => Some(interval),
        }
    }
}

/// Wilson score interval for `wins` out of `total` decided games.
///
/// `wins` above `total` is treated as `total`.
pub fn wilson(wins: u64, total: u64) -> Confidence {
    wilson_with_z(wins, total, Z_95)
}

pub fn wilson_with_z(wins: u64, total: u64, z: f64) -> Confidence {
    if total == 0 {
        return Confidence::ZeroMatches;
    }

    let n = total as f64;
    let p = wins.min(total) as f64 / n;
    let z2 = z * z;

    let denom = 1.0 + z2 / n;
    let centre = p + z2 / (2.0 * n);
    let margin = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt();

    // Rounding at p = 0 or p = 1 can push a bound past the estimate
    let lower = ((centre - margin) / denom).clamp(0.0, p);
    let upper = ((centre + margin) / denom).clamp(p, 1.0);

    Confidence::Interval(WinRateInterval {
        win_rate: p * 100.0,
        lower: lower * 100.0,
        upper: upper * 100.0,
    })
}

/// Per-cell statistic as rendered in the matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum MatchupStat {
    /// Self vs self, never meaningful
    Diagonal,
    /// The pair has no entry in the matrix
    NoData,
    /// The pair has an entry with no decided games
    ZeroMatches { draws: u64 },
    Rated {
        wins: u64,
        losses: u64,
        draws: u64,
        interval: WinRateInterval,
    },
}

pub fn matchup_stat(matrix: &MatchupMatrix, archetype: &str, opponent: &str) -> MatchupStat {
    if archetype == opponent {
        return MatchupStat::Diagonal;
    }

    let Some(cell) = matrix.cell(archetype, opponent) else {
        return MatchupStat::NoData;
    };

    match wilson(cell.wins, cell.games()) {
        Confidence::ZeroMatches => MatchupStat::ZeroMatches { draws: cell.draws },
        Confidence::Interval(interval) => MatchupStat::Rated {
            wins: cell.wins,
            losses: cell.losses,
            draws: cell.draws,
            interval,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::MatchupCell;

    fn interval(wins: u64, total: u64) -> WinRateInterval {
        *wilson(wins, total).interval().unwrap()
    }

    #[test]
    fn test_zero_total() {
        assert_eq!(wilson(0, 0), Confidence::ZeroMatches);
    }

    #[test]
    fn test_known_value() {
        // 7 of 10 -> roughly [39.7%, 89.2%]
        let i = interval(7, 10);
        assert!((i.win_rate - 70.0).abs() < 1e-9);
        assert!((i.lower - 39.68).abs() < 0.05, "lower {}", i.lower);
        assert!((i.upper - 89.22).abs() < 0.05, "upper {}", i.upper);
    }

    #[test]
    fn test_bounds_hold_everywhere() {
        for total in 1..=60u64 {
            for wins in 0..=total {
                let i = interval(wins, total);
                assert!(i.lower >= 0.0 && i.upper <= 100.0);
                assert!(i.lower <= i.win_rate && i.win_rate <= i.upper);
                assert!(!i.lower.is_nan() && !i.upper.is_nan());
            }
        }
    }

    #[test]
    fn test_boundaries() {
        let none = interval(0, 25);
        assert_eq!(none.lower, 0.0);
        assert!(none.upper > 0.0);

        let all = interval(25, 25);
        assert_eq!(all.upper, 100.0);
        assert!(all.lower < 100.0);
    }

    #[test]
    fn test_narrows_with_sample_size() {
        let mut last_width = f64::MAX;
        for scale in [1u64, 2, 5, 10, 100, 1000] {
            let i = interval(3 * scale, 5 * scale);
            let width = i.upper - i.lower;
            assert!(width < last_width);
            last_width = width;
        }
    }

    #[test]
    fn test_wins_above_total_saturate() {
        assert_eq!(interval(12, 10).win_rate, 100.0);
    }

    #[test]
    fn test_matchup_stat_distinguishes_missing_and_empty() {
        let mut matrix = MatchupMatrix::new();
        matrix.insert("A", "B", MatchupCell::new(0, 0, 0));
        matrix.insert("A", "C", MatchupCell::new(7, 3, 1));
        matrix.insert("A", "A", MatchupCell::new(4, 4, 0));

        assert_eq!(
            matchup_stat(&matrix, "A", "B"),
            MatchupStat::ZeroMatches { draws: 0 }
        );
        assert_eq!(matchup_stat(&matrix, "A", "D"), MatchupStat::NoData);
        assert_eq!(matchup_stat(&matrix, "A", "A"), MatchupStat::Diagonal);
        assert!(matches!(
            matchup_stat(&matrix, "A", "C"),
            MatchupStat::Rated { wins: 7, losses: 3, draws: 1, .. }
        ));
    }
}
