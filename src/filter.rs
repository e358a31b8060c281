//! Filter dimensions for matrix queries
//!
//! A [`FilterState`] combines the selected time frame, an optional
//! minimum-frequency cutoff and an optional custom date range. Every
//! distinct combination maps to exactly one cache key.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::cache::FilterKey;
use crate::error::{Error, Result};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Reporting period selectable by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeFrame {
    /// Only offered by older selectors, still accepted by the API
    #[serde(rename = "1_month")]
    OneMonth,
    #[serde(rename = "3_months")]
    ThreeMonths,
    #[serde(rename = "6_months")]
    SixMonths,
    #[serde(rename = "1_year")]
    OneYear,
    #[default]
    #[serde(rename = "all_time")]
    AllTime,
}

impl TimeFrame {
    pub const ALL: [TimeFrame; 5] = [
        TimeFrame::OneMonth,
        TimeFrame::ThreeMonths,
        TimeFrame::SixMonths,
        TimeFrame::OneYear,
        TimeFrame::AllTime,
    ];

    /// Wire identifier, also used inside cache keys
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeFrame::OneMonth => "1_month",
            TimeFrame::ThreeMonths => "3_months",
            TimeFrame::SixMonths => "6_months",
            TimeFrame::OneYear => "1_year",
            TimeFrame::AllTime => "all_time",
        }
    }
}

impl fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeFrame {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TimeFrame::ALL
            .iter()
            .copied()
            .find(|tf| tf.as_str() == s.trim())
            .ok_or_else(|| Error::InvalidFilter(format!("unknown time frame: {}", s)))
    }
}

/// Active filter combination
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FilterState {
    pub time_frame: TimeFrame,
    /// Minimum share of matches (percent) an archetype needs to appear
    pub min_percentage: Option<f64>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl FilterState {
    pub fn new(time_frame: TimeFrame) -> Self {
        Self {
            time_frame,
            ..Default::default()
        }
    }

    /// Builder form of [`FilterState::set_min_percentage`]
    pub fn with_min_percentage(mut self, percentage: Option<f64>) -> Self {
        self.set_min_percentage(percentage);
        self
    }

    /// Set the cutoff, clamping to [0, 100]. Non-finite values unset it.
    pub fn set_min_percentage(&mut self, percentage: Option<f64>) {
        self.min_percentage = percentage.and_then(clamp_percentage);
    }

    /// Set either end of the custom range. Empty strings clear that end.
    pub fn set_date_range(&mut self, start: Option<&str>, end: Option<&str>) -> Result<()> {
        let start = normalize_date(start)?;
        let end = normalize_date(end)?;

        if let (Some((s, s_date)), Some((e, e_date))) = (&start, &end) {
            if s_date > e_date {
                return Err(Error::InvalidFilter(format!(
                    "start date {} is after end date {}",
                    s, e
                )));
            }
        }

        self.start_date = start.map(|(s, _)| s);
        self.end_date = end.map(|(e, _)| e);
        Ok(())
    }

    pub fn clear_date_range(&mut self) {
        self.start_date = None;
        self.end_date = None;
    }

    /// The custom range, only when both ends are present
    pub fn custom_range(&self) -> Option<(&str, &str)> {
        match (&self.start_date, &self.end_date) {
            (Some(start), Some(end)) => Some((start.as_str(), end.as_str())),
            _ => None,
        }
    }

    pub fn key(&self) -> FilterKey {
        FilterKey::compute(
            self.time_frame,
            self.min_percentage,
            self.start_date.as_deref(),
            self.end_date.as_deref(),
        )
    }

    /// Query parameters for the matrix and win-loss endpoints.
    ///
    /// A complete custom range supersedes the time frame. A half-open range
    /// is not sent so the query always agrees with the cache key.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();

        match self.custom_range() {
            Some((start, end)) => {
                if let Some(pct) = self.min_percentage {
                    params.push(("min_percentage", pct.to_string()));
                }
                params.push(("start_date", start.to_string()));
                params.push(("end_date", end.to_string()));
            }
            None => {
                if self.time_frame != TimeFrame::AllTime {
                    params.push(("time_frame", self.time_frame.as_str().to_string()));
                }
                if let Some(pct) = self.min_percentage {
                    params.push(("min_percentage", pct.to_string()));
                }
            }
        }

        params
    }
}

/// Clamp a cutoff to [0, 100]; NaN and infinities count as malformed
pub fn clamp_percentage(value: f64) -> Option<f64> {
    if value.is_finite() {
        // Adding zero folds -0.0 into 0.0 so both share one key
        Some(value.clamp(0.0, 100.0) + 0.0)
    } else {
        None
    }
}

/// Parse free-form cutoff input. Malformed input resets to "unset".
pub fn parse_min_percentage(input: &str) -> Option<f64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().and_then(clamp_percentage)
}

fn normalize_date(value: Option<&str>) -> Result<Option<(String, NaiveDate)>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(raw) => {
            let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .map_err(|e| Error::InvalidFilter(format!("invalid date {:?}: {}", raw, e)))?;
            Ok(Some((raw.to_string(), date)))
        }
    }
}
