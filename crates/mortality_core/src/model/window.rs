//! Comparison window model.
//!
//! # Invariants
//! - `end` is inclusive and never earlier than `start`.
//! - Windows compared on one chart must share the same duration.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Fixed calendar range used to align two historical events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub label: String,
    pub start: NaiveDate,
    /// Inclusive.
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label: label.into(),
            start,
            end,
        }
    }

    /// `end - start`; the value compared across windows.
    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Whether `date` falls inside the window, both ends included.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date of the window in order, both ends included.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.start
            .iter_days()
            .take_while(|day| *day <= self.end)
            .collect()
    }

    /// Label used for chart legends.
    pub fn legend(&self) -> String {
        format!("{} ({} to {})", self.label, self.start, self.end)
    }
}

/// Two windows meant for one shared x-axis have different lengths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDurationMismatch {
    pub expected_label: String,
    pub expected_days: i64,
    pub label: String,
    pub days: i64,
}

impl Display for WindowDurationMismatch {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "window `{}` spans {} days but `{}` spans {} days",
            self.label, self.days, self.expected_label, self.expected_days
        )
    }
}

impl Error for WindowDurationMismatch {}

/// Checks that every window has the duration of the first one.
pub fn ensure_same_duration<'a, I>(windows: I) -> Result<(), WindowDurationMismatch>
where
    I: IntoIterator<Item = &'a DateWindow>,
{
    let mut windows = windows.into_iter();
    let Some(reference) = windows.next() else {
        return Ok(());
    };
    for window in windows {
        if window.duration() != reference.duration() {
            return Err(WindowDurationMismatch {
                expected_label: reference.label.clone(),
                expected_days: reference.duration().num_days(),
                label: window.label.clone(),
                days: window.duration().num_days(),
            });
        }
    }
    Ok(())
}
