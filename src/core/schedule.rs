//! Schedule calculator
//!
//! Pure date arithmetic for recurring definitions. Month and year steps keep
//! the day of month and clamp it to the length of the target month, so
//! Jan 31 is followed by the last day of February.

use crate::{
    entities::Frequency,
    errors::{Error, Result},
};
use chrono::{Days, Months, NaiveDate};
use std::str::FromStr;

/// Returns the occurrence following `current` for the given frequency.
///
/// The result is strictly after `current` for every representable date except
/// the last one chrono supports, where the calendar saturates.
#[must_use]
pub fn next_occurrence(current: NaiveDate, frequency: Frequency) -> NaiveDate {
    let next = match frequency {
        Frequency::Daily => current.checked_add_days(Days::new(1)),
        Frequency::Weekly => current.checked_add_days(Days::new(7)),
        Frequency::Monthly => current.checked_add_months(Months::new(1)),
        Frequency::Yearly => current.checked_add_months(Months::new(12)),
    };
    next.unwrap_or(NaiveDate::MAX)
}

/// Iterates over every occurrence from `start` (inclusive) up to `until` (inclusive).
///
/// Each step is taken from the previous occurrence, exactly as repeated
/// processing runs would advance a definition.
pub fn occurrences_between(
    start: NaiveDate,
    frequency: Frequency,
    until: NaiveDate,
) -> impl Iterator<Item = NaiveDate> {
    std::iter::successors(Some(start), move |&date| {
        let next = next_occurrence(date, frequency);
        (next > date).then_some(next)
    })
    .take_while(move |&date| date <= until)
}

impl Frequency {
    /// Human-readable label for summaries and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Monthly => "Monthly",
            Self::Yearly => "Yearly",
        }
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(Error::InvalidFrequency {
                value: value.to_string(),
            }),
        }
    }
}
