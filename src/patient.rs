//! Patient records
//!
//! This abstracts over the two patient shapes used against the registry store:
//! * Patient (returned by the list query)
//! * NewPatient (the insert payload; the store assigns `id` and `created_at`).

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Eq, PartialEq, Deserialize)]
pub struct Patient {
    /// Store-assigned identifier, immutable once created.
    pub id: String,

    /// Patient name, never empty after a successful creation.
    pub name: String,

    /// Birth date, if one was recorded.
    #[serde(default, deserialize_with = "lenient_date")]
    pub birth_date: Option<NaiveDate>,

    /// Store-assigned creation timestamp.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Insert payload for a new patient. `birth_date` is omitted from the body
/// entirely when absent, so the store only ever sees `{name}` or
/// `{name, birth_date}`.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct NewPatient {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
}

/// A birth date the store failed to record as a valid date is shown as
/// unknown rather than failing the whole snapshot decode.
fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

/// A patient's age in whole calendar years, or unknown when the birth date
/// is absent or unparsable.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Age {
    Years(i32),
    Unknown,
}

impl Display for Age {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Age::Years(years) => write!(f, "{} years", years),
            Age::Unknown => write!(f, "unknown"),
        }
    }
}

/// Age as of the ambient local clock.
pub fn calc_age(birth_date: Option<NaiveDate>) -> Age {
    age_on(birth_date, Local::now().date_naive())
}

/// Textual variant for unvalidated input (the new-patient form's live
/// preview). Anything that does not parse as `YYYY-MM-DD` is unknown.
pub fn calc_age_str(raw: Option<&str>) -> Age {
    let parsed = raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok());
    calc_age(parsed)
}

/// Whole years between `born` and `today`, decremented by one when the
/// birthday has not yet been reached this year.
pub(crate) fn age_on(birth_date: Option<NaiveDate>, today: NaiveDate) -> Age {
    let Some(born) = birth_date else {
        return Age::Unknown;
    };
    let mut age = today.year() - born.year();
    if (today.month(), today.day()) < (born.month(), born.day()) {
        age -= 1;
    }
    Age::Years(age)
}
