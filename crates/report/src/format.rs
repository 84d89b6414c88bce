//! Destination value formats: dates, person names, phone numbers.

use core::fmt;
use core::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::settings::ReportSettings;

const REPORT_DATE_FORMAT: &str = "%m/%d/%Y";

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%Y/%m/%d",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Format applied to a value before it is written to a destination sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFormat {
    Date,
    Name,
    Phone,
}

impl DataFormat {
    pub const ALL: [DataFormat; 3] = [DataFormat::Date, DataFormat::Name, DataFormat::Phone];

    pub fn as_str(self) -> &'static str {
        match self {
            DataFormat::Date => "date",
            DataFormat::Name => "name",
            DataFormat::Phone => "phone",
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        DataFormat::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| s.trim().to_string())
    }
}

/// Applies [`DataFormat`]s using the run's default country and area codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    country_code: String,
    area_code: String,
}

impl Formatter {
    pub fn new(country_code: impl Into<String>, area_code: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            area_code: area_code.into(),
        }
    }

    pub fn from_settings(settings: &ReportSettings) -> Self {
        Self::new(&settings.default_country_code, &settings.default_area_code)
    }

    /// Format `value`; values a format cannot interpret are returned unchanged.
    pub fn apply(&self, format: Option<DataFormat>, value: &str) -> String {
        match format {
            None => value.to_string(),
            Some(DataFormat::Date) => format_date(value).unwrap_or_else(|| {
                tracing::warn!(value, "unrecognized date, writing it unchanged");
                value.to_string()
            }),
            Some(DataFormat::Name) => format_name(value),
            Some(DataFormat::Phone) => format_phone(value, &self.country_code, &self.area_code),
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::from_settings(&ReportSettings::default())
    }
}

/// Render a recognizable date as `MM/DD/YYYY`.
pub fn format_date(value: &str) -> Option<String> {
    parse_date(value.trim()).map(|d| d.format(REPORT_DATE_FORMAT).to_string())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    if value.is_empty() {
        return None;
    }
    // `%Y` happily reads "24" as year 24; two-digit years need `%y`.
    if let Some((_, year)) = value.rsplit_once('/') {
        if year.len() == 2 && year.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(date) = NaiveDate::parse_from_str(value, "%m/%d/%y") {
                return Some(date);
            }
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(value, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

/// "Last, First" becomes "First Last". Values without a comma are unchanged.
pub fn format_name(value: &str) -> String {
    match value.split_once(',') {
        None => value.to_string(),
        Some((last, rest)) => {
            let first: String = rest.split(',').collect();
            format!("{} {}", first.trim(), last.trim()).trim().to_string()
        }
    }
}

/// Mask a phone number as `C-AAA-XXX-XXXX`. Seven digits get the default area
/// code, ten digits the default country code. Other lengths are left as-is.
pub fn format_phone(value: &str, country_code: &str, area_code: &str) -> String {
    let digits: String = value.chars().filter(char::is_ascii_digit).collect();
    match digits.len() {
        7 => format!("{country_code}-{area_code}-{}-{}", &digits[..3], &digits[3..]),
        10 => format!(
            "{country_code}-{}-{}-{}",
            &digits[..3],
            &digits[3..6],
            &digits[6..]
        ),
        11 => format!(
            "{}-{}-{}-{}",
            &digits[..1],
            &digits[1..4],
            &digits[4..7],
            &digits[7..]
        ),
        _ => value.to_string(),
    }
}
