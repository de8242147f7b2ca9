use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Calendar months used to identify regular transfer rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Month {
    January,
    February,
    March,
    April,
    May,
    June,
    July,
    August,
    September,
    October,
    November,
    December,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::January,
        Month::February,
        Month::March,
        Month::April,
        Month::May,
        Month::June,
        Month::July,
        Month::August,
        Month::September,
        Month::October,
        Month::November,
        Month::December,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Month::January => "January",
            Month::February => "February",
            Month::March => "March",
            Month::April => "April",
            Month::May => "May",
            Month::June => "June",
            Month::July => "July",
            Month::August => "August",
            Month::September => "September",
            Month::October => "October",
            Month::November => "November",
            Month::December => "December",
        }
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = RoundKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Month::ALL
            .into_iter()
            .find(|month| month.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| RoundKeyError::UnknownMonth(trimmed.to_string()))
    }
}

/// A transfer exercise is scoped to one round: the annual norms-based general
/// transfer or a monthly regular transfer. Every roster, application, vacancy
/// and list belongs to exactly one round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferRound {
    General { year: i32 },
    Regular { month: Month, year: i32 },
}

impl TransferRound {
    /// Stable storage key, e.g. `general_2026` or `regular_june_2026`.
    pub fn key(&self) -> String {
        match self {
            TransferRound::General { year } => format!("general_{year}"),
            TransferRound::Regular { month, year } => {
                format!("regular_{}_{year}", month.name().to_ascii_lowercase())
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            TransferRound::General { year } => format!("General Transfer {year}"),
            TransferRound::Regular { month, year } => {
                format!("Regular Transfer - {month} {year}")
            }
        }
    }

    pub fn year(&self) -> i32 {
        match self {
            TransferRound::General { year } | TransferRound::Regular { year, .. } => *year,
        }
    }
}

impl fmt::Display for TransferRound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoundKeyError {
    #[error("round key '{0}' is not of the form general_<year> or regular_<month>_<year>")]
    Malformed(String),
    #[error("unknown month '{0}'")]
    UnknownMonth(String),
    #[error("year '{0}' out of the accepted 2000-2100 range")]
    YearOutOfRange(String),
}

fn parse_year(raw: &str, key: &str) -> Result<i32, RoundKeyError> {
    let year: i32 = raw
        .parse()
        .map_err(|_| RoundKeyError::Malformed(key.to_string()))?;
    if !(2000..=2100).contains(&year) {
        return Err(RoundKeyError::YearOutOfRange(raw.to_string()));
    }
    Ok(year)
}

impl FromStr for TransferRound {
    type Err = RoundKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim();
        if let Some(rest) = key.strip_prefix("general_") {
            let year = parse_year(rest, key)?;
            return Ok(TransferRound::General { year });
        }
        if let Some(rest) = key.strip_prefix("regular_") {
            let (month_raw, year_raw) = rest
                .rsplit_once('_')
                .ok_or_else(|| RoundKeyError::Malformed(key.to_string()))?;
            let month = month_raw.parse::<Month>()?;
            let year = parse_year(year_raw, key)?;
            return Ok(TransferRound::Regular { month, year });
        }
        Err(RoundKeyError::Malformed(key.to_string()))
    }
}

/// Per-round record counts shown on the round management screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round: TransferRound,
    pub key: String,
    pub label: String,
    pub roster: usize,
    pub applied: usize,
    pub draft: usize,
    pub confirmed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip() {
        let general = TransferRound::General { year: 2026 };
        assert_eq!(general.key(), "general_2026");
        assert_eq!("general_2026".parse::<TransferRound>().unwrap(), general);

        let regular = TransferRound::Regular {
            month: Month::June,
            year: 2025,
        };
        assert_eq!(regular.key(), "regular_june_2025");
        assert_eq!("regular_june_2025".parse::<TransferRound>().unwrap(), regular);
        assert_eq!(regular.label(), "Regular Transfer - June 2025");
    }

    #[test]
    fn rejects_malformed_and_out_of_range_keys() {
        assert!(matches!(
            "weekly_2026".parse::<TransferRound>(),
            Err(RoundKeyError::Malformed(_))
        ));
        assert!(matches!(
            "regular_smarch_2026".parse::<TransferRound>(),
            Err(RoundKeyError::UnknownMonth(_))
        ));
        assert!(matches!(
            "general_1234".parse::<TransferRound>(),
            Err(RoundKeyError::YearOutOfRange(_))
        ));
    }
}
