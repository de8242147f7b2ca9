use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::district::District;

pub const DEFAULT_DESIGNATION: &str = "JPHN Gr I";

/// Permanent employee number, the identity every table is keyed by.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pen(pub String);

impl Pen {
    pub fn new(raw: impl Into<String>) -> Self {
        Pen(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Pen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Service protection claim carried by some employees; lower priority numbers
/// are considered first during auto-fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightageClaim {
    pub details: String,
    pub priority: u8,
}

pub const DEFAULT_WEIGHTAGE_PRIORITY: u8 = 5;

impl WeightageClaim {
    pub fn new(details: impl Into<String>, priority: u8) -> Self {
        WeightageClaim {
            details: details.into(),
            priority: priority.clamp(1, DEFAULT_WEIGHTAGE_PRIORITY),
        }
    }
}

/// One cadre roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub pen: Pen,
    pub name: String,
    pub designation: String,
    pub institution: String,
    pub district: District,
    pub entry_date: Option<NaiveDate>,
    pub retirement_date: Option<NaiveDate>,
    pub district_join_date: Option<NaiveDate>,
    pub contact: String,
    pub weightage: Option<WeightageClaim>,
}

impl EmployeeRecord {
    /// Days served in the present district as of `today`. Records without a
    /// district join date sort as freshest.
    pub fn seniority_days(&self, today: NaiveDate) -> i64 {
        self.district_join_date
            .map(|joined| (today - joined).num_days().max(0))
            .unwrap_or(0)
    }

    pub fn weightage_priority(&self) -> u8 {
        self.weightage
            .as_ref()
            .map(|claim| claim.priority)
            .unwrap_or(DEFAULT_WEIGHTAGE_PRIORITY)
    }
}

/// Render a day count as `xY yM zD`, the format used across all listings.
pub fn format_duration(days: i64) -> String {
    if days <= 0 {
        return "0D".to_string();
    }
    let years = days / 365;
    let remaining = days % 365;
    let months = remaining / 30;
    let left = remaining % 30;

    let mut parts = Vec::new();
    if years > 0 {
        parts.push(format!("{years}Y"));
    }
    if months > 0 {
        parts.push(format!("{months}M"));
    }
    if left > 0 || parts.is_empty() {
        parts.push(format!("{left}D"));
    }
    parts.join(" ")
}

/// Dates arrive as `dd-mm-yyyy` in both forms and uploads.
pub fn parse_service_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(trimmed, "%d-%m-%Y").ok()
}

#[derive(Debug, thiserror::Error)]
pub enum RosterImportError {
    #[error("failed to read roster file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid roster CSV data: {0}")]
    Csv(#[from] csv::Error),
}

/// Outcome of a bulk roster upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterImport {
    #[serde(skip)]
    pub records: Vec<EmployeeRecord>,
    pub imported: usize,
    pub skipped: usize,
}

/// Reads cadre rows from the department's CSV layout:
/// Name, PEN, Designation, Institution, District, Entry Date, Retirement
/// Date, District Join Date, ..., Contact (column 12). Rows missing a PEN or
/// name are skipped and counted.
pub struct RosterCsvImporter;

impl RosterCsvImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<RosterImport, RosterImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<RosterImport, RosterImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for row in csv_reader.records() {
            let row = row?;
            let field = |index: usize| row.get(index).unwrap_or("").trim().to_string();

            let name = field(0).to_uppercase();
            let pen = field(1);
            if pen.is_empty() || name.is_empty() {
                skipped += 1;
                continue;
            }

            let district = match field(4).parse::<District>() {
                Ok(district) => district,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };

            let designation = {
                let raw = field(2);
                if raw.is_empty() {
                    DEFAULT_DESIGNATION.to_string()
                } else {
                    raw
                }
            };

            records.push(EmployeeRecord {
                pen: Pen::new(pen),
                name,
                designation,
                institution: field(3),
                district,
                entry_date: parse_service_date(&field(5)),
                retirement_date: parse_service_date(&field(6)),
                district_join_date: parse_service_date(&field(7)),
                contact: field(11),
                weightage: None,
            });
        }

        let imported = records.len();
        Ok(RosterImport {
            records,
            imported,
            skipped,
        })
    }
}
