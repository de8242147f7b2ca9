//! CSV downloads for the cadre, applied, draft and final lists. Column sets
//! match the sheets the transfer cell circulates.

use chrono::NaiveDate;

use super::application::MAX_PREFERENCES;
use super::service::{AppliedEntry, DraftEntry, FinalEntry, RosterEntry};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to encode csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to finish csv output: {0}")]
    Finish(String),
}

fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%d-%m-%Y").to_string())
        .unwrap_or_default()
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = writer
        .into_inner()
        .map_err(|err| ExportError::Finish(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| ExportError::Finish(err.to_string()))
}

pub fn cadre_csv(entries: &[RosterEntry]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "PEN",
        "Name",
        "Designation",
        "Institution",
        "District",
        "Entry Date",
        "Retirement Date",
        "District Join Date",
        "Duration",
        "Contact",
    ])?;
    for entry in entries {
        let record = &entry.record;
        writer.write_record([
            record.pen.as_str(),
            &record.name,
            &record.designation,
            &record.institution,
            record.district.name(),
            &format_date(record.entry_date),
            &format_date(record.retirement_date),
            &format_date(record.district_join_date),
            &entry.duration,
            &record.contact,
        ])?;
    }
    finish(writer)
}

pub fn applied_csv(entries: &[AppliedEntry]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut header = vec![
        "PEN".to_string(),
        "Name".to_string(),
        "Institution".to_string(),
        "From District".to_string(),
        "Applied Date".to_string(),
        "Receipt Numbers".to_string(),
    ];
    for rank in 1..=MAX_PREFERENCES {
        header.push(format!("Pref {rank}"));
    }
    header.push("Special Priority".to_string());
    header.push("Weightage".to_string());
    header.push("Locked".to_string());
    writer.write_record(&header)?;

    for entry in entries {
        let application = &entry.application;
        let mut row = vec![
            application.pen.as_str().to_string(),
            entry.name.clone(),
            entry.institution.clone(),
            entry.from_district.name().to_string(),
            format_date(Some(application.applied_on)),
            application.receipt_numbers.clone(),
        ];
        for rank in 0..MAX_PREFERENCES {
            row.push(
                application
                    .preferences
                    .get(rank)
                    .map(|d| d.name().to_string())
                    .unwrap_or_default(),
            );
        }
        row.push(yes_no(application.special_priority).to_string());
        row.push(yes_no(entry.weightage.is_some()).to_string());
        row.push(yes_no(application.locked).to_string());
        writer.write_record(&row)?;
    }
    finish(writer)
}

pub fn draft_csv(entries: &[DraftEntry]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "PEN",
        "Name",
        "Institution",
        "From District",
        "To District",
        "Duration",
        "Weightage",
        "Remarks",
    ])?;
    for entry in entries {
        writer.write_record([
            entry.pen.as_str(),
            &entry.name,
            &entry.institution,
            entry.from_district.name(),
            entry.to_district.name(),
            &entry.duration,
            yes_no(entry.has_weightage),
            &entry.remarks,
        ])?;
    }
    finish(writer)
}

pub fn final_csv(entries: &[FinalEntry]) -> Result<String, ExportError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record([
        "PEN",
        "Name",
        "Institution",
        "From District",
        "To District",
        "Duration",
        "Weightage",
    ])?;
    for entry in entries {
        writer.write_record([
            entry.pen.as_str(),
            &entry.name,
            &entry.institution,
            entry.from_district.name(),
            entry.to_district.name(),
            &entry.duration,
            yes_no(entry.has_weightage),
        ])?;
    }
    finish(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfers::district::District;
    use crate::transfers::lists::PlacementReason;
    use crate::transfers::roster::{EmployeeRecord, Pen, DEFAULT_DESIGNATION};

    #[test]
    fn cadre_csv_writes_service_dates_dd_mm_yyyy() {
        let record = EmployeeRecord {
            pen: Pen::new("700001"),
            name: "ANITHA R".to_string(),
            designation: DEFAULT_DESIGNATION.to_string(),
            institution: "PHC Vellanad".to_string(),
            district: District::Thiruvananthapuram,
            entry_date: NaiveDate::from_ymd_opt(2012, 6, 1),
            retirement_date: None,
            district_join_date: NaiveDate::from_ymd_opt(2019, 7, 15),
            contact: "9447000001".to_string(),
            weightage: None,
        };
        let entry = RosterEntry {
            record,
            seniority_days: 2421,
            duration: "6Y 7M 16D".to_string(),
        };
        let csv = cadre_csv(&[entry]).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("PEN,Name,Designation"));
        let row = lines.next().unwrap();
        assert!(row.contains("01-06-2012"));
        assert!(row.contains("15-07-2019"));
        assert!(row.contains("6Y 7M 16D"));
        // Blank retirement date stays an empty cell.
        assert!(row.contains(",,"));
    }

    #[test]
    fn draft_csv_carries_cascade_remark() {
        let entry = DraftEntry {
            pen: Pen::new("700002"),
            name: "MINI K".to_string(),
            institution: "CHC Adoor".to_string(),
            from_district: District::Pathanamthitta,
            to_district: District::Kollam,
            added_on: NaiveDate::from_ymd_opt(2026, 2, 1).unwrap(),
            duration: "4Y 0M 0D".to_string(),
            has_weightage: true,
            reason: PlacementReason::CascadeVacancy { rank: 2 },
            remarks: PlacementReason::CascadeVacancy { rank: 2 }.remarks(),
        };
        let csv = draft_csv(&[entry]).unwrap();
        assert!(csv.contains("Vacancy by Transfer"));
        assert!(csv.contains("Yes"));
    }
}
