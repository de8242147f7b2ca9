//! Draft auto-fill: matches applicants to district vacancies by ranked
//! preference, in three passes ordered by priority class, with cascading
//! vacancies and optional against transfers.

mod ledger;

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::application::TransferApplication;
use super::district::District;
use super::lists::{DraftPlacement, PlacementReason};
use super::roster::{EmployeeRecord, Pen};
use super::vacancy::VacancySlot;
use ledger::CapacityLedger;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationOptions {
    /// Allow displacing a senior non-applicant to a neighbouring district
    /// when an applicant's preferences are otherwise exhausted.
    #[serde(default)]
    pub enable_against: bool,
}

/// Counters reported back after a run, mirroring the completion notice the
/// operators are used to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationTally {
    pub total: u32,
    pub special: u32,
    pub weightage: u32,
    pub normal: u32,
    pub cascade: u32,
    pub against: u32,
    pub unplaced: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationOutcome {
    pub placements: Vec<DraftPlacement>,
    pub tally: AllocationTally,
    pub unplaced: Vec<Pen>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("no applicant has filed district preferences yet")]
    NoPreferences,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PriorityClass {
    Special,
    Weightage,
    Normal,
}

struct Candidate<'a> {
    record: &'a EmployeeRecord,
    application: &'a TransferApplication,
    seniority: i64,
}

pub struct AllocationEngine<'a> {
    roster: &'a BTreeMap<Pen, EmployeeRecord>,
    applications: &'a BTreeMap<Pen, TransferApplication>,
    today: NaiveDate,
    options: AllocationOptions,
    ledger: CapacityLedger,
    placed: BTreeSet<Pen>,
    placements: Vec<DraftPlacement>,
    tally: AllocationTally,
    unplaced: Vec<Pen>,
}

impl<'a> AllocationEngine<'a> {
    pub fn new(
        roster: &'a BTreeMap<Pen, EmployeeRecord>,
        applications: &'a BTreeMap<Pen, TransferApplication>,
        vacancies: &BTreeMap<District, VacancySlot>,
        existing_draft: &BTreeMap<Pen, DraftPlacement>,
        today: NaiveDate,
        options: AllocationOptions,
    ) -> Self {
        let mut already_filled: BTreeMap<District, u32> = BTreeMap::new();
        for placement in existing_draft.values() {
            *already_filled.entry(placement.to_district).or_default() += 1;
        }

        AllocationEngine {
            roster,
            applications,
            today,
            options,
            ledger: CapacityLedger::new(vacancies, &already_filled),
            placed: existing_draft.keys().cloned().collect(),
            placements: Vec::new(),
            tally: AllocationTally::default(),
            unplaced: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<AllocationOutcome, AllocationError> {
        if self
            .applications
            .values()
            .all(|application| !application.has_preferences())
        {
            return Err(AllocationError::NoPreferences);
        }

        self.run_pass(PriorityClass::Special);
        self.run_pass(PriorityClass::Weightage);
        self.run_pass(PriorityClass::Normal);

        self.tally.cascade = self.ledger.cascade_fills;
        self.tally.unplaced = self.unplaced.len() as u32;

        Ok(AllocationOutcome {
            placements: self.placements,
            tally: self.tally,
            unplaced: self.unplaced,
        })
    }

    /// Collect the applicants belonging to one priority class, ordered the
    /// way that class is processed:
    /// special priority by seniority descending, weightage by claim priority
    /// then seniority ascending, everyone else most junior first.
    fn candidates(&self, class: PriorityClass) -> Vec<Candidate<'a>> {
        let mut selected: Vec<Candidate<'a>> = self
            .applications
            .values()
            .filter(|application| {
                !application.locked
                    && application.has_preferences()
                    && !self.placed.contains(&application.pen)
            })
            .filter_map(|application| {
                let record = self.roster.get(&application.pen)?;
                let matches = match class {
                    PriorityClass::Special => application.special_priority,
                    PriorityClass::Weightage => {
                        !application.special_priority && record.weightage.is_some()
                    }
                    PriorityClass::Normal => {
                        !application.special_priority && record.weightage.is_none()
                    }
                };
                matches.then_some(Candidate {
                    record,
                    application,
                    seniority: record.seniority_days(self.today),
                })
            })
            .collect();

        selected.sort_by(|a, b| match class {
            PriorityClass::Special => b
                .seniority
                .cmp(&a.seniority)
                .then_with(|| a.record.pen.cmp(&b.record.pen)),
            PriorityClass::Weightage => a
                .record
                .weightage_priority()
                .cmp(&b.record.weightage_priority())
                .then(a.seniority.cmp(&b.seniority))
                .then_with(|| a.record.pen.cmp(&b.record.pen)),
            PriorityClass::Normal => a
                .seniority
                .cmp(&b.seniority)
                .then_with(|| a.record.pen.cmp(&b.record.pen)),
        });

        selected
    }

    fn run_pass(&mut self, class: PriorityClass) {
        for candidate in self.candidates(class) {
            let placed = self.try_preferences(&candidate)
                || (self.options.enable_against && self.try_against(&candidate));

            if placed {
                let counter = match class {
                    PriorityClass::Special => &mut self.tally.special,
                    PriorityClass::Weightage => &mut self.tally.weightage,
                    PriorityClass::Normal => &mut self.tally.normal,
                };
                *counter += 1;
            } else {
                self.unplaced.push(candidate.record.pen.clone());
            }
        }
    }

    fn try_preferences(&mut self, candidate: &Candidate<'a>) -> bool {
        for (index, preference) in candidate.application.preferences.iter().enumerate() {
            if !self.ledger.accepts(*preference) {
                continue;
            }
            let rank = index as u8 + 1;
            let reason = if self.ledger.next_fill_is_cascade(*preference) {
                PlacementReason::CascadeVacancy { rank }
            } else {
                PlacementReason::Preference { rank }
            };
            self.place(
                candidate.record.pen.clone(),
                Some(candidate.record.district),
                *preference,
                reason,
            );
            return true;
        }
        false
    }

    /// Displace the most senior non-applicant of the first preference to a
    /// neighbouring district with capacity, then seat the applicant in the
    /// vacated slot.
    fn try_against(&mut self, candidate: &Candidate<'a>) -> bool {
        let Some(wanted) = candidate.application.first_preference() else {
            return false;
        };

        let senior = self
            .roster
            .values()
            .filter(|record| {
                record.district == wanted
                    && record.pen != candidate.record.pen
                    && !self.placed.contains(&record.pen)
                    && !self.applications.contains_key(&record.pen)
            })
            .max_by(|a, b| {
                a.seniority_days(self.today)
                    .cmp(&b.seniority_days(self.today))
                    .then_with(|| b.pen.cmp(&a.pen))
            });
        let Some(senior) = senior else {
            return false;
        };

        let Some(target) = wanted
            .neighbours()
            .iter()
            .copied()
            .find(|neighbour| self.ledger.has_open_slot(*neighbour))
        else {
            return false;
        };

        self.place(
            senior.pen.clone(),
            Some(wanted),
            target,
            PlacementReason::Displaced {
                for_applicant: candidate.record.pen.clone(),
                applicant_name: candidate.record.name.clone(),
            },
        );

        let senior_name = senior.name.clone();
        let senior_pen = senior.pen.clone();
        self.place(
            candidate.record.pen.clone(),
            None,
            wanted,
            PlacementReason::Against {
                displaced: senior_pen,
                displaced_name: senior_name,
            },
        );
        self.tally.against += 1;
        true
    }

    fn place(
        &mut self,
        pen: Pen,
        source: Option<District>,
        to_district: District,
        reason: PlacementReason,
    ) {
        self.ledger.fill(to_district, source);
        self.placed.insert(pen.clone());
        self.placements.push(DraftPlacement {
            pen,
            to_district,
            added_on: self.today,
            reason,
        });
        self.tally.total += 1;
    }
}
