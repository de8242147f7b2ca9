//! Round-scoped operations composing the store, the roster and the
//! allocation engine. Handlers and the CLI talk to this facade only.

use std::io::Read;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::allocation::{AllocationEngine, AllocationError, AllocationOptions, AllocationOutcome};
use super::application::{
    validate_preferences, PreferenceError, TransferApplication, MAX_PREFERENCES,
};
use super::district::District;
use super::lists::{DraftPlacement, FinalPlacement, PlacementReason};
use super::roster::{
    format_duration, EmployeeRecord, Pen, RosterCsvImporter, RosterImport, RosterImportError,
    WeightageClaim,
};
use super::round::{RoundSummary, TransferRound};
use super::store::{RoundState, RoundStore, StoreError};
use super::vacancy::{DistrictVacancyView, VacancySlot, VacancyUpdate};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("employee {0} is not on the roster")]
    EmployeeNotFound(Pen),
    #[error("employee {0} is already on the roster")]
    DuplicatePen(Pen),
    #[error("no application on file for {0}")]
    ApplicationNotFound(Pen),
    #[error("{0} is already on the draft list")]
    AlreadyDrafted(Pen),
    #[error("{0} is not on the draft list")]
    DraftMissing(Pen),
    #[error("{0} is not on the final list")]
    FinalMissing(Pen),
    #[error("{district} reported {reported} vacancies and all are filled")]
    VacancyOverflow { district: District, reported: u32 },
    #[error("auto-fill has not been run for this round")]
    AutofillNotRun,
    #[error("the draft list has not been confirmed yet")]
    NotConfirmed,
    #[error("the draft list is empty")]
    EmptyDraft,
    #[error(transparent)]
    Preference(#[from] PreferenceError),
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Import(#[from] RosterImportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Roster row joined with derived seniority, as shown on the cadre pages.
#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    #[serde(flatten)]
    pub record: EmployeeRecord,
    pub seniority_days: i64,
    pub duration: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RosterQuery {
    pub district: Option<District>,
    pub search: Option<String>,
}

/// Bulk "mark applied" payload; also carries an optional weightage change
/// to apply to the roster record at the same time.
#[derive(Debug, Clone, Deserialize)]
pub struct ApplicationForm {
    pub pen: Pen,
    #[serde(default)]
    pub applied_on: Option<NaiveDate>,
    #[serde(default)]
    pub receipt_numbers: String,
    pub preferences: Vec<District>,
    #[serde(default)]
    pub special_priority: bool,
    #[serde(default)]
    pub special_priority_reason: Option<String>,
    #[serde(default)]
    pub weightage: Option<WeightageClaim>,
    #[serde(default)]
    pub clear_weightage: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppliedSort {
    #[default]
    FromDistrict,
    FirstPreference,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppliedQuery {
    pub from_district: Option<District>,
    pub preferred: Option<District>,
    #[serde(default)]
    pub sort: AppliedSort,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedEntry {
    #[serde(flatten)]
    pub application: TransferApplication,
    pub name: String,
    pub institution: String,
    pub from_district: District,
    pub weightage: Option<WeightageClaim>,
    pub seniority_days: i64,
    pub duration: String,
    /// Rank at which the applicant listed the queried district, when the
    /// listing is filtered by preferred district.
    pub matched_rank: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AppliedListing {
    pub entries: Vec<AppliedEntry>,
    /// Per-rank applicant counts for the preferred-district filter; empty
    /// when no such filter is active.
    pub rank_counts: Vec<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub from_district: Option<District>,
    pub to_district: Option<District>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftEntry {
    pub pen: Pen,
    pub name: String,
    pub institution: String,
    pub from_district: District,
    pub to_district: District,
    pub added_on: NaiveDate,
    pub duration: String,
    pub has_weightage: bool,
    pub reason: PlacementReason,
    pub remarks: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FinalEntry {
    pub pen: Pen,
    pub name: String,
    pub institution: String,
    pub from_district: District,
    pub to_district: District,
    pub confirmed_on: NaiveDate,
    pub duration: String,
    pub has_weightage: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DashboardStats {
    pub roster: usize,
    pub applied: usize,
    pub locked: usize,
    pub reported_vacancies: u32,
    pub draft: usize,
    /// Draft placements counted as filled vacancies; stays zero until
    /// auto-fill has run.
    pub filled: usize,
    pub confirmed: usize,
}

pub struct TransferService<S> {
    store: Arc<S>,
}

impl<S> Clone for TransferService<S> {
    fn clone(&self) -> Self {
        TransferService {
            store: Arc::clone(&self.store),
        }
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

impl<S: RoundStore> TransferService<S> {
    pub fn new(store: Arc<S>) -> Self {
        TransferService { store }
    }

    // ------------------------------------------------------------- rounds

    pub fn open_round(&self, round: &TransferRound) -> Result<RoundSummary, ServiceError> {
        self.store.create(round)?;
        tracing::info!(round = %round.key(), "transfer round opened");
        Ok(RoundState::default().summary(round))
    }

    pub fn rounds(&self) -> Result<Vec<RoundSummary>, ServiceError> {
        Ok(self.store.summaries()?)
    }

    pub fn delete_round(&self, round: &TransferRound) -> Result<(), ServiceError> {
        self.store.delete(round)?;
        Ok(())
    }

    /// Full snapshot of one round, for the export writers.
    pub fn snapshot(&self, round: &TransferRound) -> Result<RoundState, ServiceError> {
        Ok(self.store.load(round)?)
    }

    // ------------------------------------------------------------- roster

    pub fn roster(
        &self,
        round: &TransferRound,
        query: &RosterQuery,
    ) -> Result<Vec<RosterEntry>, ServiceError> {
        let state = self.store.load(round)?;
        let now = today();
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase);

        let mut entries: Vec<RosterEntry> = state
            .roster
            .values()
            .filter(|record| query.district.map_or(true, |d| record.district == d))
            .filter(|record| match &needle {
                None => true,
                Some(needle) => {
                    record.pen.as_str().to_lowercase().contains(needle)
                        || record.name.to_lowercase().contains(needle)
                        || record.institution.to_lowercase().contains(needle)
                }
            })
            .map(|record| roster_entry(record, now))
            .collect();

        entries.sort_by(|a, b| {
            a.record
                .district
                .cmp(&b.record.district)
                .then_with(|| a.record.name.cmp(&b.record.name))
        });
        Ok(entries)
    }

    pub fn add_employee(
        &self,
        round: &TransferRound,
        record: EmployeeRecord,
    ) -> Result<(), ServiceError> {
        let mut state = self.store.load(round)?;
        if state.roster.contains_key(&record.pen) {
            return Err(ServiceError::DuplicatePen(record.pen));
        }
        state.roster.insert(record.pen.clone(), record);
        self.store.save(round, state)?;
        Ok(())
    }

    pub fn update_employee(
        &self,
        round: &TransferRound,
        record: EmployeeRecord,
    ) -> Result<(), ServiceError> {
        let mut state = self.store.load(round)?;
        if !state.roster.contains_key(&record.pen) {
            return Err(ServiceError::EmployeeNotFound(record.pen));
        }
        state.roster.insert(record.pen.clone(), record);
        self.store.save(round, state)?;
        Ok(())
    }

    /// Removes the roster record along with any application or list entries
    /// keyed by the same PEN.
    pub fn remove_employee(&self, round: &TransferRound, pen: &Pen) -> Result<(), ServiceError> {
        let mut state = self.store.load(round)?;
        if state.roster.remove(pen).is_none() {
            return Err(ServiceError::EmployeeNotFound(pen.clone()));
        }
        state.applications.remove(pen);
        state.draft.remove(pen);
        state.final_list.remove(pen);
        self.store.save(round, state)?;
        Ok(())
    }

    pub fn import_roster<R: Read>(
        &self,
        round: &TransferRound,
        reader: R,
        replace: bool,
    ) -> Result<RosterImport, ServiceError> {
        let mut state = self.store.load(round)?;
        let import = RosterCsvImporter::from_reader(reader)?;
        if replace {
            state.roster.clear();
        }
        for record in &import.records {
            state.roster.insert(record.pen.clone(), record.clone());
        }
        tracing::info!(
            round = %round.key(),
            imported = import.imported,
            skipped = import.skipped,
            "roster import finished"
        );
        self.store.save(round, state)?;
        Ok(import)
    }

    // ---------------------------------------------------------- vacancies

    pub fn vacancies(
        &self,
        round: &TransferRound,
    ) -> Result<Vec<(District, VacancySlot)>, ServiceError> {
        let state = self.store.load(round)?;
        Ok(District::ALL
            .into_iter()
            .map(|district| {
                (
                    district,
                    state.vacancies.get(&district).copied().unwrap_or_default(),
                )
            })
            .collect())
    }

    pub fn save_vacancies(
        &self,
        round: &TransferRound,
        updates: &[VacancyUpdate],
    ) -> Result<(), ServiceError> {
        let mut state = self.store.load(round)?;
        for update in updates {
            state.vacancies.insert(
                update.district,
                VacancySlot {
                    total_strength: update.total_strength,
                    reported: update.reported,
                },
            );
        }
        self.store.save(round, state)?;
        Ok(())
    }

    pub fn vacancy_overview(
        &self,
        round: &TransferRound,
    ) -> Result<Vec<DistrictVacancyView>, ServiceError> {
        let state = self.store.load(round)?;
        Ok(District::ALL
            .into_iter()
            .map(|district| {
                let slot = state.vacancies.get(&district).copied().unwrap_or_default();

                let applied_from = state
                    .applications
                    .values()
                    .filter(|a| {
                        state
                            .roster
                            .get(&a.pen)
                            .is_some_and(|r| r.district == district)
                    })
                    .count() as u32;
                let applied_to_first = state
                    .applications
                    .values()
                    .filter(|a| a.first_preference() == Some(district))
                    .count() as u32;
                let applied_to_other = state
                    .applications
                    .values()
                    .filter(|a| a.preference_rank(district).is_some_and(|rank| rank > 1))
                    .count() as u32;

                // Movement-derived columns stay zero until auto-fill runs.
                let (filled, cascade, displaced) = if state.autofill_ran {
                    let filled = state
                        .draft
                        .values()
                        .filter(|p| p.to_district == district)
                        .count() as u32;
                    let cascade = state
                        .draft
                        .values()
                        .filter(|p| {
                            !matches!(p.reason, PlacementReason::Against { .. })
                                && p.to_district != district
                                && state
                                    .roster
                                    .get(&p.pen)
                                    .is_some_and(|r| r.district == district)
                        })
                        .count() as u32;
                    let displaced = state
                        .draft
                        .values()
                        .filter(|p| {
                            p.reason.is_displacement()
                                && state
                                    .roster
                                    .get(&p.pen)
                                    .is_some_and(|r| r.district == district)
                        })
                        .count() as u32;
                    (filled, cascade, displaced)
                } else {
                    (0, 0, 0)
                };

                DistrictVacancyView::from_counts(
                    district,
                    slot,
                    displaced,
                    applied_from,
                    applied_to_first,
                    applied_to_other,
                    cascade,
                    filled,
                )
            })
            .collect())
    }

    // ------------------------------------------------------- applications

    /// Roster members who have not applied in this round, most senior first.
    pub fn pending_applicants(
        &self,
        round: &TransferRound,
        district: Option<District>,
    ) -> Result<Vec<RosterEntry>, ServiceError> {
        let state = self.store.load(round)?;
        let now = today();
        let mut entries: Vec<RosterEntry> = state
            .roster
            .values()
            .filter(|record| district.map_or(true, |d| record.district == d))
            .filter(|record| !state.applications.contains_key(&record.pen))
            .map(|record| roster_entry(record, now))
            .collect();
        entries.sort_by(|a, b| {
            b.seniority_days
                .cmp(&a.seniority_days)
                .then_with(|| a.record.pen.cmp(&b.record.pen))
        });
        Ok(entries)
    }

    pub fn mark_applied(
        &self,
        round: &TransferRound,
        forms: Vec<ApplicationForm>,
    ) -> Result<usize, ServiceError> {
        let mut state = self.store.load(round)?;
        let now = today();
        let count = forms.len();
        for form in forms {
            apply_form(&mut state, form, now)?;
        }
        self.store.save(round, state)?;
        Ok(count)
    }

    pub fn update_application(
        &self,
        round: &TransferRound,
        form: ApplicationForm,
    ) -> Result<(), ServiceError> {
        let mut state = self.store.load(round)?;
        if !state.applications.contains_key(&form.pen) {
            return Err(ServiceError::ApplicationNotFound(form.pen));
        }
        apply_form(&mut state, form, today())?;
        self.store.save(round, state)?;
        Ok(())
    }

    pub fn remove_application(&self, round: &TransferRound, pen: &Pen) -> Result<(), ServiceError> {
        let mut state = self.store.load(round)?;
        if state.applications.remove(pen).is_none() {
            return Err(ServiceError::ApplicationNotFound(pen.clone()));
        }
        self.store.save(round, state)?;
        Ok(())
    }

    pub fn clear_applications(&self, round: &TransferRound) -> Result<usize, ServiceError> {
        let mut state = self.store.load(round)?;
        let removed = state.applications.len();
        state.applications.clear();
        self.store.save(round, state)?;
        Ok(removed)
    }

    pub fn set_lock(
        &self,
        round: &TransferRound,
        pen: &Pen,
        locked: bool,
    ) -> Result<(), ServiceError> {
        let mut state = self.store.load(round)?;
        match state.applications.get_mut(pen) {
            Some(application) => application.locked = locked,
            None => return Err(ServiceError::ApplicationNotFound(pen.clone())),
        }
        self.store.save(round, state)?;
        Ok(())
    }

    pub fn unlock_all(&self, round: &TransferRound) -> Result<usize, ServiceError> {
        let mut state = self.store.load(round)?;
        let mut unlocked = 0;
        for application in state.applications.values_mut() {
            if application.locked {
                application.locked = false;
                unlocked += 1;
            }
        }
        self.store.save(round, state)?;
        Ok(unlocked)
    }

    pub fn applied(
        &self,
        round: &TransferRound,
        query: &AppliedQuery,
    ) -> Result<AppliedListing, ServiceError> {
        let state = self.store.load(round)?;
        let now = today();

        let rank_counts = match query.preferred {
            Some(district) => {
                let mut counts = vec![0u32; MAX_PREFERENCES];
                for application in state.applications.values() {
                    if let Some(rank) = application.preference_rank(district) {
                        counts[rank as usize - 1] += 1;
                    }
                }
                counts
            }
            None => Vec::new(),
        };

        let mut entries: Vec<AppliedEntry> = state
            .applications
            .values()
            .filter_map(|application| {
                let record = state.roster.get(&application.pen)?;
                if let Some(from) = query.from_district {
                    if record.district != from {
                        return None;
                    }
                }
                let matched_rank = match query.preferred {
                    Some(district) => Some(application.preference_rank(district)?),
                    None => None,
                };
                Some(AppliedEntry {
                    application: application.clone(),
                    name: record.name.clone(),
                    institution: record.institution.clone(),
                    from_district: record.district,
                    weightage: record.weightage.clone(),
                    seniority_days: record.seniority_days(now),
                    duration: format_duration(record.seniority_days(now)),
                    matched_rank,
                })
            })
            .collect();

        if query.preferred.is_some() {
            entries.sort_by(|a, b| {
                a.matched_rank
                    .cmp(&b.matched_rank)
                    .then_with(|| b.seniority_days.cmp(&a.seniority_days))
                    .then_with(|| a.application.pen.cmp(&b.application.pen))
            });
        } else {
            entries.sort_by(|a, b| {
                let key = match query.sort {
                    AppliedSort::FromDistrict => a.from_district.cmp(&b.from_district),
                    AppliedSort::FirstPreference => {
                        // Applicants without preferences sort last.
                        match (a.application.first_preference(), b.application.first_preference()) {
                            (Some(x), Some(y)) => x.cmp(&y),
                            (Some(_), None) => std::cmp::Ordering::Less,
                            (None, Some(_)) => std::cmp::Ordering::Greater,
                            (None, None) => std::cmp::Ordering::Equal,
                        }
                    }
                };
                key.then_with(|| {
                    b.application
                        .special_priority
                        .cmp(&a.application.special_priority)
                })
                .then_with(|| b.weightage.is_some().cmp(&a.weightage.is_some()))
                .then_with(|| {
                    let pa = a.weightage.as_ref().map(|w| w.priority).unwrap_or(u8::MAX);
                    let pb = b.weightage.as_ref().map(|w| w.priority).unwrap_or(u8::MAX);
                    pa.cmp(&pb)
                })
                .then_with(|| b.seniority_days.cmp(&a.seniority_days))
                .then_with(|| a.application.pen.cmp(&b.application.pen))
            });
        }

        Ok(AppliedListing {
            entries,
            rank_counts,
        })
    }

    // --------------------------------------------------------- allocation

    pub fn run_autofill(
        &self,
        round: &TransferRound,
        options: AllocationOptions,
    ) -> Result<AllocationOutcome, ServiceError> {
        let mut state = self.store.load(round)?;
        let outcome = AllocationEngine::new(
            &state.roster,
            &state.applications,
            &state.vacancies,
            &state.draft,
            today(),
            options,
        )
        .run()?;

        for placement in &outcome.placements {
            state.draft.insert(placement.pen.clone(), placement.clone());
        }
        state.autofill_ran = true;
        self.store.save(round, state)?;

        tracing::info!(
            round = %round.key(),
            placed = outcome.tally.total,
            unplaced = outcome.tally.unplaced,
            against = outcome.tally.against,
            "auto-fill finished"
        );
        Ok(outcome)
    }

    // -------------------------------------------------------------- draft

    pub fn draft(
        &self,
        round: &TransferRound,
        query: &ListQuery,
    ) -> Result<Vec<DraftEntry>, ServiceError> {
        let state = self.store.load(round)?;
        if !state.autofill_ran {
            return Err(ServiceError::AutofillNotRun);
        }
        let now = today();
        let mut entries: Vec<DraftEntry> = state
            .draft
            .values()
            .filter_map(|placement| {
                let record = state.roster.get(&placement.pen)?;
                if let Some(from) = query.from_district {
                    if record.district != from {
                        return None;
                    }
                }
                if let Some(to) = query.to_district {
                    if placement.to_district != to {
                        return None;
                    }
                }
                Some(DraftEntry {
                    pen: placement.pen.clone(),
                    name: record.name.clone(),
                    institution: record.institution.clone(),
                    from_district: record.district,
                    to_district: placement.to_district,
                    added_on: placement.added_on,
                    duration: format_duration(record.seniority_days(now)),
                    has_weightage: record.weightage.is_some(),
                    reason: placement.reason.clone(),
                    remarks: placement.reason.remarks(),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            a.to_district
                .cmp(&b.to_district)
                .then_with(|| a.from_district.cmp(&b.from_district))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    /// Manual draft entry. Refused when the target district reported
    /// vacancies and they are all taken.
    pub fn add_draft(
        &self,
        round: &TransferRound,
        pen: &Pen,
        to_district: District,
    ) -> Result<(), ServiceError> {
        let mut state = self.store.load(round)?;
        if !state.roster.contains_key(pen) {
            return Err(ServiceError::EmployeeNotFound(pen.clone()));
        }
        if state.draft.contains_key(pen) {
            return Err(ServiceError::AlreadyDrafted(pen.clone()));
        }
        let reported = state
            .vacancies
            .get(&to_district)
            .map(|slot| slot.reported)
            .unwrap_or(0);
        if reported > 0 {
            let filled = state
                .draft
                .values()
                .filter(|p| p.to_district == to_district)
                .count() as u32;
            if filled >= reported {
                return Err(ServiceError::VacancyOverflow {
                    district: to_district,
                    reported,
                });
            }
        }
        state.draft.insert(
            pen.clone(),
            DraftPlacement {
                pen: pen.clone(),
                to_district,
                added_on: today(),
                reason: PlacementReason::Manual,
            },
        );
        self.store.save(round, state)?;
        Ok(())
    }

    pub fn remove_draft(&self, round: &TransferRound, pen: &Pen) -> Result<(), ServiceError> {
        let mut state = self.store.load(round)?;
        if state.draft.remove(pen).is_none() {
            return Err(ServiceError::DraftMissing(pen.clone()));
        }
        self.store.save(round, state)?;
        Ok(())
    }

    pub fn clear_draft(&self, round: &TransferRound) -> Result<usize, ServiceError> {
        let mut state = self.store.load(round)?;
        let removed = state.draft.len();
        state.draft.clear();
        state.autofill_ran = false;
        self.store.save(round, state)?;
        Ok(removed)
    }

    /// Applicants who did not make it onto the draft list.
    pub fn draft_excluded(&self, round: &TransferRound) -> Result<AppliedListing, ServiceError> {
        self.excluded_from(round, |state, pen| state.draft.contains_key(pen))
    }

    /// Copies the draft into the final list, replacing any previous
    /// confirmation.
    pub fn confirm(&self, round: &TransferRound) -> Result<usize, ServiceError> {
        let mut state = self.store.load(round)?;
        if state.draft.is_empty() {
            return Err(ServiceError::EmptyDraft);
        }
        let now = today();
        state.final_list.clear();
        for placement in state.draft.values() {
            state.final_list.insert(
                placement.pen.clone(),
                FinalPlacement {
                    pen: placement.pen.clone(),
                    to_district: placement.to_district,
                    confirmed_on: now,
                },
            );
        }
        let confirmed = state.final_list.len();
        self.store.save(round, state)?;
        tracing::info!(round = %round.key(), confirmed, "draft list confirmed");
        Ok(confirmed)
    }

    // -------------------------------------------------------------- final

    pub fn final_list(
        &self,
        round: &TransferRound,
        query: &ListQuery,
    ) -> Result<Vec<FinalEntry>, ServiceError> {
        let state = self.store.load(round)?;
        if state.final_list.is_empty() {
            return Err(ServiceError::NotConfirmed);
        }
        let now = today();
        let mut entries: Vec<FinalEntry> = state
            .final_list
            .values()
            .filter_map(|placement| {
                let record = state.roster.get(&placement.pen)?;
                if let Some(from) = query.from_district {
                    if record.district != from {
                        return None;
                    }
                }
                if let Some(to) = query.to_district {
                    if placement.to_district != to {
                        return None;
                    }
                }
                Some(FinalEntry {
                    pen: placement.pen.clone(),
                    name: record.name.clone(),
                    institution: record.institution.clone(),
                    from_district: record.district,
                    to_district: placement.to_district,
                    confirmed_on: placement.confirmed_on,
                    duration: format_duration(record.seniority_days(now)),
                    has_weightage: record.weightage.is_some(),
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            a.to_district
                .cmp(&b.to_district)
                .then_with(|| a.from_district.cmp(&b.from_district))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    pub fn remove_final(&self, round: &TransferRound, pen: &Pen) -> Result<(), ServiceError> {
        let mut state = self.store.load(round)?;
        if state.final_list.remove(pen).is_none() {
            return Err(ServiceError::FinalMissing(pen.clone()));
        }
        self.store.save(round, state)?;
        Ok(())
    }

    /// Drops the confirmed list; the draft stays intact and editable.
    pub fn revert_confirmation(&self, round: &TransferRound) -> Result<usize, ServiceError> {
        let mut state = self.store.load(round)?;
        let removed = state.final_list.len();
        state.final_list.clear();
        self.store.save(round, state)?;
        Ok(removed)
    }

    pub fn final_excluded(&self, round: &TransferRound) -> Result<AppliedListing, ServiceError> {
        self.excluded_from(round, |state, pen| state.final_list.contains_key(pen))
    }

    fn excluded_from(
        &self,
        round: &TransferRound,
        included: impl Fn(&RoundState, &Pen) -> bool,
    ) -> Result<AppliedListing, ServiceError> {
        let state = self.store.load(round)?;
        let now = today();
        let mut entries: Vec<AppliedEntry> = state
            .applications
            .values()
            .filter(|application| !included(&state, &application.pen))
            .filter_map(|application| {
                let record = state.roster.get(&application.pen)?;
                Some(AppliedEntry {
                    application: application.clone(),
                    name: record.name.clone(),
                    institution: record.institution.clone(),
                    from_district: record.district,
                    weightage: record.weightage.clone(),
                    seniority_days: record.seniority_days(now),
                    duration: format_duration(record.seniority_days(now)),
                    matched_rank: None,
                })
            })
            .collect();
        entries.sort_by(|a, b| {
            a.from_district
                .cmp(&b.from_district)
                .then_with(|| b.seniority_days.cmp(&a.seniority_days))
                .then_with(|| a.application.pen.cmp(&b.application.pen))
        });
        Ok(AppliedListing {
            entries,
            rank_counts: Vec::new(),
        })
    }

    // ---------------------------------------------------------- dashboard

    pub fn dashboard(&self, round: &TransferRound) -> Result<DashboardStats, ServiceError> {
        let state = self.store.load(round)?;
        Ok(DashboardStats {
            roster: state.roster.len(),
            applied: state.applications.len(),
            locked: state.applications.values().filter(|a| a.locked).count(),
            reported_vacancies: state.vacancies.values().map(|slot| slot.reported).sum(),
            draft: state.draft.len(),
            filled: if state.autofill_ran {
                state.draft.len()
            } else {
                0
            },
            confirmed: state.final_list.len(),
        })
    }
}

fn roster_entry(record: &EmployeeRecord, now: NaiveDate) -> RosterEntry {
    let days = record.seniority_days(now);
    RosterEntry {
        record: record.clone(),
        seniority_days: days,
        duration: format_duration(days),
    }
}

fn apply_form(
    state: &mut RoundState,
    form: ApplicationForm,
    now: NaiveDate,
) -> Result<(), ServiceError> {
    let Some(record) = state.roster.get_mut(&form.pen) else {
        return Err(ServiceError::EmployeeNotFound(form.pen));
    };
    validate_preferences(&form.preferences)?;

    if let Some(claim) = form.weightage {
        record.weightage = Some(claim);
    } else if form.clear_weightage {
        record.weightage = None;
    }

    let locked = state
        .applications
        .get(&form.pen)
        .map(|existing| existing.locked)
        .unwrap_or(false);
    state.applications.insert(
        form.pen.clone(),
        TransferApplication {
            pen: form.pen,
            applied_on: form.applied_on.unwrap_or(now),
            receipt_numbers: form.receipt_numbers,
            preferences: form.preferences,
            special_priority: form.special_priority,
            special_priority_reason: form.special_priority_reason,
            locked,
        },
    );
    Ok(())
}
