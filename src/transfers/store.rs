//! Round persistence. Every transfer round owns an isolated snapshot of
//! roster, applications, vacancies and the two lists; the store hands the
//! whole snapshot out and takes it back after mutation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use super::application::TransferApplication;
use super::district::District;
use super::lists::{DraftPlacement, FinalPlacement};
use super::roster::{EmployeeRecord, Pen};
use super::round::{RoundSummary, TransferRound};
use super::vacancy::VacancySlot;

/// Everything a round holds. Loaded as one unit so service operations see a
/// consistent view and the allocation engine can run on plain data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundState {
    pub roster: BTreeMap<Pen, EmployeeRecord>,
    pub applications: BTreeMap<Pen, TransferApplication>,
    pub vacancies: BTreeMap<District, VacancySlot>,
    pub draft: BTreeMap<Pen, DraftPlacement>,
    pub final_list: BTreeMap<Pen, FinalPlacement>,
    /// Set by auto-fill and cleared when the draft is cleared. Gate for the
    /// draft views and for the dashboard's filled counter.
    pub autofill_ran: bool,
}

impl RoundState {
    pub fn summary(&self, round: &TransferRound) -> RoundSummary {
        RoundSummary {
            round: round.clone(),
            key: round.key(),
            label: round.label(),
            roster: self.roster.len(),
            applied: self.applications.len(),
            draft: self.draft.len(),
            confirmed: self.final_list.len(),
        }
    }
}

/// Storage abstraction so the service module can be exercised in isolation.
pub trait RoundStore: Send + Sync {
    fn create(&self, round: &TransferRound) -> Result<(), StoreError>;
    fn exists(&self, round: &TransferRound) -> Result<bool, StoreError>;
    fn summaries(&self) -> Result<Vec<RoundSummary>, StoreError>;
    fn delete(&self, round: &TransferRound) -> Result<(), StoreError>;
    fn load(&self, round: &TransferRound) -> Result<RoundState, StoreError>;
    fn save(&self, round: &TransferRound, state: RoundState) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("round {0} does not exist")]
    UnknownRound(String),
    #[error("round {0} already exists")]
    Conflict(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Default, Clone)]
pub struct InMemoryRoundStore {
    rounds: Arc<RwLock<HashMap<String, (TransferRound, RoundState)>>>,
}

impl InMemoryRoundStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoundStore for InMemoryRoundStore {
    fn create(&self, round: &TransferRound) -> Result<(), StoreError> {
        let mut guard = self.rounds.write().expect("round store lock poisoned");
        let key = round.key();
        if guard.contains_key(&key) {
            return Err(StoreError::Conflict(key));
        }
        guard.insert(key, (round.clone(), RoundState::default()));
        Ok(())
    }

    fn exists(&self, round: &TransferRound) -> Result<bool, StoreError> {
        let guard = self.rounds.read().expect("round store lock poisoned");
        Ok(guard.contains_key(&round.key()))
    }

    fn summaries(&self) -> Result<Vec<RoundSummary>, StoreError> {
        let guard = self.rounds.read().expect("round store lock poisoned");
        let mut summaries: Vec<RoundSummary> = guard
            .values()
            .map(|(round, state)| state.summary(round))
            .collect();
        // Newest rounds first, general before regular within a year.
        summaries.sort_by(|a, b| {
            b.round
                .year()
                .cmp(&a.round.year())
                .then_with(|| a.key.cmp(&b.key))
        });
        Ok(summaries)
    }

    fn delete(&self, round: &TransferRound) -> Result<(), StoreError> {
        let mut guard = self.rounds.write().expect("round store lock poisoned");
        let key = round.key();
        guard
            .remove(&key)
            .map(|_| ())
            .ok_or(StoreError::UnknownRound(key))
    }

    fn load(&self, round: &TransferRound) -> Result<RoundState, StoreError> {
        let guard = self.rounds.read().expect("round store lock poisoned");
        let key = round.key();
        guard
            .get(&key)
            .map(|(_, state)| state.clone())
            .ok_or(StoreError::UnknownRound(key))
    }

    fn save(&self, round: &TransferRound, state: RoundState) -> Result<(), StoreError> {
        let mut guard = self.rounds.write().expect("round store lock poisoned");
        let key = round.key();
        match guard.get_mut(&key) {
            Some(entry) => {
                entry.1 = state;
                Ok(())
            }
            None => Err(StoreError::UnknownRound(key)),
        }
    }
}
