use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::district::District;
use super::roster::Pen;

pub const MAX_PREFERENCES: usize = 8;

/// A transfer request filed by one employee for the current round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferApplication {
    pub pen: Pen,
    pub applied_on: NaiveDate,
    pub receipt_numbers: String,
    /// Ranked district choices, most wanted first.
    pub preferences: Vec<District>,
    pub special_priority: bool,
    pub special_priority_reason: Option<String>,
    /// Locked applications are held back from auto-fill.
    pub locked: bool,
}

impl TransferApplication {
    pub fn first_preference(&self) -> Option<District> {
        self.preferences.first().copied()
    }

    /// 1-based rank of `district` among the preferences, if listed.
    pub fn preference_rank(&self, district: District) -> Option<u8> {
        self.preferences
            .iter()
            .position(|choice| *choice == district)
            .map(|index| index as u8 + 1)
    }

    pub fn has_preferences(&self) -> bool {
        !self.preferences.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreferenceError {
    #[error("at most {MAX_PREFERENCES} district preferences are accepted, got {0}")]
    TooMany(usize),
    #[error("district '{0}' appears more than once in the preference list")]
    Duplicate(District),
}

/// Validate a ranked preference list before it is stored.
pub fn validate_preferences(preferences: &[District]) -> Result<(), PreferenceError> {
    if preferences.len() > MAX_PREFERENCES {
        return Err(PreferenceError::TooMany(preferences.len()));
    }
    for (index, district) in preferences.iter().enumerate() {
        if preferences[..index].contains(district) {
            return Err(PreferenceError::Duplicate(*district));
        }
    }
    Ok(())
}
