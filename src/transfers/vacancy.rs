use serde::{Deserialize, Serialize};

use super::district::District;

/// Sanctioned strength and reported vacancies for one district.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancySlot {
    pub total_strength: u32,
    pub reported: u32,
}

/// One row of the vacancy overview table. Transfer-derived columns (cascade,
/// filled, displaced, remaining) stay at zero until auto-fill has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictVacancyView {
    pub district: District,
    pub total_strength: u32,
    pub reported: u32,
    pub displaced: u32,
    pub applied_from: u32,
    pub applied_to_first: u32,
    pub applied_to_other: u32,
    pub cascade: u32,
    pub total_available: u32,
    pub filled: u32,
    pub remaining: u32,
}

impl DistrictVacancyView {
    pub fn from_counts(
        district: District,
        slot: VacancySlot,
        displaced: u32,
        applied_from: u32,
        applied_to_first: u32,
        applied_to_other: u32,
        cascade: u32,
        filled: u32,
    ) -> Self {
        let total_available = slot.reported + cascade;
        let remaining = total_available.saturating_sub(filled);
        DistrictVacancyView {
            district,
            total_strength: slot.total_strength,
            reported: slot.reported,
            displaced,
            applied_from,
            applied_to_first,
            applied_to_other,
            cascade,
            total_available,
            filled,
            remaining,
        }
    }
}

/// Batch update payload, one entry per district.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VacancyUpdate {
    pub district: District,
    pub total_strength: u32,
    pub reported: u32,
}
