use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::district::District;
use super::roster::Pen;

/// Why an employee ended up on the draft list. The original registers kept
/// this as free-text remarks; it is structured here and rendered back into
/// the familiar wording for listings and exports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlacementReason {
    /// Allocated into a reported vacancy at the given preference rank.
    Preference { rank: u8 },
    /// Allocated at the given rank into a slot opened by an outbound transfer.
    CascadeVacancy { rank: u8 },
    /// Placed against a serving employee who was displaced to make room.
    Against { displaced: Pen, displaced_name: String },
    /// Moved out of a district to make room for an against transfer.
    Displaced {
        for_applicant: Pen,
        applicant_name: String,
    },
    /// Added by hand from the cadre screen.
    Manual,
}

impl PlacementReason {
    pub fn remarks(&self) -> String {
        match self {
            PlacementReason::Preference { rank } => format!("Pref {rank}"),
            PlacementReason::CascadeVacancy { .. } => "Vacancy by Transfer".to_string(),
            PlacementReason::Against { displaced_name, .. } => {
                format!("Against {displaced_name}")
            }
            PlacementReason::Displaced { applicant_name, .. } => {
                format!("Displaced for {applicant_name}")
            }
            PlacementReason::Manual => String::new(),
        }
    }

    pub fn is_displacement(&self) -> bool {
        matches!(self, PlacementReason::Displaced { .. })
    }
}

/// Provisional transfer order awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftPlacement {
    pub pen: Pen,
    pub to_district: District,
    pub added_on: NaiveDate,
    pub reason: PlacementReason,
}

/// Confirmed transfer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalPlacement {
    pub pen: Pen,
    pub to_district: District,
    pub confirmed_on: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reasons_render_the_register_wording() {
        assert_eq!(PlacementReason::Preference { rank: 3 }.remarks(), "Pref 3");
        assert_eq!(
            PlacementReason::CascadeVacancy { rank: 1 }.remarks(),
            "Vacancy by Transfer"
        );
        assert_eq!(
            PlacementReason::Against {
                displaced: Pen::new("610001"),
                displaced_name: "LATHA P".to_string(),
            }
            .remarks(),
            "Against LATHA P"
        );
        assert_eq!(
            PlacementReason::Displaced {
                for_applicant: Pen::new("700001"),
                applicant_name: "ANITHA K".to_string(),
            }
            .remarks(),
            "Displaced for ANITHA K"
        );
        assert_eq!(PlacementReason::Manual.remarks(), "");
    }
}
