use std::collections::BTreeMap;

use super::super::district::District;
use super::super::vacancy::VacancySlot;

/// Per-district capacity tracked while auto-fill runs. Reported vacancies are
/// consumed before cascade slots; every cross-district move opens one cascade
/// slot in the source district.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DistrictCapacity {
    pub reported: u32,
    pub remaining: u32,
    pub cascade: u32,
    pub filled: u32,
}

#[derive(Debug)]
pub(crate) struct CapacityLedger {
    districts: BTreeMap<District, DistrictCapacity>,
    pub cascade_fills: u32,
}

impl CapacityLedger {
    pub fn new(
        vacancies: &BTreeMap<District, VacancySlot>,
        already_filled: &BTreeMap<District, u32>,
    ) -> Self {
        let mut districts = BTreeMap::new();
        for district in District::ALL {
            let reported = vacancies
                .get(&district)
                .map(|slot| slot.reported)
                .unwrap_or(0);
            let filled = already_filled.get(&district).copied().unwrap_or(0);
            districts.insert(
                district,
                DistrictCapacity {
                    reported,
                    remaining: reported.saturating_sub(filled),
                    cascade: 0,
                    filled,
                },
            );
        }
        CapacityLedger {
            districts,
            cascade_fills: 0,
        }
    }

    pub fn capacity(&self, district: District) -> DistrictCapacity {
        self.districts.get(&district).copied().unwrap_or_default()
    }

    /// A district can take one more placement when it still has reported or
    /// cascade capacity, or when it never reported vacancies at all
    /// (unreported districts are treated as unconstrained).
    pub fn accepts(&self, district: District) -> bool {
        let capacity = self.capacity(district);
        capacity.remaining + capacity.cascade > 0 || capacity.reported == 0
    }

    /// Strict capacity check used when relocating a displaced employee. The
    /// unreported-district allowance does not apply here.
    pub fn has_open_slot(&self, district: District) -> bool {
        let capacity = self.capacity(district);
        capacity.remaining + capacity.cascade > 0
    }

    /// Whether the next fill would consume a cascade slot rather than a
    /// reported vacancy.
    pub fn next_fill_is_cascade(&self, district: District) -> bool {
        let capacity = self.capacity(district);
        capacity.remaining == 0 && capacity.cascade > 0
    }

    /// Record one placement into `to`, opening a cascade slot in `source`
    /// when the move crosses districts.
    pub fn fill(&mut self, to: District, source: Option<District>) {
        let capacity = self.districts.entry(to).or_default();
        if capacity.remaining > 0 {
            capacity.remaining -= 1;
        } else if capacity.cascade > 0 {
            capacity.cascade -= 1;
            self.cascade_fills += 1;
        }
        capacity.filled += 1;

        if let Some(source) = source {
            if source != to {
                self.districts.entry(source).or_default().cascade += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(reported: u32) -> CapacityLedger {
        let mut vacancies = BTreeMap::new();
        vacancies.insert(
            District::Kollam,
            VacancySlot {
                total_strength: 50,
                reported,
            },
        );
        CapacityLedger::new(&vacancies, &BTreeMap::new())
    }

    #[test]
    fn reported_slots_are_consumed_before_cascade() {
        let mut ledger = ledger_with(1);
        assert!(ledger.accepts(District::Kollam));
        assert!(!ledger.next_fill_is_cascade(District::Kollam));

        ledger.fill(District::Kollam, Some(District::Idukki));
        assert_eq!(ledger.capacity(District::Kollam).remaining, 0);
        assert_eq!(ledger.capacity(District::Idukki).cascade, 1);
        assert!(!ledger.accepts(District::Kollam));
    }

    #[test]
    fn cascade_slots_reopen_a_full_district() {
        let mut ledger = ledger_with(1);
        ledger.fill(District::Kollam, None);

        // An outbound move from Kollam opens a cascade slot there.
        ledger.fill(District::Idukki, Some(District::Kollam));
        assert!(ledger.accepts(District::Kollam));
        assert!(ledger.next_fill_is_cascade(District::Kollam));

        ledger.fill(District::Kollam, None);
        assert_eq!(ledger.cascade_fills, 1);
        assert_eq!(ledger.capacity(District::Kollam).filled, 2);
    }

    #[test]
    fn unreported_districts_accept_without_limit() {
        let ledger = ledger_with(0);
        assert!(ledger.accepts(District::Kollam));
        assert!(ledger.accepts(District::Wayanad));
    }
}
