//! End-to-end scenarios for a transfer round driven through the public
//! service facade: roster intake, applications, auto-fill, and the
//! draft-to-final confirmation flow.

use std::sync::Arc;

use transfer_desk::transfers::allocation::AllocationOptions;
use transfer_desk::transfers::district::District;
use transfer_desk::transfers::export;
use transfer_desk::transfers::roster::{Pen, WeightageClaim};
use transfer_desk::transfers::round::TransferRound;
use transfer_desk::transfers::service::{
    AppliedQuery, ApplicationForm, ListQuery, RosterQuery, ServiceError, TransferService,
};
use transfer_desk::transfers::store::InMemoryRoundStore;
use transfer_desk::transfers::vacancy::VacancyUpdate;

const ROSTER_CSV: &str = "\
Name,PEN,Designation,Institution,District,Entry Date,Retirement Date,District Join Date,A,B,C,Contact
Anitha R,700001,JPHN Gr I,PHC Vellanad,Thiruvananthapuram,01-06-2008,31-05-2038,10-06-2008,,,,9447000001
Beena K,700002,JPHN Gr I,CHC Kottarakkara,Kollam,05-01-2015,31-12-2044,05-01-2015,,,,9447000002
Chitra M,700003,JPHN Gr I,PHC Adimali,Idukki,20-03-2021,28-02-2051,20-03-2021,,,,9447000003
Divya P,700004,JPHN Gr I,CHC Wadakkanchery,Thrissur,11-09-2011,31-08-2041,11-09-2011,,,,9447000004
";

fn open_round() -> (TransferService<InMemoryRoundStore>, TransferRound) {
    let service = TransferService::new(Arc::new(InMemoryRoundStore::new()));
    let round = TransferRound::General { year: 2026 };
    service.open_round(&round).expect("round opens");
    service
        .import_roster(&round, ROSTER_CSV.as_bytes(), false)
        .expect("roster imports");
    (service, round)
}

fn form(pen: &str, preferences: Vec<District>) -> ApplicationForm {
    ApplicationForm {
        pen: Pen::new(pen),
        applied_on: None,
        receipt_numbers: format!("RCPT-{pen}"),
        preferences,
        special_priority: false,
        special_priority_reason: None,
        weightage: None,
        clear_weightage: false,
    }
}

#[test]
fn roster_import_names_are_uppercased_and_sorted_south_to_north() {
    let (service, round) = open_round();
    let entries = service
        .roster(&round, &RosterQuery::default())
        .expect("roster lists");
    assert_eq!(entries.len(), 4);
    assert_eq!(entries[0].record.name, "ANITHA R");
    assert_eq!(entries[0].record.district, District::Thiruvananthapuram);
    assert_eq!(entries[3].record.district, District::Thrissur);
    assert!(entries[1].duration.ends_with('D'));
}

#[test]
fn full_round_from_applications_to_final_list() {
    let (service, round) = open_round();

    // Kollam reports one vacancy; the junior Idukki nurse and a weightage
    // holder both want it.
    service
        .save_vacancies(
            &round,
            &[VacancyUpdate {
                district: District::Kollam,
                total_strength: 60,
                reported: 1,
            }],
        )
        .expect("vacancies save");

    let mut weighted = form("700004", vec![District::Kollam]);
    weighted.weightage = Some(WeightageClaim::new("Spouse posting", 2));
    service
        .mark_applied(
            &round,
            vec![form("700003", vec![District::Kollam]), weighted],
        )
        .expect("applications recorded");

    let outcome = service
        .run_autofill(&round, AllocationOptions::default())
        .expect("auto-fill runs");
    // The weightage pass runs first: the Thrissur nurse takes the reported
    // Kollam slot, opening a cascade slot back in Thrissur. The Idukki nurse
    // only asked for Kollam, which is now full, and stays unplaced.
    assert_eq!(outcome.tally.weightage, 1);
    assert_eq!(outcome.tally.unplaced, 1);

    let draft = service
        .draft(&round, &ListQuery::default())
        .expect("draft visible after auto-fill");
    assert_eq!(draft.len(), 1);
    assert_eq!(draft[0].pen.as_str(), "700004");
    assert_eq!(draft[0].to_district, District::Kollam);

    let overview = service.vacancy_overview(&round).expect("overview");
    let kollam = overview
        .iter()
        .find(|view| view.district == District::Kollam)
        .expect("kollam row");
    assert_eq!(kollam.reported, 1);
    assert_eq!(kollam.filled, 1);
    assert_eq!(kollam.remaining, 0);
    let thrissur = overview
        .iter()
        .find(|view| view.district == District::Thrissur)
        .expect("thrissur row");
    assert_eq!(thrissur.cascade, 1);

    let excluded = service.draft_excluded(&round).expect("excluded list");
    assert_eq!(excluded.entries.len(), 1);
    assert_eq!(excluded.entries[0].application.pen.as_str(), "700003");

    assert_eq!(service.confirm(&round).expect("confirm"), 1);
    let finals = service
        .final_list(&round, &ListQuery::default())
        .expect("final list");
    assert_eq!(finals.len(), 1);
    assert_eq!(finals[0].pen.as_str(), "700004");

    let stats = service.dashboard(&round).expect("dashboard");
    assert_eq!(stats.roster, 4);
    assert_eq!(stats.applied, 2);
    assert_eq!(stats.filled, 1);
    assert_eq!(stats.confirmed, 1);
}

#[test]
fn autofill_without_preferences_is_an_error() {
    let (service, round) = open_round();
    let err = service
        .run_autofill(&round, AllocationOptions::default())
        .expect_err("nothing to allocate");
    assert!(matches!(err, ServiceError::Allocation(_)));
}

#[test]
fn applied_listing_sorts_and_counts_by_preference() {
    let (service, round) = open_round();
    service
        .mark_applied(
            &round,
            vec![
                form("700001", vec![District::Kollam, District::Pathanamthitta]),
                form("700002", vec![District::Thiruvananthapuram]),
                form("700003", vec![District::Kollam]),
            ],
        )
        .expect("applications recorded");

    let listing = service
        .applied(&round, &AppliedQuery::default())
        .expect("default listing");
    // From-district order runs south to north.
    assert_eq!(listing.entries[0].from_district, District::Thiruvananthapuram);
    assert!(listing.rank_counts.is_empty());

    let filtered = service
        .applied(
            &round,
            &AppliedQuery {
                preferred: Some(District::Kollam),
                ..AppliedQuery::default()
            },
        )
        .expect("filtered listing");
    assert_eq!(filtered.entries.len(), 2);
    assert_eq!(filtered.rank_counts[0], 2);
    // Rank ties break by seniority, most senior first.
    assert_eq!(filtered.entries[0].application.pen.as_str(), "700001");
}

#[test]
fn exports_render_expected_headers() {
    let (service, round) = open_round();
    service
        .mark_applied(&round, vec![form("700003", vec![District::Kollam])])
        .expect("application recorded");
    service
        .add_draft(&round, &Pen::new("700003"), District::Kollam)
        .expect("manual draft entry");

    let cadre = export::cadre_csv(
        &service
            .roster(&round, &RosterQuery::default())
            .expect("roster"),
    )
    .expect("cadre csv");
    assert!(cadre.starts_with(
        "PEN,Name,Designation,Institution,District,Entry Date,Retirement Date,District Join Date,Duration,Contact"
    ));
    assert!(cadre.contains("700001,ANITHA R"));

    let applied = export::applied_csv(
        &service
            .applied(&round, &AppliedQuery::default())
            .expect("applied")
            .entries,
    )
    .expect("applied csv");
    assert!(applied.contains("Pref 1"));
    assert!(applied.contains("RCPT-700003"));

    service.confirm(&round).expect("confirm");
    let finals = export::final_csv(
        &service
            .final_list(&round, &ListQuery::default())
            .expect("final"),
    )
    .expect("final csv");
    assert!(finals.starts_with(
        "PEN,Name,Institution,From District,To District,Duration,Weightage"
    ));
    assert!(finals.contains("700003,CHITRA M"));
}

#[test]
fn locked_applications_are_held_back_until_unlocked() {
    let (service, round) = open_round();
    service
        .mark_applied(&round, vec![form("700001", vec![District::Kollam])])
        .expect("application recorded");
    service
        .set_lock(&round, &Pen::new("700001"), true)
        .expect("lock");

    service
        .save_vacancies(
            &round,
            &[VacancyUpdate {
                district: District::Kollam,
                total_strength: 60,
                reported: 5,
            }],
        )
        .expect("vacancies save");

    // The only applicant is locked but still carries preferences, so the
    // run proceeds and places nobody.
    let outcome = service
        .run_autofill(&round, AllocationOptions::default())
        .expect("auto-fill runs");
    assert_eq!(outcome.tally.total, 0);

    assert_eq!(service.unlock_all(&round).expect("unlock"), 1);
    let outcome = service
        .run_autofill(&round, AllocationOptions::default())
        .expect("second run");
    assert_eq!(outcome.tally.total, 1);
}
