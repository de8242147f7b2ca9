//! Transfer Desk: a service for running district transfer rounds of a state
//! health department cadre. Rounds hold a roster, reported vacancies and
//! transfer applications; a preference- and seniority-driven auto-fill
//! produces the draft list that operators confirm into the final one.

pub mod auth;
pub mod config;
pub mod error;
pub mod router;
pub mod telemetry;
pub mod transfers;
