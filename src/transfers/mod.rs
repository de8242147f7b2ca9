//! Transfer-round domain: cadre roster, vacancy ledger, applications, the
//! draft auto-fill engine, and the draft/final lists built from it.

pub mod allocation;
pub mod application;
pub mod district;
pub mod export;
pub mod lists;
pub mod roster;
pub mod round;
pub mod service;
pub mod store;
pub mod vacancy;

pub use district::District;
pub use roster::Pen;
pub use round::TransferRound;
pub use service::TransferService;
pub use store::{InMemoryRoundStore, RoundStore};
