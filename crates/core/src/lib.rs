//! Domain logic for the IT asset stocktake client.
//!
//! Everything in this crate is pure: models, edit staging rules, the
//! pending-patch overlay, scope previews, the approval state machine and CSV
//! export. Network access lives in `itam-client`.

pub mod approval;
pub mod asset;
pub mod error;
pub mod export;
pub mod overlay;
pub mod scope;
pub mod stocktake;
pub mod types;
