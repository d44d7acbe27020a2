//! `itam-stocktake` library crate.
//!
//! Workflow controllers for stocktake sessions: the [`creator`] wizard that
//! scopes and seeds a session, and the [`editor`] that stages, saves and
//! closes reconciliation lines. The CLI entrypoint lives in `main.rs`.

pub mod creator;
pub mod editor;
pub mod error;
pub mod notice;
