//! REST client for the asset management backend.
//!
//! [`api::StocktakeApi`] talks HTTP via [`reqwest`]; controllers depend only
//! on the [`backend::StocktakeBackend`] trait so they can run against an
//! in-memory backend in tests. Credentials come from an injected
//! [`credentials::CredentialProvider`] instead of ambient storage.

pub mod api;
pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
