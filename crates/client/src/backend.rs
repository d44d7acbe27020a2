//! Transport-agnostic seam between workflow controllers and the backend.

use async_trait::async_trait;
use itam_core::asset::{Asset, Department, Location, User};
use itam_core::stocktake::{
    CreateSession, CreatedSession, LinePatch, SeedSession, SessionSummary, StocktakeLine,
    StocktakeSession,
};
use itam_core::types::DbId;

use crate::error::ClientError;

/// Every backend call the stocktake workflow makes.
///
/// Implemented over HTTP by [`crate::api::StocktakeApi`].
#[async_trait]
pub trait StocktakeBackend: Send + Sync {
    // ---- reference data ----

    async fn list_users(&self) -> Result<Vec<User>, ClientError>;

    async fn list_departments(&self) -> Result<Vec<Department>, ClientError>;

    async fn list_locations(&self) -> Result<Vec<Location>, ClientError>;

    async fn list_assets(&self) -> Result<Vec<Asset>, ClientError>;

    // ---- sessions ----

    /// `POST /api/stocktake`
    async fn create_session(&self, body: &CreateSession) -> Result<CreatedSession, ClientError>;

    /// `POST /api/stocktake/{id}/seed`
    async fn seed_session(&self, session_id: DbId, body: &SeedSession) -> Result<(), ClientError>;

    /// `GET /api/stocktake/sessions`
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ClientError>;

    /// `GET /api/stocktake/{id}`
    async fn get_session(&self, session_id: DbId) -> Result<StocktakeSession, ClientError>;

    /// `GET /api/stocktake/{id}/lines`
    async fn get_lines(&self, session_id: DbId) -> Result<Vec<StocktakeLine>, ClientError>;

    /// `PATCH /api/stocktake/{id}/line/{lineId}` with only the staged fields.
    async fn patch_line(
        &self,
        session_id: DbId,
        line_id: DbId,
        patch: &LinePatch,
    ) -> Result<(), ClientError>;

    /// `POST /api/stocktake/{id}/close`
    async fn close_session(&self, session_id: DbId) -> Result<(), ClientError>;
}
