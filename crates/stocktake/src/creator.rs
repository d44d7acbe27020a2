//! Session creator wizard.
//!
//! Three steps: choose a scope, review the read-only preview of matching
//! assets, then confirm. Confirmation creates the session and seeds it with
//! exactly the previewed asset ids; there is no server-side re-filtering.

use std::sync::Arc;

use itam_client::backend::StocktakeBackend;
use itam_client::error::{ClientError, GENERIC_FAILURE_MESSAGE};
use itam_core::asset::{Asset, Department, Location, User};
use itam_core::scope::{self, Refinement, Scope, ScopeMode};
use itam_core::stocktake::{CreateSession, SeedSession};
use itam_core::types::DbId;

use crate::error::{StocktakeError, StocktakeResult};
use crate::notice::{Notice, Notices};

/// Where the wizard currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardStep {
    SelectScope,
    Preview,
    Created { session_id: DbId },
}

/// Master data loaded once when the wizard opens.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub users: Vec<User>,
    pub departments: Vec<Department>,
    pub locations: Vec<Location>,
    pub assets: Vec<Asset>,
}

pub struct SessionCreator {
    backend: Arc<dyn StocktakeBackend>,
    reference: ReferenceData,
    scope: Scope,
    refinement: Refinement,
    preview_ids: Option<Vec<DbId>>,
    step: WizardStep,
    notices: Notices,
}

/// Keep whatever loaded, turn a failure into a warning.
fn keep_or_warn<T>(
    result: Result<Vec<T>, ClientError>,
    what: &str,
    notices: &mut Notices,
) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(error = %e, what, "Failed to load reference data");
            notices.warning(format!(
                "Could not load {what}: {}",
                e.user_message(GENERIC_FAILURE_MESSAGE)
            ));
            Vec::new()
        }
    }
}

impl SessionCreator {
    pub fn new(backend: Arc<dyn StocktakeBackend>, mode: ScopeMode) -> Self {
        Self {
            backend,
            reference: ReferenceData::default(),
            scope: Scope::new(mode),
            refinement: Refinement::default(),
            preview_ids: None,
            step: WizardStep::SelectScope,
            notices: Notices::default(),
        }
    }

    /// Load users, departments, locations and assets concurrently.
    ///
    /// Failures are non-blocking: each produces a warning and the wizard
    /// stays usable with whatever did load.
    pub async fn load_reference_data(&mut self) {
        let backend = Arc::clone(&self.backend);
        let (users, departments, locations, assets) = tokio::join!(
            backend.list_users(),
            backend.list_departments(),
            backend.list_locations(),
            backend.list_assets(),
        );

        self.reference = ReferenceData {
            users: keep_or_warn(users, "users", &mut self.notices),
            departments: keep_or_warn(departments, "departments", &mut self.notices),
            locations: keep_or_warn(locations, "locations", &mut self.notices),
            assets: keep_or_warn(assets, "assets", &mut self.notices),
        };

        tracing::info!(
            users = self.reference.users.len(),
            departments = self.reference.departments.len(),
            locations = self.reference.locations.len(),
            assets = self.reference.assets.len(),
            "Reference data loaded",
        );
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    fn invalidate_preview(&mut self) {
        self.preview_ids = None;
        if self.step == WizardStep::Preview {
            self.step = WizardStep::SelectScope;
        }
    }

    pub fn set_mode(&mut self, mode: ScopeMode) {
        if self.scope.mode != mode {
            self.scope.set_mode(mode);
            self.invalidate_preview();
        }
    }

    pub fn set_selector(&mut self, id: Option<DbId>) {
        self.scope.selector = id;
        self.invalidate_preview();
    }

    pub fn set_refinement(&mut self, refinement: Refinement) {
        self.refinement = refinement;
        self.invalidate_preview();
    }

    /// Whether "continue" is enabled for the current step.
    pub fn can_continue(&self) -> bool {
        match self.step {
            WizardStep::SelectScope => self.scope.is_complete(),
            WizardStep::Preview => self
                .preview_ids
                .as_ref()
                .is_some_and(|ids| !ids.is_empty()),
            WizardStep::Created { .. } => false,
        }
    }

    /// Compute the read-only preview for the current scope and advance to
    /// the preview step. Nothing is sent to the backend.
    pub fn preview(&mut self) -> StocktakeResult<Vec<&Asset>> {
        if matches!(self.step, WizardStep::Created { .. }) {
            return Err(StocktakeError::NotReady(
                "Session already created".to_string(),
            ));
        }
        if !self.scope.is_complete() {
            return Err(StocktakeError::NotReady(format!(
                "Choose a value for scope {}",
                self.scope.mode.as_str()
            )));
        }

        let matched = scope::preview(&self.reference.assets, &self.scope, &self.refinement);
        let ids: Vec<DbId> = matched.iter().map(|a| a.id).collect();

        tracing::debug!(
            mode = self.scope.mode.as_str(),
            selector = ?self.scope.selector,
            matched = ids.len(),
            "Scope preview computed",
        );
        if ids.is_empty() {
            self.notices.info("No assets match this scope");
        }

        self.preview_ids = Some(ids);
        self.step = WizardStep::Preview;
        Ok(matched)
    }

    /// Asset ids of the last preview.
    pub fn preview_ids(&self) -> &[DbId] {
        self.preview_ids.as_deref().unwrap_or(&[])
    }

    /// Create the session, then seed it with the previewed ids.
    ///
    /// Both calls run in order. If either fails the wizard reports the
    /// error and stays on the preview step; the operator retries manually.
    pub async fn confirm(&mut self, note: &str, default_found: bool) -> StocktakeResult<DbId> {
        if !(self.step == WizardStep::Preview && self.can_continue()) {
            return Err(StocktakeError::NotReady(
                "Preview at least one asset before creating a session".to_string(),
            ));
        }
        let asset_ids = self.preview_ids().to_vec();

        let create = CreateSession {
            department_id: self.scope.department_id(),
            note: note.trim().to_string(),
        };
        let created = match self.backend.create_session(&create).await {
            Ok(created) => created,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create stocktake session");
                self.notices.error(format!(
                    "Could not create session: {}",
                    e.user_message(GENERIC_FAILURE_MESSAGE)
                ));
                return Err(e.into());
            }
        };
        let session_id = created.session_id;

        let seed = SeedSession {
            asset_ids,
            found_location_id: self.scope.seed_location_id(),
            default_found,
        };
        if let Err(e) = self.backend.seed_session(session_id, &seed).await {
            tracing::error!(session_id, error = %e, "Failed to seed stocktake session");
            self.notices.error(format!(
                "Session {session_id} was created but could not be filled: {}",
                e.user_message(GENERIC_FAILURE_MESSAGE)
            ));
            return Err(e.into());
        }

        tracing::info!(
            session_id,
            lines = seed.asset_ids.len(),
            mode = self.scope.mode.as_str(),
            "Stocktake session created",
        );
        self.notices.success(format!(
            "Session {session_id} created with {} assets",
            seed.asset_ids.len()
        ));
        self.step = WizardStep::Created { session_id };
        Ok(session_id)
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain()
    }
}
