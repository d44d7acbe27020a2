//! In-memory [`StocktakeBackend`] used by the controller integration tests.
//!
//! Behaves like the real backend for the calls the controllers make: seeding
//! creates one line per asset, PATCH applies the sent fields and stamps
//! `CheckedAt`, close flips the status. Individual calls can be made to fail.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use itam_client::backend::StocktakeBackend;
use itam_client::error::ClientError;
use itam_core::asset::{Asset, AssetStatus, Department, Location, User};
use itam_core::stocktake::{
    CreateSession, CreatedSession, LinePatch, SeedSession, SessionStatus, SessionSummary,
    StocktakeLine, StocktakeSession,
};
use itam_core::types::{DbId, Timestamp};
use tokio::sync::Semaphore;

pub const SESSION_ID: DbId = 7;

#[derive(Default)]
pub struct FakeState {
    pub session: Option<StocktakeSession>,
    pub lines: Vec<StocktakeLine>,
    pub assets: Vec<Asset>,
    pub locations: Vec<Location>,
    pub departments: Vec<Department>,
    pub users: Vec<User>,

    pub created: Vec<CreateSession>,
    pub seeded: Vec<(DbId, SeedSession)>,
    pub patches: Vec<(DbId, DbId, LinePatch)>,
    pub close_calls: usize,
    pub get_lines_calls: usize,
    clock: i64,

    pub fail_patch_lines: BTreeSet<DbId>,
    pub fail_get_lines: bool,
    pub fail_locations: bool,
    pub fail_users: bool,
    pub fail_create: bool,
    pub fail_seed: bool,
    pub fail_close: bool,

    /// When set, every PATCH takes one permit before it is applied.
    pub patch_gate: Option<Arc<Semaphore>>,
}

impl FakeState {
    fn tick(&mut self) -> Timestamp {
        self.clock += 1;
        base_time() + chrono::Duration::minutes(self.clock)
    }
}

#[derive(Default)]
pub struct FakeBackend {
    pub state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn with_session(lines: Vec<StocktakeLine>) -> Arc<Self> {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            state.session = Some(open_session(SESSION_ID));
            state.lines = lines;
            state.locations = vec![location(1, "Head office"), location(2, "Warehouse")];
        }
        Arc::new(backend)
    }

    pub fn with_assets(assets: Vec<Asset>) -> Arc<Self> {
        let backend = Self::default();
        {
            let mut state = backend.state.lock().unwrap();
            state.assets = assets;
            state.locations = vec![location(1, "Head office"), location(2, "Warehouse")];
            state.departments = vec![
                Department {
                    id: 10,
                    name: "IT".to_string(),
                },
                Department {
                    id: 20,
                    name: "Finance".to_string(),
                },
            ];
            state.users = vec![User {
                id: 500,
                full_name: "Kim Lee".to_string(),
                department_id: Some(10),
            }];
        }
        Arc::new(backend)
    }

    pub fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    /// Simulate another operator saving a line.
    pub fn touch_line(&self, line_id: DbId, remarks: &str) {
        let mut state = self.lock();
        let stamp = state.tick();
        if let Some(line) = state.lines.iter_mut().find(|l| l.id == line_id) {
            line.remarks = Some(remarks.to_string());
            line.checked_at = Some(stamp);
        }
    }

    pub fn remove_line(&self, line_id: DbId) {
        self.lock().lines.retain(|l| l.id != line_id);
    }

    pub fn patch_count(&self) -> usize {
        self.lock().patches.len()
    }

    pub fn get_lines_calls(&self) -> usize {
        self.lock().get_lines_calls
    }

    /// Hold every PATCH until a permit is added for it.
    pub fn gate_patches(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.lock().patch_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn stored_line(&self, line_id: DbId) -> StocktakeLine {
        self.lock()
            .lines
            .iter()
            .find(|l| l.id == line_id)
            .cloned()
            .unwrap()
    }
}

fn rejected(status: u16, message: &str) -> ClientError {
    ClientError::Api {
        status,
        body: serde_json::json!({ "message": message }).to_string(),
    }
}

#[async_trait]
impl StocktakeBackend for FakeBackend {
    async fn list_users(&self) -> Result<Vec<User>, ClientError> {
        let state = self.lock();
        if state.fail_users {
            return Err(rejected(500, "users unavailable"));
        }
        Ok(state.users.clone())
    }

    async fn list_departments(&self) -> Result<Vec<Department>, ClientError> {
        Ok(self.lock().departments.clone())
    }

    async fn list_locations(&self) -> Result<Vec<Location>, ClientError> {
        let state = self.lock();
        if state.fail_locations {
            return Err(rejected(503, "locations unavailable"));
        }
        Ok(state.locations.clone())
    }

    async fn list_assets(&self) -> Result<Vec<Asset>, ClientError> {
        Ok(self.lock().assets.clone())
    }

    async fn create_session(&self, body: &CreateSession) -> Result<CreatedSession, ClientError> {
        let mut state = self.lock();
        if state.fail_create {
            return Err(rejected(500, "could not create session"));
        }
        state.created.push(body.clone());
        let mut session = open_session(SESSION_ID);
        session.department_id = body.department_id;
        session.note = Some(body.note.clone());
        state.session = Some(session);
        Ok(CreatedSession {
            session_id: SESSION_ID,
        })
    }

    async fn seed_session(&self, session_id: DbId, body: &SeedSession) -> Result<(), ClientError> {
        let mut state = self.lock();
        if state.fail_seed {
            return Err(rejected(500, "seed failed"));
        }
        state.seeded.push((session_id, body.clone()));
        let assets: Vec<Asset> = state
            .assets
            .iter()
            .filter(|a| body.asset_ids.contains(&a.id))
            .cloned()
            .collect();
        for (n, asset) in assets.iter().enumerate() {
            let mut seeded = line(n as DbId + 1, body.default_found);
            seeded.session_id = Some(session_id);
            seeded.asset_id = asset.id;
            seeded.asset_name = Some(asset.name.clone());
            seeded.manage_code = asset.manage_code.clone();
            seeded.found_location_id = body.found_location_id;
            state.lines.push(seeded);
        }
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ClientError> {
        let state = self.lock();
        Ok(state
            .session
            .iter()
            .map(|s| SessionSummary {
                session: s.clone(),
                line_count: Some(state.lines.len() as i64),
                found_count: Some(state.lines.iter().filter(|l| l.found).count() as i64),
            })
            .collect())
    }

    async fn get_session(&self, session_id: DbId) -> Result<StocktakeSession, ClientError> {
        self.lock()
            .session
            .clone()
            .filter(|s| s.id == session_id)
            .ok_or_else(|| rejected(404, "session not found"))
    }

    async fn get_lines(&self, _session_id: DbId) -> Result<Vec<StocktakeLine>, ClientError> {
        let mut state = self.lock();
        state.get_lines_calls += 1;
        if state.fail_get_lines {
            return Err(rejected(500, "lines unavailable"));
        }
        Ok(state.lines.clone())
    }

    async fn patch_line(
        &self,
        session_id: DbId,
        line_id: DbId,
        patch: &LinePatch,
    ) -> Result<(), ClientError> {
        let gate = self.lock().patch_gate.clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
        let mut state = self.lock();
        state.patches.push((session_id, line_id, patch.clone()));
        if state.fail_patch_lines.contains(&line_id) {
            return Err(rejected(409, "line is locked"));
        }
        let stamp = state.tick();
        let line = state
            .lines
            .iter_mut()
            .find(|l| l.id == line_id)
            .ok_or_else(|| rejected(404, "line not found"))?;
        if let Some(found) = patch.found {
            line.found = found;
        }
        if let Some(location) = patch.found_location_id {
            line.found_location_id = location;
        }
        if let Some(remarks) = &patch.remarks {
            line.remarks = Some(remarks.clone());
        }
        if let Some(qty) = patch.missing_qty {
            line.missing_qty = Some(qty);
        }
        line.checked_at = Some(stamp);
        Ok(())
    }

    async fn close_session(&self, _session_id: DbId) -> Result<(), ClientError> {
        let mut state = self.lock();
        state.close_calls += 1;
        if state.fail_close {
            return Err(rejected(500, "close failed"));
        }
        let stamp = state.tick();
        if let Some(session) = state.session.as_mut() {
            session.status = SessionStatus::Closed;
            session.ended_at = Some(stamp);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn base_time() -> Timestamp {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

pub fn open_session(id: DbId) -> StocktakeSession {
    StocktakeSession {
        id,
        department_id: Some(10),
        created_by: Some(1),
        started_at: Some(base_time()),
        ended_at: None,
        status: SessionStatus::Open,
        note: None,
    }
}

pub fn location(id: DbId, name: &str) -> Location {
    Location {
        id,
        name: name.to_string(),
    }
}

/// A seeded, never-checked line for an individually tracked asset.
pub fn line(id: DbId, found: bool) -> StocktakeLine {
    StocktakeLine {
        id,
        session_id: Some(SESSION_ID),
        asset_id: 100 + id,
        found,
        found_location_id: None,
        missing_qty: if found { Some(0) } else { None },
        remarks: None,
        checked_at: None,
        asset_name: Some(format!("Laptop {id}")),
        manage_code: Some(format!("IT-{id:04}")),
        serial_number: Some(format!("SN{id}")),
        quantity: Some(1),
        remain_quantity: None,
    }
}

pub fn asset(id: DbId, name: &str, department_id: DbId) -> Asset {
    Asset {
        id,
        name: name.to_string(),
        manage_code: Some(format!("IT-{id:04}")),
        serial_number: None,
        category_id: None,
        employee_id: None,
        section_id: None,
        department_id: Some(department_id),
        location_id: None,
        quantity: Some(1),
        remain_quantity: None,
        status: Some(AssetStatus::InUse),
    }
}
