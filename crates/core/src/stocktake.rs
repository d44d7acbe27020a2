//! Stocktake sessions, lines and the edit staging rules.
//!
//! A session is one physical inventory count; each line reconciles one asset
//! as FOUND or MISSING. Edits are staged as sparse [`LinePatch`]es and
//! normalized by [`normalize_patch`] before they enter the overlay, so that a
//! staged line never violates the found/missing invariant:
//!
//! * `Found = 1` implies `MissingQty = 0`.
//! * `Found = 0` implies `FoundLocationID = null` and `MissingQty >= 1` by
//!   default, bounded by the asset's tracked quantity.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::overlay::{Patch, Patchable};
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Upper bound for a missing quantity when the asset reports no quantity.
pub const MISSING_QTY_SENTINEL_MAX: i64 = 999_999;

/// Missing quantity assumed when a line is first marked missing.
pub const DEFAULT_MISSING_QTY: i64 = 1;

pub const LABEL_FOUND: &str = "FOUND";
pub const LABEL_MISSING: &str = "MISSING";

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Lifecycle of a session. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Open,
    Closed,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "OPEN",
            Self::Closed => "CLOSED",
        }
    }
}

/// Session header returned by `GET /api/stocktake/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StocktakeSession {
    #[serde(rename = "SessionID")]
    pub id: DbId,
    #[serde(rename = "DepartmentID", default)]
    pub department_id: Option<DbId>,
    #[serde(rename = "CreatedBy", default)]
    pub created_by: Option<DbId>,
    #[serde(rename = "StartedAt", default)]
    pub started_at: Option<Timestamp>,
    #[serde(rename = "EndedAt", default)]
    pub ended_at: Option<Timestamp>,
    #[serde(rename = "Status")]
    pub status: SessionStatus,
    #[serde(rename = "Note", default)]
    pub note: Option<String>,
}

impl StocktakeSession {
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// Fail with [`CoreError::SessionClosed`] unless the session is open.
    pub fn ensure_open(&self) -> Result<(), CoreError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::SessionClosed {
                session_id: self.id,
            })
        }
    }
}

/// Row of `GET /api/stocktake/sessions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    #[serde(flatten)]
    pub session: StocktakeSession,
    #[serde(rename = "LineCount", default)]
    pub line_count: Option<i64>,
    #[serde(rename = "FoundCount", default)]
    pub found_count: Option<i64>,
}

/// Body of `POST /api/stocktake`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSession {
    #[serde(rename = "DepartmentID")]
    pub department_id: Option<DbId>,
    #[serde(rename = "Note")]
    pub note: String,
}

/// Response of `POST /api/stocktake`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct CreatedSession {
    #[serde(rename = "SessionID", alias = "id", alias = "sessionId")]
    pub session_id: DbId,
}

/// Body of `POST /api/stocktake/{id}/seed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedSession {
    pub asset_ids: Vec<DbId>,
    pub found_location_id: Option<DbId>,
    pub default_found: bool,
}

// ---------------------------------------------------------------------------
// Line
// ---------------------------------------------------------------------------

/// One asset's reconciliation record, with the asset columns the backend
/// joins in for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StocktakeLine {
    #[serde(rename = "LineID")]
    pub id: DbId,
    #[serde(rename = "SessionID", default)]
    pub session_id: Option<DbId>,
    #[serde(rename = "AssetID")]
    pub asset_id: DbId,
    #[serde(rename = "Found", with = "crate::types::int_bool")]
    pub found: bool,
    #[serde(rename = "FoundLocationID", default)]
    pub found_location_id: Option<DbId>,
    #[serde(rename = "MissingQty", default)]
    pub missing_qty: Option<i64>,
    #[serde(rename = "Remarks", default)]
    pub remarks: Option<String>,
    #[serde(rename = "CheckedAt", default)]
    pub checked_at: Option<Timestamp>,
    #[serde(rename = "AssetName", default)]
    pub asset_name: Option<String>,
    #[serde(rename = "ManageCode", default)]
    pub manage_code: Option<String>,
    #[serde(rename = "SerialNumber", default)]
    pub serial_number: Option<String>,
    #[serde(rename = "Quantity", default)]
    pub quantity: Option<i64>,
    #[serde(rename = "RemainQuantity", default)]
    pub remain_quantity: Option<i64>,
}

/// Inclusive range a missing quantity is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QtyBounds {
    pub min: i64,
    pub max: i64,
}

impl QtyBounds {
    pub fn clamp(self, qty: i64) -> i64 {
        qty.clamp(self.min, self.max)
    }
}

impl StocktakeLine {
    /// Bounds for the missing quantity of this line.
    ///
    /// The maximum is the remaining quantity, else the tracked quantity,
    /// else [`MISSING_QTY_SENTINEL_MAX`]. Individually tracked assets
    /// (quantity exactly 1) cannot be "missing zero".
    pub fn missing_qty_bounds(&self) -> QtyBounds {
        let min = if self.quantity == Some(1) { 1 } else { 0 };
        let max = self
            .remain_quantity
            .filter(|q| *q > 0)
            .or(self.quantity.filter(|q| *q > 0))
            .unwrap_or(MISSING_QTY_SENTINEL_MAX);
        QtyBounds {
            min,
            max: max.max(min),
        }
    }

    pub fn found_label(&self) -> &'static str {
        if self.found {
            LABEL_FOUND
        } else {
            LABEL_MISSING
        }
    }

    /// Case-insensitive text match over asset name, manage code, serial
    /// number and remarks. An empty query matches everything.
    pub fn matches_text(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            self.asset_name.as_deref(),
            self.manage_code.as_deref(),
            self.serial_number.as_deref(),
            self.remarks.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Sparse, client-only edit of a line. Serializes to exactly the fields that
/// were staged, which is the body of the line PATCH request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinePatch {
    #[serde(
        rename = "Found",
        default,
        with = "crate::types::opt_int_bool",
        skip_serializing_if = "Option::is_none"
    )]
    pub found: Option<bool>,
    /// `Some(None)` clears the location, `None` leaves it untouched.
    #[serde(
        rename = "FoundLocationID",
        default,
        deserialize_with = "crate::types::double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub found_location_id: Option<Option<DbId>>,
    #[serde(rename = "Remarks", default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(rename = "MissingQty", default, skip_serializing_if = "Option::is_none")]
    pub missing_qty: Option<i64>,
}

impl LinePatch {
    pub fn found(found: bool) -> Self {
        Self {
            found: Some(found),
            ..Self::default()
        }
    }

    pub fn location(location_id: Option<DbId>) -> Self {
        Self {
            found_location_id: Some(location_id),
            ..Self::default()
        }
    }

    pub fn missing_qty(qty: i64) -> Self {
        Self {
            missing_qty: Some(qty),
            ..Self::default()
        }
    }

    pub fn remarks(remarks: impl Into<String>) -> Self {
        Self {
            remarks: Some(remarks.into()),
            ..Self::default()
        }
    }
}

impl Patch for LinePatch {
    fn absorb(&mut self, newer: Self) {
        if newer.found.is_some() {
            self.found = newer.found;
        }
        if newer.found_location_id.is_some() {
            self.found_location_id = newer.found_location_id;
        }
        if newer.remarks.is_some() {
            self.remarks = newer.remarks;
        }
        if newer.missing_qty.is_some() {
            self.missing_qty = newer.missing_qty;
        }
    }

    fn is_empty(&self) -> bool {
        self.found.is_none()
            && self.found_location_id.is_none()
            && self.remarks.is_none()
            && self.missing_qty.is_none()
    }
}

impl Patchable<LinePatch> for StocktakeLine {
    fn patched(&self, patch: &LinePatch) -> Self {
        let mut line = self.clone();
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
        line
    }
}

// ---------------------------------------------------------------------------
// Staging rules
// ---------------------------------------------------------------------------

/// Apply the staging rules to `patch` against the current working view of
/// the line (canonical line merged with anything already staged).
///
/// Returns the patch that should enter the overlay, or a validation error
/// when the edit is not allowed in the line's state.
pub fn normalize_patch(
    current: &StocktakeLine,
    mut patch: LinePatch,
) -> Result<LinePatch, CoreError> {
    let found = patch.found.unwrap_or(current.found);

    match patch.found {
        Some(true) => {
            patch.missing_qty = Some(0);
        }
        Some(false) => {
            patch.found_location_id = Some(None);
            let unset = current.missing_qty.unwrap_or(0) == 0;
            if patch.missing_qty.is_none() && unset {
                patch.missing_qty = Some(DEFAULT_MISSING_QTY);
            }
        }
        None => {}
    }

    if let Some(Some(location_id)) = patch.found_location_id {
        if !found {
            return Err(CoreError::Validation(format!(
                "Line {} is missing; location {location_id} can only be recorded for found items",
                current.id
            )));
        }
    }

    if let Some(qty) = patch.missing_qty {
        if found {
            if qty != 0 {
                return Err(CoreError::Validation(format!(
                    "Line {} is found; missing quantity must stay 0",
                    current.id
                )));
            }
        } else {
            patch.missing_qty = Some(current.missing_qty_bounds().clamp(qty));
        }
    }

    Ok(patch)
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Tally of a session's working view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    pub found: usize,
    pub missing: usize,
    pub dirty: usize,
}

impl SessionProgress {
    /// Count found and missing lines of a merged view.
    pub fn tally<'a, I>(lines: I, dirty: usize) -> Self
    where
        I: IntoIterator<Item = &'a StocktakeLine>,
    {
        let mut progress = Self {
            dirty,
            ..Self::default()
        };
        for line in lines {
            progress.total += 1;
            if line.found {
                progress.found += 1;
            } else {
                progress.missing += 1;
            }
        }
        progress
    }
}
