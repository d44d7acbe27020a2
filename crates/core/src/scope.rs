//! Scope selection for new stocktake sessions.
//!
//! A scope names which assets a session counts: everything in a department,
//! everything held by one employee, or everything stored at one location.
//! [`preview`] resolves a scope against the full asset list in memory; the
//! result is advisory only and is what gets seeded on confirmation.

use serde::{Deserialize, Serialize};

use crate::asset::{Asset, AssetStatus};
use crate::error::CoreError;
use crate::types::DbId;

/// How the operator chose to scope the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScopeMode {
    ByDepartment,
    ByHolder,
    ByLocation,
}

impl ScopeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ByDepartment => "BY_DEPARTMENT",
            Self::ByHolder => "BY_HOLDER",
            Self::ByLocation => "BY_LOCATION",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "BY_DEPARTMENT" => Ok(Self::ByDepartment),
            "BY_HOLDER" => Ok(Self::ByHolder),
            "BY_LOCATION" => Ok(Self::ByLocation),
            _ => Err(CoreError::Validation(format!(
                "Invalid scope mode '{s}'. Must be one of: BY_DEPARTMENT, BY_HOLDER, BY_LOCATION"
            ))),
        }
    }
}

/// A scope mode plus its selector value (department, user or location id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub mode: ScopeMode,
    pub selector: Option<DbId>,
}

impl Scope {
    pub fn new(mode: ScopeMode) -> Self {
        Self {
            mode,
            selector: None,
        }
    }

    pub fn department(id: DbId) -> Self {
        Self {
            mode: ScopeMode::ByDepartment,
            selector: Some(id),
        }
    }

    pub fn holder(id: DbId) -> Self {
        Self {
            mode: ScopeMode::ByHolder,
            selector: Some(id),
        }
    }

    pub fn location(id: DbId) -> Self {
        Self {
            mode: ScopeMode::ByLocation,
            selector: Some(id),
        }
    }

    /// Switch mode. A selector chosen for another mode is meaningless, so it
    /// is dropped.
    pub fn set_mode(&mut self, mode: ScopeMode) {
        if self.mode != mode {
            self.mode = mode;
            self.selector = None;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.selector.is_some()
    }

    /// Department id to send when creating the session.
    pub fn department_id(&self) -> Option<DbId> {
        match self.mode {
            ScopeMode::ByDepartment => self.selector,
            _ => None,
        }
    }

    /// Location to record as the found location of every seeded line.
    pub fn seed_location_id(&self) -> Option<DbId> {
        match self.mode {
            ScopeMode::ByLocation => self.selector,
            _ => None,
        }
    }

    /// Whether `asset` falls inside this scope. An incomplete scope matches
    /// nothing.
    pub fn matches(&self, asset: &Asset) -> bool {
        let Some(id) = self.selector else {
            return false;
        };
        match self.mode {
            ScopeMode::ByDepartment => asset.in_department(id),
            ScopeMode::ByHolder => asset.employee_id == Some(id),
            ScopeMode::ByLocation => asset.location_id == Some(id),
        }
    }
}

/// Optional narrowing applied on top of the scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Refinement {
    pub keyword: Option<String>,
    pub status: Option<AssetStatus>,
}

impl Refinement {
    pub fn matches(&self, asset: &Asset) -> bool {
        let keyword_ok = self
            .keyword
            .as_deref()
            .map_or(true, |k| asset.matches_keyword(k));
        let status_ok = self
            .status
            .as_ref()
            .map_or(true, |s| asset.status.as_ref() == Some(s));
        keyword_ok && status_ok
    }
}

/// Assets matched by `scope` and `refinement`, in input order.
pub fn preview<'a>(assets: &'a [Asset], scope: &Scope, refinement: &Refinement) -> Vec<&'a Asset> {
    assets
        .iter()
        .filter(|a| scope.matches(a) && refinement.matches(a))
        .collect()
}
