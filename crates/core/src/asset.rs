//! Read-only reference data consumed by the stocktake workflow.
//!
//! Assets, users, departments and locations are owned by the asset
//! management backend; the client only holds transient copies used for
//! scope previews and display.

use serde::{Deserialize, Serialize};

use crate::types::{null_as_default, DbId};

// ---------------------------------------------------------------------------
// Asset status
// ---------------------------------------------------------------------------

pub const STATUS_IN_STOCK: &str = "IN_STOCK";
pub const STATUS_IN_USE: &str = "IN_USE";
pub const STATUS_MAINTENANCE: &str = "MAINTENANCE";
pub const STATUS_BROKEN: &str = "BROKEN";
pub const STATUS_DISPOSED: &str = "DISPOSED";
pub const STATUS_LOST: &str = "LOST";

/// Lifecycle status of an asset.
///
/// Values the client does not know are kept verbatim in [`AssetStatus::Other`]
/// so they survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetStatus {
    InStock,
    InUse,
    Maintenance,
    Broken,
    Disposed,
    Lost,
    Other(String),
}

impl AssetStatus {
    /// Parse the backend's status string. Matching ignores ASCII case.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().as_str() {
            STATUS_IN_STOCK => Self::InStock,
            STATUS_IN_USE => Self::InUse,
            STATUS_MAINTENANCE => Self::Maintenance,
            STATUS_BROKEN => Self::Broken,
            STATUS_DISPOSED => Self::Disposed,
            STATUS_LOST => Self::Lost,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::InStock => STATUS_IN_STOCK,
            Self::InUse => STATUS_IN_USE,
            Self::Maintenance => STATUS_MAINTENANCE,
            Self::Broken => STATUS_BROKEN,
            Self::Disposed => STATUS_DISPOSED,
            Self::Lost => STATUS_LOST,
            Self::Other(s) => s,
        }
    }
}

impl From<String> for AssetStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<AssetStatus> for String {
    fn from(status: AssetStatus) -> Self {
        status.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// One tracked asset as returned by `GET /api/assets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "AssetID")]
    pub id: DbId,
    #[serde(rename = "AssetName", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "ManageCode", default)]
    pub manage_code: Option<String>,
    #[serde(rename = "SerialNumber", default)]
    pub serial_number: Option<String>,
    #[serde(rename = "CategoryID", default)]
    pub category_id: Option<DbId>,
    /// Current holder (employee).
    #[serde(rename = "EmployeeID", default)]
    pub employee_id: Option<DbId>,
    #[serde(rename = "SectionID", default)]
    pub section_id: Option<DbId>,
    #[serde(rename = "DepartmentID", default)]
    pub department_id: Option<DbId>,
    #[serde(rename = "LocationID", default)]
    pub location_id: Option<DbId>,
    #[serde(rename = "Quantity", default)]
    pub quantity: Option<i64>,
    #[serde(rename = "RemainQuantity", default)]
    pub remain_quantity: Option<i64>,
    #[serde(rename = "Status", default)]
    pub status: Option<AssetStatus>,
}

impl Asset {
    /// Whether the asset belongs to the department, by either section or
    /// department column.
    pub fn in_department(&self, department_id: DbId) -> bool {
        self.section_id == Some(department_id) || self.department_id == Some(department_id)
    }

    /// Case-insensitive keyword match over name, manage code and serial.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            Some(self.name.as_str()),
            self.manage_code.as_deref(),
            self.serial_number.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "UserID")]
    pub id: DbId,
    #[serde(rename = "FullName", default, deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(rename = "DepartmentID", default)]
    pub department_id: Option<DbId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    #[serde(rename = "DepartmentID")]
    pub id: DbId,
    #[serde(rename = "DepartmentName", default, deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "LocationID")]
    pub id: DbId,
    #[serde(rename = "LocationName", default, deserialize_with = "null_as_default")]
    pub name: String,
}
