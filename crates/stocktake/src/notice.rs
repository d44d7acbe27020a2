//! Transient, operator-facing notifications.
//!
//! Controllers never escalate failures to a global handler; each network
//! call's outcome becomes a [`Notice`] the front-end drains and displays.

use std::fmt;

use itam_core::types::DbId;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Row the notice is scoped to, for row-level errors.
    pub line_id: Option<DbId>,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line_id {
            Some(id) => write!(f, "[{}] line {id}: {}", self.level.as_str(), self.message),
            None => write!(f, "[{}] {}", self.level.as_str(), self.message),
        }
    }
}

/// Queue of pending notices.
#[derive(Debug, Default)]
pub struct Notices {
    items: Vec<Notice>,
}

impl Notices {
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>, line_id: Option<DbId>) {
        self.items.push(Notice {
            level,
            message: message.into(),
            line_id,
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message, None);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message, None);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message, None);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message, None);
    }

    pub fn row_error(&mut self, line_id: DbId, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message, Some(line_id));
    }

    pub fn peek(&self) -> &[Notice] {
        &self.items
    }

    /// Take every pending notice, oldest first.
    pub fn drain(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.items)
    }
}
