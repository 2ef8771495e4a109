use crate::domain::ids::{BoardId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user who reviews and approves work on a board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approver {
    pub user_id: UserId,
    pub role_name: String,
}

impl Approver {
    pub fn new(user_id: UserId, role_name: impl Into<String>) -> Self {
        Self {
            user_id,
            role_name: role_name.into(),
        }
    }
}

/// Board-level settings that drive review notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSettings {
    /// Users notified when a card enters a review list
    #[serde(default)]
    pub approvers: Vec<Approver>,
    /// Whether entering a review list dispatches notifications at all
    #[serde(default = "default_notify_on_review")]
    pub notify_on_review: bool,
}

fn default_notify_on_review() -> bool {
    true
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            approvers: Vec::new(),
            notify_on_review: true,
        }
    }
}

/// A kanban board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub name: String,
    pub settings: BoardSettings,
    pub created_at: DateTime<Utc>,
}

impl Board {
    /// Creates a new board with default settings
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: BoardId::new(),
            name: name.into(),
            settings: BoardSettings::default(),
            created_at: Utc::now(),
        }
    }

    /// Replaces the board settings
    pub fn with_settings(mut self, settings: BoardSettings) -> Self {
        self.settings = settings;
        self
    }
}
