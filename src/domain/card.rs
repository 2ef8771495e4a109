use crate::domain::ids::{CardId, ListId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of work a card represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Task,
    UserStory,
    Epic,
    Utility,
}

impl fmt::Display for CardKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Task => write!(f, "Task"),
            Self::UserStory => write!(f, "User Story"),
            Self::Epic => write!(f, "Epic"),
            Self::Utility => write!(f, "Utility"),
        }
    }
}

/// A unit of work belonging to exactly one list at a time.
///
/// Position is zero-based and unique within the owning list; for a list with
/// N cards the positions are exactly 0..N-1. The reorder machinery is the
/// only code that mutates `list_id` and `position`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub list_id: ListId,
    pub kind: CardKind,
    pub title: String,
    pub position: u32,
    #[serde(default)]
    pub assignees: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    /// Creates a new card at the given position in a list
    pub fn new(list_id: ListId, kind: CardKind, title: impl Into<String>, position: u32) -> Self {
        let now = Utc::now();
        Self {
            id: CardId::new(),
            list_id,
            kind,
            title: title.into(),
            position,
            assignees: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the assignees
    pub fn with_assignees(mut self, assignees: Vec<UserId>) -> Self {
        self.assignees = assignees;
        self
    }

    /// Checks whether the given user is assigned to this card
    pub fn is_assigned_to(&self, user_id: UserId) -> bool {
        self.assignees.contains(&user_id)
    }
}
