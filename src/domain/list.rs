use crate::domain::ids::{BoardId, ListId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// List names that mean a card in them is actively being worked
const IN_PROGRESS_NAME_PATTERNS: [&str; 4] = ["in progress", "in-progress", "doing", "working"];

/// Exact-match alias for the in-progress heuristic
const IN_PROGRESS_ALIAS: &str = "wip";

/// List names that mean a card in them is under review
const REVIEW_NAME_PATTERNS: [&str; 1] = ["review"];

/// Exact-match alias for the review heuristic
const REVIEW_ALIAS: &str = "qa";

/// List names that mean work in them is finished
const DONE_NAME_PATTERNS: [&str; 3] = ["done", "complete", "finished"];

/// Checks whether a list name denotes an in-progress work state.
///
/// The check is a case-insensitive substring match against a small set of
/// conventional names, so creative naming can produce false results; callers
/// must tolerate both directions.
///
/// # Examples
/// ```
/// use fallo_core::domain::list::is_in_progress_name;
///
/// assert!(is_in_progress_name("In Progress"));
/// assert!(is_in_progress_name("Doing (sprint 3)"));
/// assert!(!is_in_progress_name("Backlog"));
/// ```
pub fn is_in_progress_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    let trimmed = lowered.trim();
    trimmed == IN_PROGRESS_ALIAS
        || IN_PROGRESS_NAME_PATTERNS
            .iter()
            .any(|pattern| trimmed.contains(pattern))
}

/// Checks whether a list name denotes a review state
pub fn is_review_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    let trimmed = lowered.trim();
    trimmed == REVIEW_ALIAS
        || REVIEW_NAME_PATTERNS
            .iter()
            .any(|pattern| trimmed.contains(pattern))
}

/// Checks whether a list name denotes finished work
pub fn is_done_name(name: &str) -> bool {
    let lowered = name.to_lowercase();
    let trimmed = lowered.trim();
    DONE_NAME_PATTERNS
        .iter()
        .any(|pattern| trimmed.contains(pattern))
}

/// An ordered container of cards within a board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct List {
    pub id: ListId,
    pub board_id: BoardId,
    pub name: String,
    /// Position among sibling lists on the board
    pub position: u32,
    pub created_at: DateTime<Utc>,
}

impl List {
    /// Creates a new list on the given board
    pub fn new(board_id: BoardId, name: impl Into<String>, position: u32) -> Self {
        Self {
            id: ListId::new(),
            board_id,
            name: name.into(),
            position,
            created_at: Utc::now(),
        }
    }

    /// Returns the lightweight snapshot passed to transition collaborators
    pub fn snapshot(&self) -> ListSnapshot {
        ListSnapshot {
            id: self.id,
            name: self.name.clone(),
        }
    }
}

/// The identity and name of a list at the moment of a card transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSnapshot {
    pub id: ListId,
    pub name: String,
}

impl From<&List> for ListSnapshot {
    fn from(list: &List) -> Self {
        list.snapshot()
    }
}
