use crate::domain::ids::{CardId, ListId, TimeLogId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One continuous interval of a user actively working a card.
///
/// An entry with a null `ended_at` is open; for any (card, user) pair at most
/// one entry is open at a time. That guarantee is procedural (the ledger
/// closes before it opens), not a storage constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeLogEntry {
    pub id: TimeLogId,
    pub card_id: CardId,
    pub user_id: UserId,
    /// The list the card was in when tracking started
    pub list_id: ListId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Computed at close time as end minus start, in milliseconds
    pub duration_ms: Option<i64>,
}

impl TimeLogEntry {
    /// Opens a new entry starting now
    pub fn open(card_id: CardId, user_id: UserId, list_id: ListId) -> Self {
        Self {
            id: TimeLogId::new(),
            card_id,
            user_id,
            list_id,
            started_at: Utc::now(),
            ended_at: None,
            duration_ms: None,
        }
    }

    /// Checks whether the entry is still open
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Closes the entry at the given instant, computing the duration
    pub fn close(&mut self, ended_at: DateTime<Utc>) {
        self.duration_ms = Some((ended_at - self.started_at).num_milliseconds());
        self.ended_at = Some(ended_at);
    }
}
