//! Active-work time tracking as cards cross in-progress boundaries.

use crate::{
    domain::{CardId, ListId, TimeLogEntry, UserId},
    error::Result,
    storage::BoardStore,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Who gets tracked when a card enters an in-progress list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingPolicy {
    /// When a card has no assignees, track whoever moved it
    pub track_unassigned_mover: bool,
}

impl Default for TrackingPolicy {
    fn default() -> Self {
        Self {
            track_unassigned_mover: true,
        }
    }
}

/// Maintains the one-open-entry-per-(card, user) invariant over the store.
///
/// The invariant is procedural: `on_enter_in_progress` always closes before
/// it opens, so callers must preserve call ordering rather than rely on a
/// storage constraint.
pub struct TimeLogLedger<S> {
    store: Arc<S>,
    policy: TrackingPolicy,
}

impl<S: BoardStore> TimeLogLedger<S> {
    pub fn new(store: Arc<S>, policy: TrackingPolicy) -> Self {
        Self { store, policy }
    }

    /// Closes the open entry for (card, user) with a computed duration.
    ///
    /// No open entry is not an error: the user may simply not have been
    /// tracking when the card left the in-progress list.
    pub async fn on_leave_in_progress(
        &self,
        card_id: CardId,
        user_id: UserId,
    ) -> Result<Option<TimeLogEntry>> {
        let Some(mut entry) = self.store.find_open_time_log(card_id, user_id).await? else {
            return Ok(None);
        };

        let ended_at = Utc::now();
        entry.close(ended_at);
        self.store
            .close_time_log(entry.id, ended_at, entry.duration_ms)
            .await?;
        Ok(Some(entry))
    }

    /// Opens a new entry for (card, user) if the tracking gate allows it.
    ///
    /// Tracks when the acting user is among the card's assignees, or when the
    /// card has no assignees and the policy tracks the mover. Any stray open
    /// entry is closed first (without a duration) so two entries are never
    /// open at once.
    pub async fn on_enter_in_progress(
        &self,
        card_id: CardId,
        user_id: UserId,
        destination_list_id: ListId,
    ) -> Result<Option<TimeLogEntry>> {
        let assignees = self.store.card_assignees(card_id).await?;
        let tracked = assignees.contains(&user_id)
            || (assignees.is_empty() && self.policy.track_unassigned_mover);
        if !tracked {
            return Ok(None);
        }

        if let Some(stray) = self.store.find_open_time_log(card_id, user_id).await? {
            tracing::warn!(
                entry = %stray.id,
                card = %card_id,
                "closing stray open time log before starting a new one"
            );
            self.store.close_time_log(stray.id, Utc::now(), None).await?;
        }

        let entry = TimeLogEntry::open(card_id, user_id, destination_list_id);
        self.store.open_time_log(&entry).await?;
        Ok(Some(entry))
    }
}
