//! Reviewer notification dispatch.
//!
//! Notifications are advisory: the reorder has already committed by the time
//! they are sent, so delivery runs on a detached task and failures are logged
//! rather than surfaced. [`send_review_notifications`] is the awaitable body
//! of that task so it can be tested directly.

use crate::{
    domain::{Approver, BoardId, CardId},
    error::Result,
    reorder::CommittedMove,
    storage::BoardStore,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One notification asking an approver to review a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewRequestNote {
    pub board_id: BoardId,
    pub card_id: CardId,
    pub approver: Approver,
    /// Name of the review list the card just entered
    pub destination_list: String,
}

/// Delivery port for review notifications (Slack, email, whatever fronts it)
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_review_requested(&self, note: &ReviewRequestNote) -> Result<()>;
}

/// Notifier that only logs; useful as a default and in tests
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

#[async_trait]
impl Notifier for NullNotifier {
    async fn notify_review_requested(&self, note: &ReviewRequestNote) -> Result<()> {
        tracing::debug!(
            board = %note.board_id,
            card = %note.card_id,
            approver = %note.approver.user_id,
            "review notification suppressed (null notifier)"
        );
        Ok(())
    }
}

/// Resolves the board's approver set and dispatches one notification per
/// approver. Per-approver delivery failures are logged and skipped; the
/// returned count is the number actually delivered.
pub async fn send_review_notifications<S, N>(
    store: &S,
    notifier: &N,
    delta: &CommittedMove,
) -> Result<usize>
where
    S: BoardStore + ?Sized,
    N: Notifier + ?Sized,
{
    let board = store.board(delta.board_id).await?;
    if !board.settings.notify_on_review {
        return Ok(0);
    }

    let mut sent = 0;
    for approver in &board.settings.approvers {
        let note = ReviewRequestNote {
            board_id: delta.board_id,
            card_id: delta.card_id,
            approver: approver.clone(),
            destination_list: delta.destination.name.clone(),
        };
        match notifier.notify_review_requested(&note).await {
            Ok(()) => sent += 1,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    approver = %approver.user_id,
                    card = %delta.card_id,
                    "failed to deliver review notification"
                );
            }
        }
    }
    Ok(sent)
}
