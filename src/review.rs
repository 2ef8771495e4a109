//! Review-cycle transitions driven by cross-list card moves.
//!
//! The reorder flow treats the review workflow as a collaborator: on a
//! cross-list move it asks a [`ReviewCycleHandler`] which events to record,
//! and the store persists those events in the same transaction as the
//! position change. A handler failure therefore aborts the move before
//! anything is written.

use crate::{
    domain::{
        ids::{CardId, ListId},
        is_done_name, is_review_name, BoardSettings, ListSnapshot,
    },
    error::Result,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A card crossing from one list to another
#[derive(Debug, Clone)]
pub struct ListTransition {
    pub card_id: CardId,
    pub from: ListSnapshot,
    pub to: ListSnapshot,
    pub settings: BoardSettings,
}

/// What happened to a card's review cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewCycleAction {
    Opened,
    Closed,
    Locked,
}

/// A review-cycle transition recorded alongside a card move
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewCycleEvent {
    pub card_id: CardId,
    pub from_list_id: ListId,
    pub to_list_id: ListId,
    pub action: ReviewCycleAction,
    pub recorded_at: DateTime<Utc>,
}

impl ReviewCycleEvent {
    fn new(transition: &ListTransition, action: ReviewCycleAction) -> Self {
        Self {
            card_id: transition.card_id,
            from_list_id: transition.from.id,
            to_list_id: transition.to.id,
            action,
            recorded_at: Utc::now(),
        }
    }
}

/// Decides which review-cycle events a cross-list move produces.
///
/// Implementations must be pure with respect to board state: they return the
/// events to persist and the store writes them atomically with the position
/// change.
#[async_trait]
pub trait ReviewCycleHandler: Send + Sync {
    async fn on_card_transition(&self, transition: &ListTransition) -> Result<Vec<ReviewCycleEvent>>;
}

/// Handler for deployments that wire their own review workflow
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReviewCycle;

#[async_trait]
impl ReviewCycleHandler for NoopReviewCycle {
    async fn on_card_transition(
        &self,
        _transition: &ListTransition,
    ) -> Result<Vec<ReviewCycleEvent>> {
        Ok(Vec::new())
    }
}

/// Default handler: infers review-cycle transitions from list names.
///
/// Entering a review list opens a cycle. Leaving review back to a work list
/// closes it (the reviewer sent it back); leaving review into a done list
/// locks it (the review passed and is final).
#[derive(Debug, Clone, Copy, Default)]
pub struct NameBasedReviewCycle;

#[async_trait]
impl ReviewCycleHandler for NameBasedReviewCycle {
    async fn on_card_transition(&self, transition: &ListTransition) -> Result<Vec<ReviewCycleEvent>> {
        let from_review = is_review_name(&transition.from.name);
        let to_review = is_review_name(&transition.to.name);

        let action = if !from_review && to_review {
            Some(ReviewCycleAction::Opened)
        } else if from_review && !to_review {
            if is_done_name(&transition.to.name) {
                Some(ReviewCycleAction::Locked)
            } else {
                Some(ReviewCycleAction::Closed)
            }
        } else {
            None
        };

        Ok(action
            .map(|action| vec![ReviewCycleEvent::new(transition, action)])
            .unwrap_or_default())
    }
}
