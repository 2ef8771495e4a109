//! Card reordering: the transactional move plus its best-effort side effects.
//!
//! A reorder runs in two phases. `commit_positions` is atomic: the position
//! renumbering and any review-cycle events land together or not at all.
//! `apply_side_effects` runs after the commit and is advisory: time-log
//! bookkeeping and reviewer notifications may fail without affecting the
//! already-committed move, so their errors are logged and swallowed.

use crate::{
    domain::{
        is_in_progress_name, is_review_name, Board, BoardId, CardId, List, ListId, ListSnapshot,
        UserId,
    },
    error::{FalloError, Result},
    notify::{send_review_notifications, Notifier},
    review::{ListTransition, ReviewCycleHandler},
    storage::{BoardStore, ReorderCommit},
    tracking::{TimeLogLedger, TrackingPolicy},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod plan;

/// A request to move one card, possibly across lists
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReorderRequest {
    pub card_id: CardId,
    pub source_list_id: ListId,
    pub destination_list_id: ListId,
    pub new_position: u32,
}

impl ReorderRequest {
    /// Checks whether the move crosses lists
    pub fn is_cross_list(&self) -> bool {
        self.source_list_id != self.destination_list_id
    }

    fn validate(&self) -> Result<()> {
        if self.card_id.is_nil() {
            return Err(FalloError::Validation("card_id is required".to_string()));
        }
        if self.source_list_id.is_nil() {
            return Err(FalloError::Validation(
                "source_list_id is required".to_string(),
            ));
        }
        if self.destination_list_id.is_nil() {
            return Err(FalloError::Validation(
                "destination_list_id is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// What to do with a requested position beyond the end of the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionPolicy {
    /// Treat out-of-range positions as append (the source system never
    /// validated them)
    #[default]
    Clamp,
    /// Fail the request with a position-out-of-range error
    Reject,
}

/// Tunable behavior of the reorder flow
#[derive(Debug, Clone)]
pub struct ReorderConfig {
    pub position_policy: PositionPolicy,
    pub tracking: TrackingPolicy,
    /// Generous, to accommodate the review-cycle work committed with the move
    pub transaction_timeout: Duration,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            position_policy: PositionPolicy::Clamp,
            tracking: TrackingPolicy::default(),
            transaction_timeout: Duration::from_secs(15),
        }
    }
}

/// The delta a committed reorder hands to the best-effort phase
#[derive(Debug, Clone)]
pub struct CommittedMove {
    pub board_id: BoardId,
    pub card_id: CardId,
    pub source: ListSnapshot,
    pub destination: ListSnapshot,
    pub new_position: u32,
    pub crossed_lists: bool,
}

/// Orchestrates card moves over a store, a review-cycle handler, and a
/// notifier.
///
/// The acting user is an explicit parameter on every entry point; the service
/// holds no session state. Board membership is the caller's responsibility
/// and must be checked before calling in.
pub struct ReorderService<S, R, N> {
    store: Arc<S>,
    review: Arc<R>,
    notifier: Arc<N>,
    config: ReorderConfig,
}

impl<S, R, N> ReorderService<S, R, N>
where
    S: BoardStore + 'static,
    R: ReviewCycleHandler,
    N: Notifier + 'static,
{
    /// Creates a service with the default configuration
    pub fn new(store: Arc<S>, review: Arc<R>, notifier: Arc<N>) -> Self {
        Self {
            store,
            review,
            notifier,
            config: ReorderConfig::default(),
        }
    }

    /// Replaces the configuration
    pub fn with_config(mut self, config: ReorderConfig) -> Self {
        self.config = config;
        self
    }

    /// Moves a card per the request, acting as `actor`.
    ///
    /// On success the move has committed; time tracking and notifications are
    /// applied best-effort afterwards. Callers wanting a fresh view of the
    /// board re-read it, no payload is returned.
    pub async fn reorder(
        &self,
        actor: UserId,
        board_id: BoardId,
        request: &ReorderRequest,
    ) -> Result<()> {
        request.validate()?;

        let board = self.store.board(board_id).await?;
        let source = self.resolve_list(board_id, request.source_list_id).await?;
        let destination = if request.is_cross_list() {
            self.resolve_list(board_id, request.destination_list_id)
                .await?
        } else {
            source.clone()
        };

        let delta = self
            .commit_positions(&board, request, &source, &destination)
            .await?;
        self.apply_side_effects(actor, &delta).await;
        Ok(())
    }

    /// Transactional phase: plans the renumbering and commits it atomically
    /// together with any review-cycle events.
    async fn commit_positions(
        &self,
        board: &Board,
        request: &ReorderRequest,
        source: &List,
        destination: &List,
    ) -> Result<CommittedMove> {
        let card = self.store.card(request.card_id).await?;
        if card.list_id != source.id {
            return Err(FalloError::CardNotFound(request.card_id.to_string()));
        }

        let commit = if request.is_cross_list() {
            let destination_len = self.store.cards_in_list(destination.id).await?.len() as u32;
            let new_position =
                self.resolve_position(destination, request.new_position, destination_len, true)?;

            let transition = ListTransition {
                card_id: card.id,
                from: source.snapshot(),
                to: destination.snapshot(),
                settings: board.settings.clone(),
            };
            let review_events = match self.review.on_card_transition(&transition).await {
                Ok(events) => events,
                Err(err) => {
                    tracing::error!(
                        error = %err,
                        card = %card.id,
                        "review-cycle handler rejected the transition"
                    );
                    return Err(FalloError::Internal(format!(
                        "review-cycle transition failed: {}",
                        err
                    )));
                }
            };

            ReorderCommit {
                card_id: card.id,
                source_list_id: source.id,
                destination_list_id: destination.id,
                expected_position: card.position,
                new_position,
                shifts: plan::across_lists(destination.id, new_position, destination_len),
                compact_source: true,
                review_events,
            }
        } else {
            let len = self.store.cards_in_list(source.id).await?.len() as u32;
            let new_position = self.resolve_position(source, request.new_position, len, false)?;

            ReorderCommit {
                card_id: card.id,
                source_list_id: source.id,
                destination_list_id: source.id,
                expected_position: card.position,
                new_position,
                shifts: plan::within_list(source.id, card.position, new_position),
                compact_source: false,
                review_events: Vec::new(),
            }
        };

        match tokio::time::timeout(
            self.config.transaction_timeout,
            self.store.commit_reorder(&commit),
        )
        .await
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(Self::commit_error(err)),
            Err(_) => {
                tracing::error!(card = %commit.card_id, "reorder transaction timed out");
                return Err(FalloError::Internal(
                    "reorder transaction timed out; positions are unchanged".to_string(),
                ));
            }
        }

        Ok(CommittedMove {
            board_id: board.id,
            card_id: card.id,
            source: source.snapshot(),
            destination: destination.snapshot(),
            new_position: commit.new_position,
            crossed_lists: request.is_cross_list(),
        })
    }

    /// Best-effort phase: time tracking and reviewer notification.
    async fn apply_side_effects(&self, actor: UserId, delta: &CommittedMove) {
        if !delta.crossed_lists {
            return;
        }

        let ledger = TimeLogLedger::new(Arc::clone(&self.store), self.config.tracking.clone());
        if is_in_progress_name(&delta.source.name) {
            if let Err(err) = ledger.on_leave_in_progress(delta.card_id, actor).await {
                tracing::warn!(
                    error = %err,
                    card = %delta.card_id,
                    "failed to close time log after move"
                );
            }
        }
        if is_in_progress_name(&delta.destination.name) {
            if let Err(err) = ledger
                .on_enter_in_progress(delta.card_id, actor, delta.destination.id)
                .await
            {
                tracing::warn!(
                    error = %err,
                    card = %delta.card_id,
                    "failed to open time log after move"
                );
            }
        }

        if is_review_name(&delta.destination.name) && !is_review_name(&delta.source.name) {
            // Detached: the caller never waits on notification delivery
            let store = Arc::clone(&self.store);
            let notifier = Arc::clone(&self.notifier);
            let delta = delta.clone();
            tokio::spawn(async move {
                match send_review_notifications(store.as_ref(), notifier.as_ref(), &delta).await {
                    Ok(sent) => {
                        tracing::debug!(sent, card = %delta.card_id, "review notifications dispatched");
                    }
                    Err(err) => {
                        tracing::warn!(
                            error = %err,
                            card = %delta.card_id,
                            "review notification dispatch failed"
                        );
                    }
                }
            });
        }
    }

    async fn resolve_list(&self, board_id: BoardId, list_id: ListId) -> Result<List> {
        let list = self.store.list(list_id).await?;
        if list.board_id != board_id {
            return Err(FalloError::ListNotFound(list_id.to_string()));
        }
        Ok(list)
    }

    fn resolve_position(
        &self,
        list: &List,
        requested: u32,
        len: u32,
        inserting: bool,
    ) -> Result<u32> {
        match self.config.position_policy {
            PositionPolicy::Clamp => Ok(if inserting {
                plan::clamp_across_lists(requested, len)
            } else {
                plan::clamp_within_list(requested, len)
            }),
            PositionPolicy::Reject => {
                let max = if inserting { len } else { len.saturating_sub(1) };
                if requested > max {
                    Err(FalloError::PositionOutOfRange {
                        list_id: list.id.to_string(),
                        position: requested,
                        length: len,
                    })
                } else {
                    Ok(requested)
                }
            }
        }
    }

    fn commit_error(err: FalloError) -> FalloError {
        match err {
            err @ (FalloError::CardNotFound(_) | FalloError::ListNotFound(_)) => err,
            other => {
                tracing::error!(error = %other, "reorder transaction failed and was rolled back");
                FalloError::Internal(format!("reorder transaction failed: {}", other))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Approver, BoardSettings, Card, CardKind};
    use crate::notify::{NullNotifier, ReviewRequestNote};
    use crate::review::{
        NameBasedReviewCycle, NoopReviewCycle, ReviewCycleAction, ReviewCycleEvent,
    };
    use crate::storage::memory_storage::MemoryStorage;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Fixture {
        store: Arc<MemoryStorage>,
        board: Board,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(MemoryStorage::new());
            let board = Board::new("Fixture Board");
            store.save_board(&board).await.unwrap();
            Self { store, board }
        }

        async fn with_settings(settings: BoardSettings) -> Self {
            let store = Arc::new(MemoryStorage::new());
            let board = Board::new("Fixture Board").with_settings(settings);
            store.save_board(&board).await.unwrap();
            Self { store, board }
        }

        async fn add_list(&self, name: &str, position: u32) -> List {
            let list = List::new(self.board.id, name, position);
            self.store.save_list(&list).await.unwrap();
            list
        }

        async fn add_card(&self, list: &List, title: &str, position: u32) -> Card {
            let card = Card::new(list.id, CardKind::Task, title, position);
            self.store.save_card(&card).await.unwrap();
            card
        }

        async fn add_assigned_card(
            &self,
            list: &List,
            title: &str,
            position: u32,
            assignees: Vec<UserId>,
        ) -> Card {
            let card =
                Card::new(list.id, CardKind::Task, title, position).with_assignees(assignees);
            self.store.save_card(&card).await.unwrap();
            card
        }

        fn service(&self) -> ReorderService<MemoryStorage, NameBasedReviewCycle, NullNotifier> {
            ReorderService::new(
                Arc::clone(&self.store),
                Arc::new(NameBasedReviewCycle),
                Arc::new(NullNotifier),
            )
        }

        async fn layout(&self, list: &List) -> Vec<(String, u32)> {
            self.store
                .cards_in_list(list.id)
                .await
                .unwrap()
                .into_iter()
                .map(|card| (card.title, card.position))
                .collect()
        }

        async fn assert_dense(&self, list: &List) {
            let positions: Vec<u32> = self
                .store
                .cards_in_list(list.id)
                .await
                .unwrap()
                .into_iter()
                .map(|card| card.position)
                .collect();
            let expected: Vec<u32> = (0..positions.len() as u32).collect();
            assert_eq!(positions, expected, "list {} has gaps or duplicates", list.name);
        }
    }

    fn request(card: &Card, source: &List, destination: &List, position: u32) -> ReorderRequest {
        ReorderRequest {
            card_id: card.id,
            source_list_id: source.id,
            destination_list_id: destination.id,
            new_position: position,
        }
    }

    #[tokio::test]
    async fn test_same_list_reorder_scenario() {
        // [X@0, Y@1, Z@2], move X to 2 => [Y@0, Z@1, X@2]
        let fx = Fixture::new().await;
        let list = fx.add_list("Backlog", 0).await;
        let x = fx.add_card(&list, "X", 0).await;
        fx.add_card(&list, "Y", 1).await;
        fx.add_card(&list, "Z", 2).await;

        fx.service()
            .reorder(UserId::new(), fx.board.id, &request(&x, &list, &list, 2))
            .await
            .unwrap();

        assert_eq!(
            fx.layout(&list).await,
            vec![
                ("Y".to_string(), 0),
                ("Z".to_string(), 1),
                ("X".to_string(), 2)
            ]
        );
    }

    #[tokio::test]
    async fn test_same_list_backward_move() {
        let fx = Fixture::new().await;
        let list = fx.add_list("Backlog", 0).await;
        fx.add_card(&list, "X", 0).await;
        fx.add_card(&list, "Y", 1).await;
        let z = fx.add_card(&list, "Z", 2).await;

        fx.service()
            .reorder(UserId::new(), fx.board.id, &request(&z, &list, &list, 0))
            .await
            .unwrap();

        assert_eq!(
            fx.layout(&list).await,
            vec![
                ("Z".to_string(), 0),
                ("X".to_string(), 1),
                ("Y".to_string(), 2)
            ]
        );
    }

    #[tokio::test]
    async fn test_noop_move_leaves_positions_unchanged() {
        let fx = Fixture::new().await;
        let list = fx.add_list("Backlog", 0).await;
        fx.add_card(&list, "X", 0).await;
        let y = fx.add_card(&list, "Y", 1).await;
        fx.add_card(&list, "Z", 2).await;
        let before = fx.layout(&list).await;

        fx.service()
            .reorder(UserId::new(), fx.board.id, &request(&y, &list, &list, 1))
            .await
            .unwrap();

        assert_eq!(fx.layout(&list).await, before);
    }

    #[tokio::test]
    async fn test_cross_list_move_into_middle_scenario() {
        // A=[P@0, Q@1], B=[R@0, S@1, T@2]; move P to B@1
        // => B=[R@0, P@1, S@2, T@3], A=[Q@0]
        let fx = Fixture::new().await;
        let a = fx.add_list("A", 0).await;
        let b = fx.add_list("B", 1).await;
        let p = fx.add_card(&a, "P", 0).await;
        fx.add_card(&a, "Q", 1).await;
        fx.add_card(&b, "R", 0).await;
        fx.add_card(&b, "S", 1).await;
        fx.add_card(&b, "T", 2).await;

        fx.service()
            .reorder(UserId::new(), fx.board.id, &request(&p, &a, &b, 1))
            .await
            .unwrap();

        assert_eq!(
            fx.layout(&b).await,
            vec![
                ("R".to_string(), 0),
                ("P".to_string(), 1),
                ("S".to_string(), 2),
                ("T".to_string(), 3)
            ]
        );
        assert_eq!(fx.layout(&a).await, vec![("Q".to_string(), 0)]);
    }

    #[tokio::test]
    async fn test_round_trip_restores_original_order() {
        let fx = Fixture::new().await;
        let a = fx.add_list("A", 0).await;
        let b = fx.add_list("B", 1).await;
        fx.add_card(&a, "P", 0).await;
        let q = fx.add_card(&a, "Q", 1).await;
        fx.add_card(&a, "R", 2).await;
        fx.add_card(&b, "S", 0).await;
        let original_a = fx.layout(&a).await;
        let original_b = fx.layout(&b).await;
        let service = fx.service();
        let actor = UserId::new();

        service
            .reorder(actor, fx.board.id, &request(&q, &a, &b, 1))
            .await
            .unwrap();
        service
            .reorder(actor, fx.board.id, &request(&q, &b, &a, 1))
            .await
            .unwrap();

        assert_eq!(fx.layout(&a).await, original_a);
        assert_eq!(fx.layout(&b).await, original_b);
    }

    #[tokio::test]
    async fn test_positions_stay_dense_across_many_moves() {
        let fx = Fixture::new().await;
        let a = fx.add_list("A", 0).await;
        let b = fx.add_list("B", 1).await;
        let mut cards = Vec::new();
        for i in 0..5u32 {
            cards.push(fx.add_card(&a, &format!("a{}", i), i).await);
        }
        for i in 0..3u32 {
            fx.add_card(&b, &format!("b{}", i), i).await;
        }
        let service = fx.service();
        let actor = UserId::new();

        let moves = [
            request(&cards[0], &a, &a, 4),
            request(&cards[2], &a, &b, 0),
            request(&cards[4], &a, &b, 3),
            request(&cards[1], &a, &a, 0),
            request(&cards[2], &b, &a, 2),
        ];
        for step in &moves {
            service.reorder(actor, fx.board.id, step).await.unwrap();
        }

        fx.assert_dense(&a).await;
        fx.assert_dense(&b).await;
    }

    #[tokio::test]
    async fn test_out_of_range_position_clamps_to_append() {
        let fx = Fixture::new().await;
        let a = fx.add_list("A", 0).await;
        let b = fx.add_list("B", 1).await;
        let p = fx.add_card(&a, "P", 0).await;
        fx.add_card(&b, "R", 0).await;

        fx.service()
            .reorder(UserId::new(), fx.board.id, &request(&p, &a, &b, 99))
            .await
            .unwrap();

        assert_eq!(
            fx.layout(&b).await,
            vec![("R".to_string(), 0), ("P".to_string(), 1)]
        );
    }

    #[tokio::test]
    async fn test_out_of_range_position_rejected_when_configured() {
        let fx = Fixture::new().await;
        let a = fx.add_list("A", 0).await;
        let b = fx.add_list("B", 1).await;
        let p = fx.add_card(&a, "P", 0).await;
        fx.add_card(&b, "R", 0).await;
        let before = fx.layout(&b).await;

        let service = fx.service().with_config(ReorderConfig {
            position_policy: PositionPolicy::Reject,
            ..ReorderConfig::default()
        });
        let err = service
            .reorder(UserId::new(), fx.board.id, &request(&p, &a, &b, 99))
            .await
            .unwrap_err();

        assert!(matches!(err, FalloError::PositionOutOfRange { .. }));
        assert_eq!(fx.layout(&b).await, before);
        assert_eq!(fx.layout(&a).await, vec![("P".to_string(), 0)]);
    }

    #[tokio::test]
    async fn test_missing_card_rolls_back_nothing_changes() {
        let fx = Fixture::new().await;
        let list = fx.add_list("Backlog", 0).await;
        fx.add_card(&list, "X", 0).await;
        fx.add_card(&list, "Y", 1).await;
        let before = fx.layout(&list).await;

        let ghost = ReorderRequest {
            card_id: CardId::new(),
            source_list_id: list.id,
            destination_list_id: list.id,
            new_position: 0,
        };
        let err = fx
            .service()
            .reorder(UserId::new(), fx.board.id, &ghost)
            .await
            .unwrap_err();

        assert!(matches!(err, FalloError::CardNotFound(_)));
        assert_eq!(fx.layout(&list).await, before);
    }

    #[tokio::test]
    async fn test_card_in_wrong_source_list_is_not_found() {
        let fx = Fixture::new().await;
        let a = fx.add_list("A", 0).await;
        let b = fx.add_list("B", 1).await;
        let p = fx.add_card(&a, "P", 0).await;

        // Request claims the card lives in B
        let err = fx
            .service()
            .reorder(UserId::new(), fx.board.id, &request(&p, &b, &a, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, FalloError::CardNotFound(_)));
    }

    #[tokio::test]
    async fn test_list_from_another_board_is_not_found() {
        let fx = Fixture::new().await;
        let a = fx.add_list("A", 0).await;
        let p = fx.add_card(&a, "P", 0).await;

        let other_board = Board::new("Other");
        fx.store.save_board(&other_board).await.unwrap();
        let foreign = List::new(other_board.id, "Foreign", 0);
        fx.store.save_list(&foreign).await.unwrap();

        let err = fx
            .service()
            .reorder(UserId::new(), fx.board.id, &request(&p, &a, &foreign, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, FalloError::ListNotFound(_)));
    }

    #[tokio::test]
    async fn test_nil_request_fields_fail_validation() {
        let fx = Fixture::new().await;
        let list = fx.add_list("Backlog", 0).await;

        let bad = ReorderRequest {
            card_id: CardId::from(uuid::Uuid::nil()),
            source_list_id: list.id,
            destination_list_id: list.id,
            new_position: 0,
        };
        let err = fx
            .service()
            .reorder(UserId::new(), fx.board.id, &bad)
            .await
            .unwrap_err();
        assert!(matches!(err, FalloError::Validation(_)));
    }

    #[tokio::test]
    async fn test_enter_then_leave_in_progress_tracks_time() {
        let fx = Fixture::new().await;
        let backlog = fx.add_list("Backlog", 0).await;
        let doing = fx.add_list("In Progress", 1).await;
        let done = fx.add_list("Done", 2).await;
        let user = UserId::new();
        let card = fx
            .add_assigned_card(&backlog, "Tracked", 0, vec![user])
            .await;
        let service = fx.service();

        service
            .reorder(user, fx.board.id, &request(&card, &backlog, &doing, 0))
            .await
            .unwrap();

        let open = fx
            .store
            .find_open_time_log(card.id, user)
            .await
            .unwrap()
            .expect("entry should open on entering in-progress");
        assert_eq!(open.list_id, doing.id);

        service
            .reorder(user, fx.board.id, &request(&card, &doing, &done, 0))
            .await
            .unwrap();

        assert!(fx
            .store
            .find_open_time_log(card.id, user)
            .await
            .unwrap()
            .is_none());
        let entries = fx.store.time_logs_for_card(card.id).await.unwrap();
        assert_eq!(entries.len(), 1);
        let closed = &entries[0];
        assert_eq!(
            closed.duration_ms.unwrap(),
            (closed.ended_at.unwrap() - closed.started_at).num_milliseconds()
        );
    }

    #[tokio::test]
    async fn test_unassigned_card_tracks_the_mover() {
        let fx = Fixture::new().await;
        let backlog = fx.add_list("Backlog", 0).await;
        let doing = fx.add_list("Doing", 1).await;
        let card = fx.add_card(&backlog, "Free", 0).await;
        let mover = UserId::new();

        fx.service()
            .reorder(mover, fx.board.id, &request(&card, &backlog, &doing, 0))
            .await
            .unwrap();

        assert!(fx
            .store
            .find_open_time_log(card.id, mover)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_in_progress_to_in_progress_keeps_one_open_entry() {
        let fx = Fixture::new().await;
        let doing = fx.add_list("Doing", 0).await;
        let wip = fx.add_list("WIP", 1).await;
        let user = UserId::new();
        let card = fx.add_assigned_card(&doing, "Hot", 0, vec![user]).await;
        let service = fx.service();

        // Open an entry by entering Doing from Backlog first
        let backlog = fx.add_list("Backlog", 2).await;
        service
            .reorder(user, fx.board.id, &request(&card, &doing, &backlog, 0))
            .await
            .unwrap();
        service
            .reorder(user, fx.board.id, &request(&card, &backlog, &doing, 0))
            .await
            .unwrap();
        service
            .reorder(user, fx.board.id, &request(&card, &doing, &wip, 0))
            .await
            .unwrap();

        let entries = fx.store.time_logs_for_card(card.id).await.unwrap();
        let open: Vec<_> = entries.iter().filter(|entry| entry.is_open()).collect();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].list_id, wip.id);
        // The Doing interval was closed with a real duration, not defensively
        assert!(entries
            .iter()
            .filter(|entry| !entry.is_open())
            .all(|entry| entry.duration_ms.is_some()));
    }

    #[tokio::test]
    async fn test_same_list_move_does_not_touch_time_logs() {
        let fx = Fixture::new().await;
        let doing = fx.add_list("In Progress", 0).await;
        let user = UserId::new();
        let card = fx.add_assigned_card(&doing, "Busy", 0, vec![user]).await;
        fx.add_card(&doing, "Other", 1).await;

        fx.service()
            .reorder(user, fx.board.id, &request(&card, &doing, &doing, 1))
            .await
            .unwrap();

        assert!(fx.store.time_logs_for_card(card.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_review_events_commit_with_the_move() {
        let fx = Fixture::new().await;
        let doing = fx.add_list("In Progress", 0).await;
        let review = fx.add_list("Review", 1).await;
        let card = fx.add_card(&doing, "Ready", 0).await;

        fx.service()
            .reorder(UserId::new(), fx.board.id, &request(&card, &doing, &review, 0))
            .await
            .unwrap();

        let events = fx.store.review_events_for_card(card.id).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, ReviewCycleAction::Opened);
        assert_eq!(events[0].from_list_id, doing.id);
        assert_eq!(events[0].to_list_id, review.id);
    }

    struct FailingReviewCycle;

    #[async_trait]
    impl ReviewCycleHandler for FailingReviewCycle {
        async fn on_card_transition(
            &self,
            _transition: &ListTransition,
        ) -> Result<Vec<ReviewCycleEvent>> {
            Err(FalloError::Internal("review workflow unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failing_review_handler_aborts_the_whole_move() {
        let fx = Fixture::new().await;
        let a = fx.add_list("A", 0).await;
        let b = fx.add_list("Review", 1).await;
        let p = fx.add_card(&a, "P", 0).await;
        fx.add_card(&b, "R", 0).await;
        let before_a = fx.layout(&a).await;
        let before_b = fx.layout(&b).await;

        let service = ReorderService::new(
            Arc::clone(&fx.store),
            Arc::new(FailingReviewCycle),
            Arc::new(NullNotifier),
        );
        let err = service
            .reorder(UserId::new(), fx.board.id, &request(&p, &a, &b, 0))
            .await
            .unwrap_err();

        assert!(matches!(err, FalloError::Internal(_)));
        assert_eq!(fx.layout(&a).await, before_a);
        assert_eq!(fx.layout(&b).await, before_b);
        assert!(fx
            .store
            .review_events_for_card(p.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[derive(Default)]
    struct RecordingNotifier {
        notes: Mutex<Vec<ReviewRequestNote>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify_review_requested(&self, note: &ReviewRequestNote) -> Result<()> {
            self.notes.lock().unwrap().push(note.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_entering_review_notifies_each_approver() {
        let lead = UserId::new();
        let qa = UserId::new();
        let fx = Fixture::with_settings(BoardSettings {
            approvers: vec![Approver::new(lead, "Lead"), Approver::new(qa, "QA")],
            notify_on_review: true,
        })
        .await;
        let doing = fx.add_list("In Progress", 0).await;
        let review = fx.add_list("Review", 1).await;
        let card = fx.add_card(&doing, "Ship it", 0).await;

        let notifier = Arc::new(RecordingNotifier::default());
        let service = ReorderService::new(
            Arc::clone(&fx.store),
            Arc::new(NoopReviewCycle),
            Arc::clone(&notifier),
        );
        service
            .reorder(UserId::new(), fx.board.id, &request(&card, &doing, &review, 0))
            .await
            .unwrap();

        // Delivery runs on a detached task
        tokio::time::sleep(Duration::from_millis(50)).await;

        let notes = notifier.notes.lock().unwrap();
        assert_eq!(notes.len(), 2);
        let recipients: Vec<UserId> = notes.iter().map(|note| note.approver.user_id).collect();
        assert!(recipients.contains(&lead));
        assert!(recipients.contains(&qa));
        assert!(notes.iter().all(|note| note.card_id == card.id));
    }

    #[tokio::test]
    async fn test_review_to_review_move_does_not_notify() {
        let fx = Fixture::with_settings(BoardSettings {
            approvers: vec![Approver::new(UserId::new(), "Lead")],
            notify_on_review: true,
        })
        .await;
        let review = fx.add_list("Review", 0).await;
        let qa = fx.add_list("QA", 1).await;
        let card = fx.add_card(&review, "Twice reviewed", 0).await;

        let notifier = Arc::new(RecordingNotifier::default());
        let service = ReorderService::new(
            Arc::clone(&fx.store),
            Arc::new(NoopReviewCycle),
            Arc::clone(&notifier),
        );
        service
            .reorder(UserId::new(), fx.board.id, &request(&card, &review, &qa, 0))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(notifier.notes.lock().unwrap().is_empty());
    }
}
