use crate::{
    domain::{Board, BoardId, Card, CardId, List, ListId, TimeLogEntry, TimeLogId, UserId},
    error::Result,
    reorder::plan::PositionShift,
    review::ReviewCycleEvent,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod memory_storage;

#[cfg(feature = "sqlite-storage")]
pub mod sqlite_storage;

/// Everything a reorder commits in one transaction.
///
/// `expected_position` is the moved card's position at planning time; a store
/// must reject the commit with a not-found error if the card is no longer at
/// (`source_list_id`, `expected_position`), leaving all rows untouched.
#[derive(Debug, Clone)]
pub struct ReorderCommit {
    pub card_id: CardId,
    pub source_list_id: ListId,
    pub destination_list_id: ListId,
    pub expected_position: u32,
    pub new_position: u32,
    pub shifts: Vec<PositionShift>,
    /// Set on cross-list moves: renumber the source list to 0..N-1 after the
    /// card has left it
    pub compact_source: bool,
    /// Review-cycle events persisted atomically with the position change
    pub review_events: Vec<ReviewCycleEvent>,
}

/// Storage trait for boards, lists, cards, and time logs.
///
/// `commit_reorder` is the only operation with atomicity requirements; the
/// time-log writes are deliberately non-transactional (best-effort phase).
#[async_trait]
pub trait BoardStore: Send + Sync {
    /// Loads a board by ID
    async fn board(&self, id: BoardId) -> Result<Board>;

    /// Loads a list by ID
    async fn list(&self, id: ListId) -> Result<List>;

    /// Lists all lists on a board, ordered by list position
    async fn lists_in_board(&self, board_id: BoardId) -> Result<Vec<List>>;

    /// Loads a card by ID
    async fn card(&self, id: CardId) -> Result<Card>;

    /// Lists all cards in a list, ordered by card position
    async fn cards_in_list(&self, list_id: ListId) -> Result<Vec<Card>>;

    /// Returns a card's assignees; a missing card yields an empty set rather
    /// than an error
    async fn card_assignees(&self, card_id: CardId) -> Result<Vec<UserId>>;

    /// Saves (inserts or replaces) a board
    async fn save_board(&self, board: &Board) -> Result<()>;

    /// Saves (inserts or replaces) a list
    async fn save_list(&self, list: &List) -> Result<()>;

    /// Saves (inserts or replaces) a card
    async fn save_card(&self, card: &Card) -> Result<()>;

    /// Applies a reorder commit atomically: all position changes, the card
    /// placement, source compaction, and review events land together or not
    /// at all
    async fn commit_reorder(&self, commit: &ReorderCommit) -> Result<()>;

    /// Persists a newly opened time log entry
    async fn open_time_log(&self, entry: &TimeLogEntry) -> Result<()>;

    /// Finds the open (null end) entry for a (card, user) pair, if any
    async fn find_open_time_log(
        &self,
        card_id: CardId,
        user_id: UserId,
    ) -> Result<Option<TimeLogEntry>>;

    /// Closes a time log entry; `duration_ms` is absent for defensive closes
    async fn close_time_log(
        &self,
        id: TimeLogId,
        ended_at: DateTime<Utc>,
        duration_ms: Option<i64>,
    ) -> Result<()>;

    /// Returns all time log entries for a card, oldest first
    async fn time_logs_for_card(&self, card_id: CardId) -> Result<Vec<TimeLogEntry>>;

    /// Returns all recorded review-cycle events for a card, oldest first
    async fn review_events_for_card(&self, card_id: CardId) -> Result<Vec<ReviewCycleEvent>>;
}
