use crate::{
    domain::{Board, BoardId, Card, CardId, List, ListId, TimeLogEntry, TimeLogId, UserId},
    error::{FalloError, Result},
    review::ReviewCycleEvent,
    storage::{BoardStore, ReorderCommit},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Thread-safe in-memory board store.
///
/// The primary backend for tests and embedded use. `commit_reorder` stages
/// every renumbering before the first mutation, so a rejected commit leaves
/// the state exactly as it was.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    boards: HashMap<BoardId, Board>,
    lists: HashMap<ListId, List>,
    cards: HashMap<CardId, Card>,
    time_logs: Vec<TimeLogEntry>,
    review_events: Vec<ReviewCycleEvent>,
}

impl MemoryStorage {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryState>> {
        self.state
            .read()
            .map_err(|err| FalloError::Storage(err.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryState>> {
        self.state
            .write()
            .map_err(|err| FalloError::Storage(err.to_string()))
    }
}

#[async_trait]
impl BoardStore for MemoryStorage {
    async fn board(&self, id: BoardId) -> Result<Board> {
        let state = self.read()?;
        state
            .boards
            .get(&id)
            .cloned()
            .ok_or_else(|| FalloError::BoardNotFound(id.to_string()))
    }

    async fn list(&self, id: ListId) -> Result<List> {
        let state = self.read()?;
        state
            .lists
            .get(&id)
            .cloned()
            .ok_or_else(|| FalloError::ListNotFound(id.to_string()))
    }

    async fn lists_in_board(&self, board_id: BoardId) -> Result<Vec<List>> {
        let state = self.read()?;
        let mut lists: Vec<List> = state
            .lists
            .values()
            .filter(|list| list.board_id == board_id)
            .cloned()
            .collect();
        lists.sort_by_key(|list| list.position);
        Ok(lists)
    }

    async fn card(&self, id: CardId) -> Result<Card> {
        let state = self.read()?;
        state
            .cards
            .get(&id)
            .cloned()
            .ok_or_else(|| FalloError::CardNotFound(id.to_string()))
    }

    async fn cards_in_list(&self, list_id: ListId) -> Result<Vec<Card>> {
        let state = self.read()?;
        let mut cards: Vec<Card> = state
            .cards
            .values()
            .filter(|card| card.list_id == list_id)
            .cloned()
            .collect();
        cards.sort_by_key(|card| card.position);
        Ok(cards)
    }

    async fn card_assignees(&self, card_id: CardId) -> Result<Vec<UserId>> {
        let state = self.read()?;
        Ok(state
            .cards
            .get(&card_id)
            .map(|card| card.assignees.clone())
            .unwrap_or_default())
    }

    async fn save_board(&self, board: &Board) -> Result<()> {
        let mut state = self.write()?;
        state.boards.insert(board.id, board.clone());
        Ok(())
    }

    async fn save_list(&self, list: &List) -> Result<()> {
        let mut state = self.write()?;
        state.lists.insert(list.id, list.clone());
        Ok(())
    }

    async fn save_card(&self, card: &Card) -> Result<()> {
        let mut state = self.write()?;
        state.cards.insert(card.id, card.clone());
        Ok(())
    }

    async fn commit_reorder(&self, commit: &ReorderCommit) -> Result<()> {
        let mut state = self.write()?;

        let card = state
            .cards
            .get(&commit.card_id)
            .ok_or_else(|| FalloError::CardNotFound(commit.card_id.to_string()))?;
        if card.list_id != commit.source_list_id || card.position != commit.expected_position {
            // The card moved since the plan was made; the caller must replan
            return Err(FalloError::CardNotFound(commit.card_id.to_string()));
        }

        // Stage every renumbering before touching anything, so a failure
        // cannot leave a half-applied move
        let mut staged: Vec<(CardId, u32)> = Vec::new();
        for shift in &commit.shifts {
            for other in state.cards.values() {
                if other.id == commit.card_id {
                    continue;
                }
                if other.list_id == shift.list_id
                    && other.position >= shift.start
                    && other.position <= shift.end
                {
                    let shifted = i64::from(other.position) + i64::from(shift.delta);
                    if shifted < 0 {
                        return Err(FalloError::Storage(format!(
                            "position underflow for card {}",
                            other.id
                        )));
                    }
                    staged.push((other.id, shifted as u32));
                }
            }
        }

        let now = Utc::now();
        for (id, position) in staged {
            if let Some(card) = state.cards.get_mut(&id) {
                card.position = position;
                card.updated_at = now;
            }
        }

        if let Some(moved) = state.cards.get_mut(&commit.card_id) {
            moved.list_id = commit.destination_list_id;
            moved.position = commit.new_position;
            moved.updated_at = now;
        }

        if commit.compact_source {
            let mut remaining: Vec<(CardId, u32)> = state
                .cards
                .values()
                .filter(|card| card.list_id == commit.source_list_id)
                .map(|card| (card.id, card.position))
                .collect();
            remaining.sort_by_key(|(_, position)| *position);

            for (index, (id, _)) in remaining.into_iter().enumerate() {
                if let Some(card) = state.cards.get_mut(&id) {
                    card.position = index as u32;
                }
            }
        }

        state
            .review_events
            .extend(commit.review_events.iter().cloned());
        Ok(())
    }

    async fn open_time_log(&self, entry: &TimeLogEntry) -> Result<()> {
        let mut state = self.write()?;
        state.time_logs.push(entry.clone());
        Ok(())
    }

    async fn find_open_time_log(
        &self,
        card_id: CardId,
        user_id: UserId,
    ) -> Result<Option<TimeLogEntry>> {
        let state = self.read()?;
        Ok(state
            .time_logs
            .iter()
            .find(|entry| entry.card_id == card_id && entry.user_id == user_id && entry.is_open())
            .cloned())
    }

    async fn close_time_log(
        &self,
        id: TimeLogId,
        ended_at: DateTime<Utc>,
        duration_ms: Option<i64>,
    ) -> Result<()> {
        let mut state = self.write()?;
        let entry = state
            .time_logs
            .iter_mut()
            .find(|entry| entry.id == id)
            .ok_or_else(|| FalloError::Storage(format!("time log entry not found: {}", id)))?;
        entry.ended_at = Some(ended_at);
        entry.duration_ms = duration_ms;
        Ok(())
    }

    async fn time_logs_for_card(&self, card_id: CardId) -> Result<Vec<TimeLogEntry>> {
        let state = self.read()?;
        let mut entries: Vec<TimeLogEntry> = state
            .time_logs
            .iter()
            .filter(|entry| entry.card_id == card_id)
            .cloned()
            .collect();
        entries.sort_by_key(|entry| entry.started_at);
        Ok(entries)
    }

    async fn review_events_for_card(&self, card_id: CardId) -> Result<Vec<ReviewCycleEvent>> {
        let state = self.read()?;
        Ok(state
            .review_events
            .iter()
            .filter(|event| event.card_id == card_id)
            .cloned()
            .collect())
    }
}
