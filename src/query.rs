//! Read-side helpers: board views, time reports, and position audits.
//!
//! A reorder returns no payload, so callers that need a fresh view re-read
//! the board through [`board_view`]. The other helpers aggregate what the
//! write side records.

use crate::{
    domain::{Board, BoardId, Card, CardId, List, ListId, UserId},
    error::Result,
    storage::BoardStore,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A board with its lists and their position-ordered cards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub board: Board,
    pub lists: Vec<ListView>,
}

/// One list and its cards, ordered by position
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListView {
    pub list: List,
    pub cards: Vec<Card>,
}

/// Loads the authoritative view of a board
pub async fn board_view<S: BoardStore + ?Sized>(store: &S, board_id: BoardId) -> Result<BoardView> {
    let board = store.board(board_id).await?;
    let lists = store.lists_in_board(board_id).await?;

    let mut views = Vec::with_capacity(lists.len());
    for list in lists {
        let cards = store.cards_in_list(list.id).await?;
        views.push(ListView { list, cards });
    }

    Ok(BoardView {
        board,
        lists: views,
    })
}

/// Total tracked time for one user on a card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserTimeTotal {
    pub user_id: UserId,
    pub total_ms: i64,
}

/// Tracked-time summary for a card
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardTimeReport {
    pub card_id: CardId,
    /// Sum of all closed intervals, in milliseconds
    pub total_ms: i64,
    pub per_user: Vec<UserTimeTotal>,
    /// Entries still running; their time is not included in the totals
    pub open_entries: usize,
}

/// Aggregates a card's closed time-log entries per user.
///
/// Entries closed defensively (no recorded duration) contribute nothing.
pub async fn time_report<S: BoardStore + ?Sized>(
    store: &S,
    card_id: CardId,
) -> Result<CardTimeReport> {
    let entries = store.time_logs_for_card(card_id).await?;

    let mut totals: BTreeMap<UserId, i64> = BTreeMap::new();
    let mut open_entries = 0;
    for entry in &entries {
        if entry.is_open() {
            open_entries += 1;
            continue;
        }
        if let Some(duration_ms) = entry.duration_ms {
            *totals.entry(entry.user_id).or_insert(0) += duration_ms;
        }
    }

    let per_user: Vec<UserTimeTotal> = totals
        .into_iter()
        .map(|(user_id, total_ms)| UserTimeTotal { user_id, total_ms })
        .collect();
    let total_ms = per_user.iter().map(|user| user.total_ms).sum();

    Ok(CardTimeReport {
        card_id,
        total_ms,
        per_user,
        open_entries,
    })
}

/// One list whose positions are not dense, contiguous, and unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionViolation {
    pub list_id: ListId,
    pub detail: String,
}

/// Audits every list on a board against the position invariant: for a list
/// with N cards the positions must be exactly 0..N-1.
pub async fn verify_board_positions<S: BoardStore + ?Sized>(
    store: &S,
    board_id: BoardId,
) -> Result<Vec<PositionViolation>> {
    let lists = store.lists_in_board(board_id).await?;

    let mut violations = Vec::new();
    for list in lists {
        let cards = store.cards_in_list(list.id).await?;
        for (expected, card) in cards.iter().enumerate() {
            if card.position != expected as u32 {
                violations.push(PositionViolation {
                    list_id: list.id,
                    detail: format!(
                        "expected position {} but card {} is at {}",
                        expected, card.id, card.position
                    ),
                });
                break;
            }
        }
    }

    Ok(violations)
}
