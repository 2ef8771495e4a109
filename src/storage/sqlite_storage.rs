use crate::{
    domain::{Board, BoardId, Card, CardId, List, ListId, TimeLogEntry, TimeLogId, UserId},
    error::{FalloError, Result},
    review::ReviewCycleEvent,
    storage::{BoardStore, ReorderCommit},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Matches the transaction timeout of the reorder flow
const BUSY_TIMEOUT: Duration = Duration::from_secs(15);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS boards (
    id         TEXT PRIMARY KEY,
    name       TEXT NOT NULL,
    settings   TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS lists (
    id         TEXT PRIMARY KEY,
    board_id   TEXT NOT NULL,
    name       TEXT NOT NULL,
    position   INTEGER NOT NULL,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS cards (
    id         TEXT PRIMARY KEY,
    list_id    TEXT NOT NULL,
    kind       TEXT NOT NULL,
    title      TEXT NOT NULL,
    position   INTEGER NOT NULL,
    assignees  TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS time_logs (
    id          TEXT PRIMARY KEY,
    card_id     TEXT NOT NULL,
    user_id     TEXT NOT NULL,
    list_id     TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    ended_at    TEXT,
    duration_ms INTEGER
);
CREATE TABLE IF NOT EXISTS review_events (
    card_id      TEXT NOT NULL,
    from_list_id TEXT NOT NULL,
    to_list_id   TEXT NOT NULL,
    action       TEXT NOT NULL,
    recorded_at  TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_cards_list ON cards (list_id, position);
CREATE INDEX IF NOT EXISTS idx_time_logs_card ON time_logs (card_id, user_id);
CREATE INDEX IF NOT EXISTS idx_review_events_card ON review_events (card_id);
";

/// SQLite-backed board store.
///
/// `commit_reorder` runs inside a real database transaction; any error path
/// drops the transaction unfinished, which rolls it back.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl From<rusqlite::Error> for FalloError {
    fn from(err: rusqlite::Error) -> Self {
        FalloError::Storage(err.to_string())
    }
}

impl SqliteStorage {
    /// Opens (and migrates) a database file
    pub fn open(database_path: impl AsRef<Path>) -> Result<Self> {
        Self::setup(Connection::open(database_path)?)
    }

    /// Opens an in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::setup(Connection::open_in_memory()?)
    }

    fn setup(conn: Connection) -> Result<Self> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|err| FalloError::Storage(err.to_string()))
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|datetime| datetime.with_timezone(&Utc))
        .map_err(|err| FalloError::Storage(format!("bad timestamp '{}': {}", value, err)))
}

type CardRow = (
    String,
    String,
    String,
    String,
    i64,
    String,
    String,
    String,
);

fn card_from_row(row: CardRow) -> Result<Card> {
    let (id, list_id, kind, title, position, assignees, created_at, updated_at) = row;
    Ok(Card {
        id: CardId::from_str(&id)?,
        list_id: ListId::from_str(&list_id)?,
        kind: serde_json::from_str(&kind)?,
        title,
        position: position as u32,
        assignees: serde_json::from_str(&assignees)?,
        created_at: parse_datetime(&created_at)?,
        updated_at: parse_datetime(&updated_at)?,
    })
}

type TimeLogRow = (
    String,
    String,
    String,
    String,
    String,
    Option<String>,
    Option<i64>,
);

fn time_log_from_row(row: TimeLogRow) -> Result<TimeLogEntry> {
    let (id, card_id, user_id, list_id, started_at, ended_at, duration_ms) = row;
    Ok(TimeLogEntry {
        id: TimeLogId::from_str(&id)?,
        card_id: CardId::from_str(&card_id)?,
        user_id: UserId::from_str(&user_id)?,
        list_id: ListId::from_str(&list_id)?,
        started_at: parse_datetime(&started_at)?,
        ended_at: ended_at.as_deref().map(parse_datetime).transpose()?,
        duration_ms,
    })
}

#[async_trait]
impl BoardStore for SqliteStorage {
    async fn board(&self, id: BoardId) -> Result<Board> {
        let conn = self.conn()?;
        let row: Option<(String, String, String)> = conn
            .query_row(
                "SELECT name, settings, created_at FROM boards WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((name, settings, created_at)) = row else {
            return Err(FalloError::BoardNotFound(id.to_string()));
        };
        Ok(Board {
            id,
            name,
            settings: serde_json::from_str(&settings)?,
            created_at: parse_datetime(&created_at)?,
        })
    }

    async fn list(&self, id: ListId) -> Result<List> {
        let conn = self.conn()?;
        let row: Option<(String, String, i64, String)> = conn
            .query_row(
                "SELECT board_id, name, position, created_at FROM lists WHERE id = ?1",
                params![id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let Some((board_id, name, position, created_at)) = row else {
            return Err(FalloError::ListNotFound(id.to_string()));
        };
        Ok(List {
            id,
            board_id: BoardId::from_str(&board_id)?,
            name,
            position: position as u32,
            created_at: parse_datetime(&created_at)?,
        })
    }

    async fn lists_in_board(&self, board_id: BoardId) -> Result<Vec<List>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, position, created_at FROM lists \
             WHERE board_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![board_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut lists = Vec::new();
        for row in rows {
            let (id, name, position, created_at) = row?;
            lists.push(List {
                id: ListId::from_str(&id)?,
                board_id,
                name,
                position: position as u32,
                created_at: parse_datetime(&created_at)?,
            });
        }
        Ok(lists)
    }

    async fn card(&self, id: CardId) -> Result<Card> {
        let conn = self.conn()?;
        let row: Option<CardRow> = conn
            .query_row(
                "SELECT id, list_id, kind, title, position, assignees, created_at, updated_at \
                 FROM cards WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                    ))
                },
            )
            .optional()?;

        let Some(row) = row else {
            return Err(FalloError::CardNotFound(id.to_string()));
        };
        card_from_row(row)
    }

    async fn cards_in_list(&self, list_id: ListId) -> Result<Vec<Card>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, list_id, kind, title, position, assignees, created_at, updated_at \
             FROM cards WHERE list_id = ?1 ORDER BY position ASC",
        )?;
        let rows = stmt.query_map(params![list_id.to_string()], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
            ))
        })?;

        let mut cards = Vec::new();
        for row in rows {
            cards.push(card_from_row(row?)?);
        }
        Ok(cards)
    }

    async fn card_assignees(&self, card_id: CardId) -> Result<Vec<UserId>> {
        let conn = self.conn()?;
        let assignees: Option<String> = conn
            .query_row(
                "SELECT assignees FROM cards WHERE id = ?1",
                params![card_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        match assignees {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    async fn save_board(&self, board: &Board) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO boards (id, name, settings, created_at) \
             VALUES (?1, ?2, ?3, ?4)",
            params![
                board.id.to_string(),
                board.name,
                serde_json::to_string(&board.settings)?,
                board.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn save_list(&self, list: &List) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO lists (id, board_id, name, position, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                list.id.to_string(),
                list.board_id.to_string(),
                list.name,
                i64::from(list.position),
                list.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn save_card(&self, card: &Card) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO cards \
             (id, list_id, kind, title, position, assignees, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                card.id.to_string(),
                card.list_id.to_string(),
                serde_json::to_string(&card.kind)?,
                card.title,
                i64::from(card.position),
                serde_json::to_string(&card.assignees)?,
                card.created_at.to_rfc3339(),
                card.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    async fn commit_reorder(&self, commit: &ReorderCommit) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let current: Option<(String, i64)> = tx
            .query_row(
                "SELECT list_id, position FROM cards WHERE id = ?1",
                params![commit.card_id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((list_id, position)) = current else {
            return Err(FalloError::CardNotFound(commit.card_id.to_string()));
        };
        if list_id != commit.source_list_id.to_string()
            || position != i64::from(commit.expected_position)
        {
            // Dropping the transaction here rolls it back
            return Err(FalloError::CardNotFound(commit.card_id.to_string()));
        }

        let now = Utc::now().to_rfc3339();
        for shift in &commit.shifts {
            tx.execute(
                "UPDATE cards SET position = position + ?1, updated_at = ?2 \
                 WHERE list_id = ?3 AND position BETWEEN ?4 AND ?5 AND id <> ?6",
                params![
                    shift.delta,
                    now,
                    shift.list_id.to_string(),
                    i64::from(shift.start),
                    i64::from(shift.end),
                    commit.card_id.to_string(),
                ],
            )?;
        }

        tx.execute(
            "UPDATE cards SET list_id = ?1, position = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                commit.destination_list_id.to_string(),
                i64::from(commit.new_position),
                now,
                commit.card_id.to_string(),
            ],
        )?;

        if commit.compact_source {
            let remaining: Vec<String> = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM cards WHERE list_id = ?1 ORDER BY position ASC",
                )?;
                let rows =
                    stmt.query_map(params![commit.source_list_id.to_string()], |row| row.get(0))?;
                rows.collect::<rusqlite::Result<_>>()?
            };
            for (index, id) in remaining.iter().enumerate() {
                tx.execute(
                    "UPDATE cards SET position = ?1 WHERE id = ?2",
                    params![index as i64, id],
                )?;
            }
        }

        for event in &commit.review_events {
            tx.execute(
                "INSERT INTO review_events (card_id, from_list_id, to_list_id, action, recorded_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    event.card_id.to_string(),
                    event.from_list_id.to_string(),
                    event.to_list_id.to_string(),
                    serde_json::to_string(&event.action)?,
                    event.recorded_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    async fn open_time_log(&self, entry: &TimeLogEntry) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO time_logs \
             (id, card_id, user_id, list_id, started_at, ended_at, duration_ms) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.id.to_string(),
                entry.card_id.to_string(),
                entry.user_id.to_string(),
                entry.list_id.to_string(),
                entry.started_at.to_rfc3339(),
                entry.ended_at.map(|ended_at| ended_at.to_rfc3339()),
                entry.duration_ms,
            ],
        )?;
        Ok(())
    }

    async fn find_open_time_log(
        &self,
        card_id: CardId,
        user_id: UserId,
    ) -> Result<Option<TimeLogEntry>> {
        let conn = self.conn()?;
        let row: Option<TimeLogRow> = conn
            .query_row(
                "SELECT id, card_id, user_id, list_id, started_at, ended_at, duration_ms \
                 FROM time_logs \
                 WHERE card_id = ?1 AND user_id = ?2 AND ended_at IS NULL \
                 LIMIT 1",
                params![card_id.to_string(), user_id.to_string()],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                    ))
                },
            )
            .optional()?;

        row.map(time_log_from_row).transpose()
    }

    async fn close_time_log(
        &self,
        id: TimeLogId,
        ended_at: DateTime<Utc>,
        duration_ms: Option<i64>,
    ) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE time_logs SET ended_at = ?1, duration_ms = ?2 WHERE id = ?3",
            params![ended_at.to_rfc3339(), duration_ms, id.to_string()],
        )?;
        if updated == 0 {
            return Err(FalloError::Storage(format!(
                "time log entry not found: {}",
                id
            )));
        }
        Ok(())
    }

    async fn time_logs_for_card(&self, card_id: CardId) -> Result<Vec<TimeLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, card_id, user_id, list_id, started_at, ended_at, duration_ms \
             FROM time_logs WHERE card_id = ?1 ORDER BY started_at ASC",
        )?;
        let rows = stmt.query_map(params![card_id.to_string()], |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(time_log_from_row(row?)?);
        }
        Ok(entries)
    }

    async fn review_events_for_card(&self, card_id: CardId) -> Result<Vec<ReviewCycleEvent>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT card_id, from_list_id, to_list_id, action, recorded_at \
             FROM review_events WHERE card_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![card_id.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut events = Vec::new();
        for row in rows {
            let (card, from_list, to_list, action, recorded_at) = row?;
            events.push(ReviewCycleEvent {
                card_id: CardId::from_str(&card)?,
                from_list_id: ListId::from_str(&from_list)?,
                to_list_id: ListId::from_str(&to_list)?,
                action: serde_json::from_str(&action)?,
                recorded_at: parse_datetime(&recorded_at)?,
            });
        }
        Ok(events)
    }
}
