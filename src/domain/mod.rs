pub mod board;
pub mod card;
pub mod ids;
pub mod list;
pub mod time_log;

pub use board::{Approver, Board, BoardSettings};
pub use card::{Card, CardKind};
pub use ids::{BoardId, CardId, ListId, TimeLogId, UserId};
pub use list::{is_done_name, is_in_progress_name, is_review_name, List, ListSnapshot};
pub use time_log::TimeLogEntry;
