//! # Fallo Core
//!
//! Core business logic and domain models for Fallo kanban project management.
//!
//! This crate provides the fundamental types and operations for moving cards
//! between lists — dense position renumbering inside one atomic commit,
//! active-work time tracking, review-cycle transitions, and reviewer
//! notification — without any dependency on a specific web framework or
//! storage backend.
//!
//! Authentication, board membership, and delivery channels (Slack, email)
//! are external collaborators: the caller passes an explicit actor identity
//! and wires the [`review::ReviewCycleHandler`] and [`notify::Notifier`]
//! ports.

pub mod api;
pub mod domain;
pub mod error;
pub mod notify;
pub mod query;
pub mod reorder;
pub mod review;
pub mod storage;
pub mod tracking;

// Re-export commonly used types
pub use domain::{
    board::{Approver, Board, BoardSettings},
    card::{Card, CardKind},
    ids::{BoardId, CardId, ListId, TimeLogId, UserId},
    list::{is_in_progress_name, is_review_name, List, ListSnapshot},
    time_log::TimeLogEntry,
};
pub use error::{FalloError, Result};
pub use notify::{Notifier, NullNotifier, ReviewRequestNote};
pub use reorder::{
    CommittedMove, PositionPolicy, ReorderConfig, ReorderRequest, ReorderService,
};
pub use review::{NameBasedReviewCycle, NoopReviewCycle, ReviewCycleHandler};
pub use storage::{memory_storage::MemoryStorage, BoardStore};
pub use tracking::{TimeLogLedger, TrackingPolicy};
