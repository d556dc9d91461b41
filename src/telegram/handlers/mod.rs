//! Telegram bot handler tree configuration
//!
//! The dispatcher schema is built from [`HandlerDeps`] so tests and
//! production share the same handler tree.

mod commands;
mod schema;
mod types;

pub use commands::{cooldown_text, queued_text, status_text};
pub use schema::{schema, PICK_EXPIRED_TEXT, PICK_NOT_YOURS_TEXT};
pub use types::{HandlerDeps, HandlerError, HandlerResult, PendingPick, PickClaim};
