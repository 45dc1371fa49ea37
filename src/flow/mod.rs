//! Conversational draft flow.
//!
//! Per-conversation session state ([`SessionStore`]), the status transition
//! table ([`transition`]) and recipient routing ([`Partners`]). Nothing here
//! talks to the network; the bot handler drives it.

mod routing;
mod session;
mod status;

use thiserror::Error;

pub use routing::Partners;
pub use session::{Draft, DraftState, EMPTY_BRIEF, Fragment, PendingPost, Session, SessionStore, compose_brief};
pub use status::{StatusEffect, transition};

/// An action was requested in a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FlowError {
    #[error("A generated draft is awaiting review")]
    UnderReview,

    #[error("No generated draft is awaiting review")]
    NotReviewing,
}
