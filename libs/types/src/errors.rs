//! Error types for the game session
//!
//! Error taxonomy using thiserror. Every variant degrades to "command
//! rejected" or "session ends"; none is fatal to the host process.

use crate::ids::{FundSlot, ParticipantId, Symbol};
use thiserror::Error;

/// Session command and lifecycle errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Player not found: {0}")]
    UnknownParticipant(ParticipantId),

    #[error("Player already joined: {0}")]
    AlreadyJoined(ParticipantId),

    #[error("Player id is reserved: {0}")]
    ReservedId(ParticipantId),

    #[error("Fund not found: {0}")]
    UnknownFund(FundSlot),

    #[error("Game is not running")]
    NotRunning,

    #[error("Game already running")]
    AlreadyRunning,

    #[error("No symbols bound to the session")]
    SymbolsNotBound,

    #[error("Expected {expected} symbols, got {actual}")]
    SymbolCount { expected: usize, actual: usize },

    #[error("Symbol bound twice: {0}")]
    DuplicateSymbol(Symbol),

    #[error("Action {action} failed for fund {fund}")]
    NothingToTrade { fund: FundSlot, action: &'static str },

    #[error("Feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Session closed")]
    SessionClosed,
}

/// Replay feed errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeedError {
    #[error("Stock data file not found: {symbol}")]
    NotFound { symbol: Symbol },

    #[error("Invalid data for {symbol}: {reason}")]
    InvalidFormat { symbol: Symbol, reason: String },

    #[error("No rows in series {symbol}")]
    Empty { symbol: Symbol },

    #[error("IO error: {0}")]
    Io(String),
}
