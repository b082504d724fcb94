//! Types library for the market replay game
//!
//! Core type definitions shared by the session engine, the leaderboard store
//! and the gateway.
//!
//! # Modules
//! - `ids`: Identifiers (ParticipantId, Symbol, ConnectionId, FundSlot)
//! - `fund`: Single-asset cash/share ledger
//! - `player`: Participant record and its broadcast view
//! - `feed`: Replay feed samples and scripted actions
//! - `leaderboard`: Session and persisted leaderboard rows
//! - `errors`: Error taxonomy

pub mod ids;
pub mod fund;
pub mod player;
pub mod feed;
pub mod leaderboard;
pub mod errors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ids::*;
    pub use crate::fund::*;
    pub use crate::player::*;
    pub use crate::feed::*;
    pub use crate::leaderboard::*;
    pub use crate::errors::*;
}
