//! Persistence for results that outlive a game session
//!
//! Provides the global leaderboard: an append-on-session-end JSON file that
//! is always sorted by net worth and capped at a fixed capacity.

pub mod leaderboard;

pub use leaderboard::{GlobalLeaderboardStore, LeaderboardError};
