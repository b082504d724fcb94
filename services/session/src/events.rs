//! Outbound session events
//!
//! Every message a client can receive, tagged by `event`. `started`,
//! `update` and `ended` are broadcast to all connections; the rest answer
//! the connection that asked.

use crate::game_state::SessionSnapshot;
use serde::{Deserialize, Serialize};
use types::fund::TradeKind;
use types::ids::{ConnectionId, FundSlot, ParticipantId, Symbol};
use types::leaderboard::{GlobalLeaderboardEntry, LeaderboardEntry};
use types::player::PlayerView;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    /// First message on a new connection
    ConnectionStatus { client_id: ConnectionId },

    /// Reply to a join: the state the participant joined into
    Joined {
        participants: Vec<ParticipantId>,
        snapshot: SessionSnapshot,
    },

    Started {
        symbols: Vec<Symbol>,
        snapshot: SessionSnapshot,
    },

    /// Once per tick
    Update { snapshot: SessionSnapshot },

    ActionResult {
        success: bool,
        player_id: ParticipantId,
        fund: FundSlot,
        action: TradeKind,
        detail: String,
        player_state: Option<PlayerView>,
    },

    Chart {
        player_id: ParticipantId,
        fund: FundSlot,
        cursor: u64,
    },

    /// Reply to an explicit state query
    GameState { snapshot: SessionSnapshot },

    Ended {
        final_state: SessionSnapshot,
        leaderboard: Vec<LeaderboardEntry>,
        /// `None` when the global leaderboard could not be updated
        global_top10: Option<Vec<GlobalLeaderboardEntry>>,
    },

    AvailableSymbols { symbols: Vec<Symbol> },

    Error { message: String },
}

impl SessionEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Event label for logging
    pub fn label(&self) -> &'static str {
        match self {
            SessionEvent::ConnectionStatus { .. } => "connection_status",
            SessionEvent::Joined { .. } => "joined",
            SessionEvent::Started { .. } => "started",
            SessionEvent::Update { .. } => "update",
            SessionEvent::ActionResult { .. } => "action_result",
            SessionEvent::Chart { .. } => "chart",
            SessionEvent::GameState { .. } => "game_state",
            SessionEvent::Ended { .. } => "ended",
            SessionEvent::AvailableSymbols { .. } => "available_symbols",
            SessionEvent::Error { .. } => "error",
        }
    }
}
