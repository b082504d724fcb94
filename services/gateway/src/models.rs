use serde::{Deserialize, Serialize};
use types::fund::TradeKind;
use types::ids::{FundSlot, ParticipantId, Symbol};
use types::leaderboard::GlobalLeaderboardEntry;
use types::player::ChartDirection;

/// Inbound WebSocket message, tagged by `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join as `player_id` (or as the connection), or seat a local roster
    /// when `config` is given.
    JoinGame {
        #[serde(default)]
        player_id: Option<ParticipantId>,
        #[serde(default)]
        config: Option<RosterConfig>,
    },
    StartGame {
        #[serde(default)]
        symbols: Option<Vec<Symbol>>,
    },
    PlayerAction {
        #[serde(default)]
        player_id: Option<ParticipantId>,
        fund: FundSlot,
        action: TradeKind,
    },
    NavigateChart {
        #[serde(default)]
        player_id: Option<ParticipantId>,
        fund: FundSlot,
        direction: ChartDirection,
    },
    GetGameState,
    StopGame,
    GetAvailableStocks,
}

/// Local multiplayer roster: the automated participant plus `num_players`
/// humans named from `player_names` (missing names become `Player N`).
#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    #[serde(default, alias = "playerNames")]
    pub player_names: Vec<String>,
    #[serde(default, alias = "numPlayers")]
    pub num_players: Option<usize>,
    #[serde(default = "default_include_ai")]
    pub include_ai: bool,
}

fn default_include_ai() -> bool {
    true
}

impl RosterConfig {
    /// Names to seat, padded with blanks up to `num_players`.
    pub fn names(&self) -> Vec<String> {
        let count = self.num_players.unwrap_or(self.player_names.len());
        (0..count)
            .map(|i| self.player_names.get(i).cloned().unwrap_or_default())
            .collect()
    }
}

// ── REST ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SaveResultsRequest {
    pub results: Vec<ResultRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultRow {
    pub player_id: ParticipantId,
    pub networth: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<GlobalLeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StocksResponse {
    pub stocks: Vec<Symbol>,
}
