//! Authoritative session state
//!
//! `GameState` owns every participant, the bound symbols, the tick counter
//! and the current prices. It is mutated only by the session task, so none
//! of its methods synchronize; see `runtime` for the serialization.
//!
//! Phases: `Lobby` (joining, no clock) → `Running` (clock advancing) →
//! `Ended` (budget exhausted or stopped) → back to `Lobby`/`Running` via
//! `reset`/`start`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use types::errors::SessionError;
use types::feed::TradeAction;
use types::fund::TradeKind;
use types::ids::{FundSlot, ParticipantId, Symbol};
use types::leaderboard::{by_networth_desc, LeaderboardEntry, ParticipantKind};
use types::player::{ChartDirection, Player, PlayerView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    Lobby,
    Running,
    Ended,
}

/// Price of one bound symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketView {
    pub fund: FundSlot,
    pub symbol: Symbol,
    pub price: f64,
}

/// Full session state as broadcast every tick.
///
/// The shape is the same for every fund count: one `markets` row per slot
/// and one fund per slot in every player view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub current_tick: u64,
    pub markets: Vec<MarketView>,
    pub players: BTreeMap<ParticipantId, PlayerView>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub game_running: bool,
    pub phase: SessionPhase,
    /// Net worth the recorded automated participant reported at this tick.
    /// Display only; rankings use holdings.
    pub ai_reference_networth: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct GameState {
    initial_cash: f64,
    players: BTreeMap<ParticipantId, Player>,
    symbols: Vec<Symbol>,
    current_tick: u64,
    prices: BTreeMap<Symbol, f64>,
    running: bool,
    phase: SessionPhase,
    ai_reference_networth: Option<f64>,
}

impl GameState {
    /// Empty lobby with `fund_count` unbound symbol slots.
    pub fn new(initial_cash: f64, fund_count: usize) -> Self {
        Self {
            initial_cash,
            players: BTreeMap::new(),
            symbols: vec![Symbol::default(); fund_count.clamp(1, FundSlot::MAX)],
            current_tick: 0,
            prices: BTreeMap::new(),
            running: false,
            phase: SessionPhase::Lobby,
            ai_reference_networth: None,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn initial_cash(&self) -> f64 {
        self.initial_cash
    }

    pub fn fund_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn prices(&self) -> &BTreeMap<Symbol, f64> {
        &self.prices
    }

    /// Current price of the symbol bound to `slot`
    pub fn price(&self, slot: FundSlot) -> Option<f64> {
        self.symbols
            .get(slot.index())
            .and_then(|symbol| self.prices.get(symbol))
            .copied()
    }

    pub fn player(&self, id: &ParticipantId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn participant_count(&self) -> usize {
        self.players.len()
    }

    pub fn participants(&self) -> impl Iterator<Item = &ParticipantId> {
        self.players.keys()
    }

    // ── Participants ────────────────────────────────────────────────

    /// Seat a new human participant with fresh funds.
    ///
    /// The reserved AI id and an id already present are rejected; use
    /// `leave` first to re-seed. The automated participant is only seated
    /// through `seat_roster`.
    pub fn join(&mut self, id: ParticipantId) -> Result<&Player, SessionError> {
        if id.is_ai() {
            return Err(SessionError::ReservedId(id));
        }
        if self.players.contains_key(&id) {
            return Err(SessionError::AlreadyJoined(id));
        }
        let player = Player::new(id.clone(), self.initial_cash, &self.symbols);
        Ok(self.players.entry(id).or_insert(player))
    }

    /// Replace every participant with a local roster: the automated
    /// participant first (when requested), then one human per name.
    ///
    /// Blank names become the first free `Player N` (N counted from the
    /// name's position, never one spelled out elsewhere in the roster);
    /// repeated names and the reserved AI id are skipped. Returns the seated
    /// ids in seating order.
    pub fn seat_roster(&mut self, names: &[String], include_ai: bool) -> Vec<ParticipantId> {
        self.players.clear();
        let mut seated = Vec::with_capacity(names.len() + 1);
        let explicit: Vec<&str> = names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .collect();

        if include_ai {
            let ai = ParticipantId::ai();
            self.players.insert(
                ai.clone(),
                Player::new(ai.clone(), self.initial_cash, &self.symbols),
            );
            seated.push(ai);
        }

        for (i, name) in names.iter().enumerate() {
            let name = name.trim();
            let id = if name.is_empty() {
                let mut n = i + 1;
                loop {
                    let candidate = ParticipantId::new(format!("Player {n}"));
                    let taken = explicit.contains(&candidate.as_str())
                        || self.players.contains_key(&candidate);
                    if !taken {
                        break candidate;
                    }
                    n += 1;
                }
            } else {
                ParticipantId::new(name)
            };
            if id.is_ai() || self.players.contains_key(&id) {
                warn!(player_id = %id, "Skipping duplicate roster name");
                continue;
            }
            self.players.insert(
                id.clone(),
                Player::new(id.clone(), self.initial_cash, &self.symbols),
            );
            seated.push(id);
        }

        seated
    }

    /// Remove a participant. Returns whether one was removed.
    pub fn leave(&mut self, id: &ParticipantId) -> bool {
        self.players.remove(id).is_some()
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Bind the session symbols, one per fund slot.
    pub fn bind_symbols(&mut self, symbols: Vec<Symbol>) -> Result<(), SessionError> {
        if self.running {
            return Err(SessionError::AlreadyRunning);
        }
        if symbols.len() != self.symbols.len() {
            return Err(SessionError::SymbolCount {
                expected: self.symbols.len(),
                actual: symbols.len(),
            });
        }
        for (i, symbol) in symbols.iter().enumerate() {
            if symbol.is_unbound() {
                return Err(SessionError::SymbolsNotBound);
            }
            if symbols[..i].contains(symbol) {
                return Err(SessionError::DuplicateSymbol(symbol.clone()));
            }
        }

        for player in self.players.values_mut() {
            player.rebind(&symbols);
        }
        self.symbols = symbols;
        Ok(())
    }

    /// Reset and start the clock. Symbols must be bound.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.running {
            return Err(SessionError::AlreadyRunning);
        }
        if self.symbols.iter().any(Symbol::is_unbound) {
            return Err(SessionError::SymbolsNotBound);
        }
        self.reset();
        self.running = true;
        self.phase = SessionPhase::Running;
        Ok(())
    }

    /// Apply one tick of prices.
    ///
    /// `ai_reference_networth` is kept for display; the automated
    /// participant is still ranked by its own holdings.
    pub fn advance(&mut self, prices: BTreeMap<Symbol, f64>, ai_reference_networth: Option<f64>) {
        self.prices = prices;
        self.ai_reference_networth = ai_reference_networth;
        self.current_tick += 1;
    }

    /// Stop the clock. Returns `false` when the session was not running.
    pub fn end(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.running = false;
        self.phase = SessionPhase::Ended;
        true
    }

    /// Back to the lobby: tick and prices zeroed, every participant
    /// re-seeded. Participants are kept.
    pub fn reset(&mut self) {
        self.current_tick = 0;
        self.prices.clear();
        self.running = false;
        self.phase = SessionPhase::Lobby;
        self.ai_reference_networth = None;
        for player in self.players.values_mut() {
            player.reseed(self.initial_cash, &self.symbols);
        }
    }

    // ── Commands ────────────────────────────────────────────────────

    /// All-in or all-out on one fund of a participant at the current price.
    pub fn apply_trade(
        &mut self,
        id: &ParticipantId,
        slot: FundSlot,
        kind: TradeKind,
    ) -> Result<PlayerView, SessionError> {
        if !self.players.contains_key(id) {
            return Err(SessionError::UnknownParticipant(id.clone()));
        }
        if slot.index() >= self.symbols.len() {
            return Err(SessionError::UnknownFund(slot));
        }
        if !self.running {
            return Err(SessionError::NotRunning);
        }
        let price = self.price(slot).ok_or(SessionError::NotRunning)?;

        let player = self
            .players
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownParticipant(id.clone()))?;
        let fund = player.fund_mut(slot).ok_or(SessionError::UnknownFund(slot))?;
        let traded = match kind {
            TradeKind::AllIn => fund.allocate_all(price),
            TradeKind::AllOut => fund.liquidate_all(price),
        };
        if !traded {
            return Err(SessionError::NothingToTrade {
                fund: slot,
                action: kind.as_str(),
            });
        }

        debug!(player_id = %id, fund = %slot, action = kind.as_str(), price, "Trade applied");
        Ok(player.view(&self.prices))
    }

    /// Replay a recorded action for the automated participant.
    ///
    /// Returns whether a trade happened; absent participant or price is a
    /// no-op.
    pub fn apply_scripted_action(&mut self, slot: FundSlot, action: TradeAction) -> bool {
        let Some(price) = self.price(slot) else {
            return false;
        };
        let Some(fund) = self
            .players
            .get_mut(&ParticipantId::ai())
            .and_then(|ai| ai.fund_mut(slot))
        else {
            return false;
        };
        match action {
            TradeAction::Buy => fund.allocate_all(price),
            TradeAction::Sell => fund.liquidate_all(price),
            TradeAction::Hold => false,
        }
    }

    /// Move a participant's chart cursor; returns the new cursor.
    pub fn navigate_chart(
        &mut self,
        id: &ParticipantId,
        slot: FundSlot,
        direction: ChartDirection,
    ) -> Result<u64, SessionError> {
        let player = self
            .players
            .get_mut(id)
            .ok_or_else(|| SessionError::UnknownParticipant(id.clone()))?;
        player
            .advance_chart(slot, direction)
            .ok_or(SessionError::UnknownFund(slot))
    }

    // ── Views ───────────────────────────────────────────────────────

    /// Every participant ranked by net worth, highest first; equal net
    /// worth is ordered by participant id.
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .players
            .iter()
            .map(|(id, player)| LeaderboardEntry {
                player_id: id.clone(),
                networth: player.net_worth(&self.prices),
                kind: ParticipantKind::of(id),
            })
            .collect();
        entries.sort_by(|a, b| {
            by_networth_desc(a.networth, b.networth).then_with(|| a.player_id.cmp(&b.player_id))
        });
        entries
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let markets = self
            .symbols
            .iter()
            .enumerate()
            .filter_map(|(index, symbol)| {
                FundSlot::new(index).map(|fund| MarketView {
                    fund,
                    symbol: symbol.clone(),
                    price: self.prices.get(symbol).copied().unwrap_or(0.0),
                })
            })
            .collect();

        SessionSnapshot {
            current_tick: self.current_tick,
            markets,
            players: self
                .players
                .iter()
                .map(|(id, player)| (id.clone(), player.view(&self.prices)))
                .collect(),
            leaderboard: self.leaderboard(),
            game_running: self.running,
            phase: self.phase,
            ai_reference_networth: self.ai_reference_networth,
        }
    }
}
