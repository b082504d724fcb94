//! Session engine: one synchronous step of the game clock plus the
//! command operations, over an owned `GameState` and a feed.
//!
//! The engine never sleeps and never publishes; `runtime` drives it on a
//! timer and fans its results out.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::seq::SliceRandom;
use tracing::{error, info};
use types::errors::SessionError;
use types::feed::TradeAction;
use types::fund::TradeKind;
use types::ids::{FundSlot, ParticipantId, Symbol};
use types::leaderboard::LeaderboardEntry;
use types::player::{ChartDirection, PlayerView};

use crate::config::SessionConfig;
use crate::feed::FeedSource;
use crate::game_state::{GameState, SessionSnapshot};

/// Final state of a session that just ended.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub final_state: SessionSnapshot,
    pub leaderboard: Vec<LeaderboardEntry>,
}

impl SessionSummary {
    /// `(participant, net worth)` rows for the global leaderboard
    pub fn results(&self) -> Vec<(ParticipantId, f64)> {
        self.leaderboard
            .iter()
            .map(|entry| (entry.player_id.clone(), entry.networth))
            .collect()
    }
}

/// Result of one clock step.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Session not running; nothing happened
    Idle,
    /// Tick applied; publish the snapshot
    Continued(SessionSnapshot),
    /// Tick applied and the budget is exhausted; publish the snapshot, then
    /// the summary
    Finished {
        update: SessionSnapshot,
        summary: SessionSummary,
    },
}

pub struct SessionEngine {
    config: SessionConfig,
    state: GameState,
    feed: Arc<dyn FeedSource>,
}

impl SessionEngine {
    pub fn new(config: SessionConfig, feed: Arc<dyn FeedSource>) -> Self {
        let state = GameState::new(config.initial_cash, config.fund_count);
        Self {
            config,
            state,
            feed,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.snapshot()
    }

    // ── Commands ────────────────────────────────────────────────────

    pub fn join(&mut self, id: ParticipantId) -> Result<SessionSnapshot, SessionError> {
        self.state.join(id.clone())?;
        info!(player_id = %id, "Player joined");
        Ok(self.state.snapshot())
    }

    /// Replace all participants with a roster; returns the seated ids.
    pub fn seat_roster(&mut self, names: &[String], include_ai: bool) -> Vec<ParticipantId> {
        let seated = self.state.seat_roster(names, include_ai);
        info!(players = seated.len(), include_ai, "Seated roster");
        seated
    }

    pub fn leave(&mut self, id: &ParticipantId) -> bool {
        let removed = self.state.leave(id);
        if removed {
            info!(player_id = %id, "Player left");
        }
        removed
    }

    /// Start a session on `selection`, or on randomly chosen symbols.
    ///
    /// Every series is loaded before anything changes, so a feed error
    /// leaves the lobby untouched.
    pub fn start(&mut self, selection: Option<Vec<Symbol>>) -> Result<Vec<Symbol>, SessionError> {
        if self.state.is_running() {
            return Err(SessionError::AlreadyRunning);
        }

        let symbols = match selection {
            Some(symbols) if !symbols.is_empty() => symbols,
            _ => self.random_symbols()?,
        };
        for symbol in &symbols {
            self.feed.load(symbol)?;
        }

        self.state.bind_symbols(symbols.clone())?;
        self.state.start()?;

        info!(
            symbols = ?symbols,
            participants = self.state.participant_count(),
            tick_budget = self.config.tick_budget(),
            "Game started"
        );
        Ok(symbols)
    }

    fn random_symbols(&self) -> Result<Vec<Symbol>, SessionError> {
        let available = self.feed.available_symbols()?;
        let wanted = self.state.fund_count();
        if available.len() < wanted {
            return Err(SessionError::SymbolCount {
                expected: wanted,
                actual: available.len(),
            });
        }
        let mut rng = rand::thread_rng();
        Ok(available
            .choose_multiple(&mut rng, wanted)
            .cloned()
            .collect())
    }

    pub fn available_symbols(&self) -> Result<Vec<Symbol>, SessionError> {
        Ok(self.feed.available_symbols()?)
    }

    pub fn trade(
        &mut self,
        id: &ParticipantId,
        slot: FundSlot,
        kind: TradeKind,
    ) -> Result<PlayerView, SessionError> {
        self.state.apply_trade(id, slot, kind)
    }

    pub fn navigate_chart(
        &mut self,
        id: &ParticipantId,
        slot: FundSlot,
        direction: ChartDirection,
    ) -> Result<u64, SessionError> {
        self.state.navigate_chart(id, slot, direction)
    }

    /// End a running session early.
    pub fn stop(&mut self) -> Result<SessionSummary, SessionError> {
        if !self.state.end() {
            return Err(SessionError::NotRunning);
        }
        info!(tick = self.state.current_tick(), "Game stopped");
        Ok(self.summary())
    }

    // ── Clock ───────────────────────────────────────────────────────

    /// Apply one tick.
    ///
    /// A feed failure ends the session before any state changes, so no
    /// partial tick is ever observable.
    pub fn tick(&mut self) -> Result<TickOutcome, SessionError> {
        if !self.state.is_running() {
            return Ok(TickOutcome::Idle);
        }

        let index = self.state.current_tick();
        let symbols = self.state.symbols().to_vec();
        let mut samples = Vec::with_capacity(symbols.len());
        for symbol in &symbols {
            match self.feed.tick(symbol, index) {
                Ok(sample) => samples.push(sample),
                Err(e) => {
                    error!(symbol = %symbol, tick = index, error = %e, "Error in game loop");
                    self.state.end();
                    return Err(e.into());
                }
            }
        }

        let prices: BTreeMap<Symbol, f64> = symbols
            .into_iter()
            .zip(samples.iter().map(|sample| sample.price))
            .collect();
        let reference: f64 = samples.iter().map(|sample| sample.reference_networth).sum();
        self.state.advance(prices, Some(reference));

        for (index, sample) in samples.iter().enumerate() {
            if sample.action == TradeAction::Hold {
                continue;
            }
            if let Some(slot) = FundSlot::new(index) {
                self.state.apply_scripted_action(slot, sample.action);
            }
        }

        let update = self.state.snapshot();
        if self.state.current_tick() >= self.config.tick_budget().saturating_sub(1) {
            self.state.end();
            info!(tick = self.state.current_tick(), "Game ended");
            return Ok(TickOutcome::Finished {
                update,
                summary: self.summary(),
            });
        }
        Ok(TickOutcome::Continued(update))
    }

    fn summary(&self) -> SessionSummary {
        SessionSummary {
            final_state: self.state.snapshot(),
            leaderboard: self.state.leaderboard(),
        }
    }
}
