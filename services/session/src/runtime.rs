//! Session task: the single owner of a `SessionEngine`
//!
//! Commands arrive on a bounded mpsc queue, each with a oneshot reply; the
//! tick interval lives in the same `select!` loop, so commands and ticks are
//! applied strictly one after the other. Session-wide events go out on a
//! broadcast channel.
//!
//! Dropping every `SessionHandle` closes the queue and ends the task.

use std::sync::Arc;

use persistence::leaderboard::TOP_N;
use persistence::GlobalLeaderboardStore;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use types::errors::SessionError;
use types::fund::TradeKind;
use types::ids::{FundSlot, ParticipantId, Symbol};
use types::leaderboard::GlobalLeaderboardEntry;
use types::player::{ChartDirection, PlayerView};

use crate::config::{COMMAND_QUEUE_CAPACITY, EVENT_CHANNEL_CAPACITY};
use crate::engine::{SessionEngine, SessionSummary, TickOutcome};
use crate::events::SessionEvent;
use crate::game_state::SessionSnapshot;

type Reply<T> = oneshot::Sender<T>;

// ── Commands ────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum SessionCommand {
    Join {
        id: ParticipantId,
        reply: Reply<Result<SessionSnapshot, SessionError>>,
    },
    SeatRoster {
        names: Vec<String>,
        include_ai: bool,
        reply: Reply<Vec<ParticipantId>>,
    },
    Leave {
        id: ParticipantId,
        reply: Reply<bool>,
    },
    Start {
        symbols: Option<Vec<Symbol>>,
        reply: Reply<Result<Vec<Symbol>, SessionError>>,
    },
    Trade {
        id: ParticipantId,
        slot: FundSlot,
        kind: TradeKind,
        reply: Reply<Result<PlayerView, SessionError>>,
    },
    NavigateChart {
        id: ParticipantId,
        slot: FundSlot,
        direction: ChartDirection,
        reply: Reply<Result<u64, SessionError>>,
    },
    Snapshot {
        reply: Reply<SessionSnapshot>,
    },
    Stop {
        reply: Reply<Result<(), SessionError>>,
    },
    AvailableSymbols {
        reply: Reply<Result<Vec<Symbol>, SessionError>>,
    },
}

// ── Handle ──────────────────────────────────────────────────────────

/// Cloneable client of the session task.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Receive every session-wide event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .await
            .map_err(|_| SessionError::SessionClosed)?;
        response.await.map_err(|_| SessionError::SessionClosed)
    }

    pub async fn join(&self, id: ParticipantId) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Join { id, reply }).await?
    }

    pub async fn seat_roster(
        &self,
        names: Vec<String>,
        include_ai: bool,
    ) -> Result<Vec<ParticipantId>, SessionError> {
        self.request(|reply| SessionCommand::SeatRoster {
            names,
            include_ai,
            reply,
        })
        .await
    }

    pub async fn leave(&self, id: ParticipantId) -> Result<bool, SessionError> {
        self.request(|reply| SessionCommand::Leave { id, reply }).await
    }

    /// Start on `symbols`, or on random ones when `None`.
    pub async fn start(&self, symbols: Option<Vec<Symbol>>) -> Result<Vec<Symbol>, SessionError> {
        self.request(|reply| SessionCommand::Start { symbols, reply })
            .await?
    }

    pub async fn trade(
        &self,
        id: ParticipantId,
        slot: FundSlot,
        kind: TradeKind,
    ) -> Result<PlayerView, SessionError> {
        self.request(|reply| SessionCommand::Trade {
            id,
            slot,
            kind,
            reply,
        })
        .await?
    }

    pub async fn navigate_chart(
        &self,
        id: ParticipantId,
        slot: FundSlot,
        direction: ChartDirection,
    ) -> Result<u64, SessionError> {
        self.request(|reply| SessionCommand::NavigateChart {
            id,
            slot,
            direction,
            reply,
        })
        .await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        self.request(|reply| SessionCommand::Snapshot { reply }).await
    }

    /// End the running session before its budget; takes effect before the
    /// next tick.
    pub async fn stop(&self) -> Result<(), SessionError> {
        self.request(|reply| SessionCommand::Stop { reply }).await?
    }

    pub async fn available_symbols(&self) -> Result<Vec<Symbol>, SessionError> {
        self.request(|reply| SessionCommand::AvailableSymbols { reply })
            .await?
    }
}

// ── Task ────────────────────────────────────────────────────────────

/// Spawn the session task.
///
/// Completed sessions are appended to `store` when one is given.
pub fn spawn(
    engine: SessionEngine,
    store: Option<Arc<GlobalLeaderboardStore>>,
) -> (SessionHandle, JoinHandle<()>) {
    let (commands, queue) = mpsc::channel(COMMAND_QUEUE_CAPACITY);
    let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

    let task = SessionTask {
        engine,
        store,
        events: events.clone(),
    };
    let join = tokio::spawn(task.run(queue));

    (SessionHandle { commands, events }, join)
}

struct SessionTask {
    engine: SessionEngine,
    store: Option<Arc<GlobalLeaderboardStore>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionTask {
    async fn run(mut self, mut queue: mpsc::Receiver<SessionCommand>) {
        let mut ticker = time::interval(self.engine.config().tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                command = queue.recv() => match command {
                    Some(command) => self.handle(command, &mut ticker).await,
                    None => break,
                },

                _ = ticker.tick(), if self.engine.is_running() => self.on_tick().await,
            }
        }

        info!("Session task stopped");
    }

    async fn handle(&mut self, command: SessionCommand, ticker: &mut Interval) {
        match command {
            SessionCommand::Join { id, reply } => {
                let _ = reply.send(self.engine.join(id));
            }
            SessionCommand::SeatRoster {
                names,
                include_ai,
                reply,
            } => {
                let _ = reply.send(self.engine.seat_roster(&names, include_ai));
            }
            SessionCommand::Leave { id, reply } => {
                let _ = reply.send(self.engine.leave(&id));
            }
            SessionCommand::Start { symbols, reply } => {
                let result = self.engine.start(symbols);
                if let Ok(symbols) = &result {
                    // First tick lands one period after the start.
                    ticker.reset();
                    self.publish(SessionEvent::Started {
                        symbols: symbols.clone(),
                        snapshot: self.engine.snapshot(),
                    });
                }
                let _ = reply.send(result);
            }
            SessionCommand::Trade {
                id,
                slot,
                kind,
                reply,
            } => {
                let _ = reply.send(self.engine.trade(&id, slot, kind));
            }
            SessionCommand::NavigateChart {
                id,
                slot,
                direction,
                reply,
            } => {
                let _ = reply.send(self.engine.navigate_chart(&id, slot, direction));
            }
            SessionCommand::Snapshot { reply } => {
                let _ = reply.send(self.engine.snapshot());
            }
            SessionCommand::Stop { reply } => match self.engine.stop() {
                Ok(summary) => {
                    let _ = reply.send(Ok(()));
                    let global_top10 = self.stored_top().await;
                    self.publish_ended(summary, global_top10);
                }
                Err(e) => {
                    let _ = reply.send(Err(e));
                }
            },
            SessionCommand::AvailableSymbols { reply } => {
                let _ = reply.send(self.engine.available_symbols());
            }
        }
    }

    async fn on_tick(&mut self) {
        match self.engine.tick() {
            Ok(TickOutcome::Idle) => {}
            Ok(TickOutcome::Continued(snapshot)) => {
                self.publish(SessionEvent::Update { snapshot });
            }
            Ok(TickOutcome::Finished { update, summary }) => {
                self.publish(SessionEvent::Update { snapshot: update });
                let global_top10 = self.persist(&summary).await;
                self.publish_ended(summary, global_top10);
            }
            // Logged and ended by the engine; nothing is published.
            Err(_) => {}
        }
    }

    /// Append a completed session to the global leaderboard.
    ///
    /// Awaited before the task takes its next command or tick.
    async fn persist(&self, summary: &SessionSummary) -> Option<Vec<GlobalLeaderboardEntry>> {
        let store = self.store.clone()?;
        let results = summary.results();

        match tokio::task::spawn_blocking(move || store.append_and_rank(&results)).await {
            Ok(Ok(top)) => Some(top),
            Ok(Err(e)) => {
                warn!(error = %e, "Error saving to global leaderboard");
                None
            }
            Err(e) => {
                warn!(error = %e, "Global leaderboard task failed");
                None
            }
        }
    }

    async fn stored_top(&self) -> Option<Vec<GlobalLeaderboardEntry>> {
        let store = self.store.clone()?;
        match tokio::task::spawn_blocking(move || store.top(TOP_N)).await {
            Ok(top) => Some(top),
            Err(e) => {
                warn!(error = %e, "Global leaderboard task failed");
                None
            }
        }
    }

    fn publish_ended(
        &self,
        summary: SessionSummary,
        global_top10: Option<Vec<GlobalLeaderboardEntry>>,
    ) {
        self.publish(SessionEvent::Ended {
            final_state: summary.final_state,
            leaderboard: summary.leaderboard,
            global_top10,
        });
    }

    fn publish(&self, event: SessionEvent) {
        let label = event.label();
        // No subscribers is not an error; the session runs headless.
        if self.events.send(event).is_err() {
            debug!(event = label, "No subscribers for session event");
        }
    }
}
