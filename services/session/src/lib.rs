//! Market replay game session
//!
//! A session replays recorded price series at a fixed tick rate. Human
//! participants go all-in or all-out on their funds while a scripted
//! participant follows the recorded actions; when the tick budget runs out
//! the final ranking is appended to the global leaderboard.
//!
//! - `game_state`: authoritative participants, prices and phase
//! - `engine`: synchronous tick step plus command operations
//! - `runtime`: the task that owns the engine and drives its clock
//! - `feed`: replay sources (CSV directory, in-memory)
//! - `events`: outbound messages

pub mod config;
pub mod engine;
pub mod events;
pub mod feed;
pub mod game_state;
pub mod runtime;

pub use config::SessionConfig;
pub use engine::{SessionEngine, SessionSummary, TickOutcome};
pub use events::SessionEvent;
pub use feed::{CsvFeed, FeedSource, InMemoryFeed};
pub use game_state::{GameState, SessionPhase, SessionSnapshot};
pub use runtime::{spawn, SessionCommand, SessionHandle};
