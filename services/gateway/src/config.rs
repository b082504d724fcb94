//! Gateway configuration from `GAME_*` environment variables.
//!
//! Every variable is optional; an unparsable value aborts startup.

use session::SessionConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5001";
pub const DEFAULT_STOCK_DATA_DIR: &str = "data/stocks";
pub const DEFAULT_LEADERBOARD_PATH: &str = "global_leaderboard.json";

/// Fund counts a session can be configured with.
const FUND_COUNT_RANGE: std::ops::RangeInclusive<usize> = 1..=2;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub listen_addr: SocketAddr,
    pub stock_data_dir: PathBuf,
    pub leaderboard_path: PathBuf,
    pub session: SessionConfig,
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = SessionConfig::default();

        let listen_addr: SocketAddr =
            parse_var(&lookup, "GAME_LISTEN_ADDR", DEFAULT_LISTEN_ADDR.parse().ok())?;
        let stock_data_dir = lookup("GAME_STOCK_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STOCK_DATA_DIR));
        let leaderboard_path = lookup("GAME_LEADERBOARD_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LEADERBOARD_PATH));

        let tick_rate_hz: u32 =
            parse_var(&lookup, "GAME_TICK_RATE_HZ", Some(defaults.tick_rate_hz))?;
        require(tick_rate_hz > 0, "GAME_TICK_RATE_HZ", &tick_rate_hz, "must be positive")?;

        let duration_secs: u64 =
            parse_var(&lookup, "GAME_DURATION_SECS", Some(defaults.duration_secs))?;
        require(duration_secs > 0, "GAME_DURATION_SECS", &duration_secs, "must be positive")?;

        let initial_cash: f64 =
            parse_var(&lookup, "GAME_INITIAL_CASH", Some(defaults.initial_cash))?;
        require(
            initial_cash.is_finite() && initial_cash > 0.0,
            "GAME_INITIAL_CASH",
            &initial_cash,
            "must be a positive amount",
        )?;

        let fund_count: usize = parse_var(&lookup, "GAME_FUND_COUNT", Some(defaults.fund_count))?;
        require(
            FUND_COUNT_RANGE.contains(&fund_count),
            "GAME_FUND_COUNT",
            &fund_count,
            "must be 1 or 2",
        )?;

        Ok(Self {
            listen_addr,
            stock_data_dir,
            leaderboard_path,
            session: SessionConfig {
                initial_cash,
                tick_rate_hz,
                duration_secs,
                fund_count,
            },
        })
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Option<T>,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => default.ok_or_else(|| ConfigError::Invalid {
            var,
            value: String::new(),
            reason: "no default".to_string(),
        }),
    }
}

fn require(
    ok: bool,
    var: &'static str,
    value: &dyn std::fmt::Display,
    reason: &str,
) -> Result<(), ConfigError> {
    if ok {
        return Ok(());
    }
    Err(ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    })
}
