//! Replay feed sample types
//!
//! Each row of a recorded series carries the market price, the action the
//! automated participant took at that tick, and the net worth it reported.

use serde::{Deserialize, Serialize};

/// Scripted action of the automated participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
    Hold,
}

impl TradeAction {
    /// Parse a recorded action label. Matching is case-insensitive and any
    /// label other than buy/sell means no trade.
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("buy") {
            TradeAction::Buy
        } else if label.eq_ignore_ascii_case("sell") {
            TradeAction::Sell
        } else {
            TradeAction::Hold
        }
    }
}

/// One row of a replay series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedSample {
    /// Market price, always positive
    pub price: f64,
    pub action: TradeAction,
    /// Net worth the recorded automated participant reported at this row
    pub reference_networth: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trade_action_parse() {
        assert_eq!(TradeAction::parse("Buy"), TradeAction::Buy);
        assert_eq!(TradeAction::parse(" SELL "), TradeAction::Sell);
        assert_eq!(TradeAction::parse("Hold"), TradeAction::Hold);
        assert_eq!(TradeAction::parse(""), TradeAction::Hold);
        assert_eq!(TradeAction::parse("nan"), TradeAction::Hold);
    }
}
