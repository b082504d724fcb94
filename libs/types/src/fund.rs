//! Single-asset cash/position ledger
//!
//! A fund only ever moves between "all cash" and "all shares": `allocate_all`
//! and `liquidate_all` are its sole mutators, so partial positions never
//! arise from a valid all-cash starting state.

use crate::ids::{FundSlot, Symbol};
use serde::{Deserialize, Serialize};

/// Cash and shares held against one replayed symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fund {
    pub symbol: Symbol,
    pub cash: f64,
    pub shares: f64,
}

impl Fund {
    /// Create an all-cash fund
    pub fn new(symbol: Symbol, cash: f64) -> Self {
        Self {
            symbol,
            cash,
            shares: 0.0,
        }
    }

    /// Mark-to-market value at `price`
    pub fn value(&self, price: f64) -> f64 {
        self.cash + self.shares * price
    }

    /// Convert the whole cash balance into shares at `price`.
    ///
    /// Returns `false` and leaves the fund untouched when there is no cash.
    /// `price` must be positive; the feed guarantees it.
    pub fn allocate_all(&mut self, price: f64) -> bool {
        if self.cash <= 0.0 {
            return false;
        }
        self.shares += self.cash / price;
        self.cash = 0.0;
        true
    }

    /// Convert every share into cash at `price`.
    ///
    /// Returns `false` and leaves the fund untouched when no shares are held.
    pub fn liquidate_all(&mut self, price: f64) -> bool {
        if self.shares <= 0.0 {
            return false;
        }
        self.cash += self.shares * price;
        self.shares = 0.0;
        true
    }

    /// Serializable projection at `price`
    pub fn view(&self, slot: FundSlot, price: f64) -> FundView {
        FundView {
            fund: slot,
            symbol: self.symbol.clone(),
            cash: self.cash,
            shares: self.shares,
            value: self.value(price),
        }
    }
}

/// Fund state as broadcast to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundView {
    pub fund: FundSlot,
    pub symbol: Symbol,
    pub cash: f64,
    pub shares: f64,
    pub value: f64,
}

/// Direction of an all-in/all-out command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    AllIn,
    AllOut,
}

impl TradeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeKind::AllIn => "all_in",
            TradeKind::AllOut => "all_out",
        }
    }
}


// ── Property-Based Tests ────────────────────────────────────────────
