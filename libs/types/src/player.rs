//! Participant record: funds plus per-fund chart navigation state

use crate::fund::{Fund, FundView};
use crate::ids::{FundSlot, ParticipantId, Symbol};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Chart navigation step requested by a client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartDirection {
    Next,
    Prev,
}

/// A participant's ledger for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: ParticipantId,
    /// One fund per session symbol, indexed by `FundSlot`
    pub funds: Vec<Fund>,
    /// Chart cursor per fund slot; UI bookkeeping only
    pub chart_cursors: Vec<u64>,
}

impl Player {
    /// Create a player whose `initial_cash` is split evenly across `symbols`.
    pub fn new(id: ParticipantId, initial_cash: f64, symbols: &[Symbol]) -> Self {
        let mut player = Self {
            id,
            funds: Vec::new(),
            chart_cursors: Vec::new(),
        };
        player.reseed(initial_cash, symbols);
        player
    }

    /// Replace every fund with a fresh all-cash one and zero the cursors.
    pub fn reseed(&mut self, initial_cash: f64, symbols: &[Symbol]) {
        let per_fund = if symbols.is_empty() {
            0.0
        } else {
            initial_cash / symbols.len() as f64
        };
        self.funds = symbols
            .iter()
            .map(|symbol| Fund::new(symbol.clone(), per_fund))
            .collect();
        self.chart_cursors = vec![0; symbols.len()];
    }

    /// Point each fund at the symbol bound to its slot, keeping balances.
    pub fn rebind(&mut self, symbols: &[Symbol]) {
        for (fund, symbol) in self.funds.iter_mut().zip(symbols) {
            fund.symbol = symbol.clone();
        }
    }

    pub fn fund(&self, slot: FundSlot) -> Option<&Fund> {
        self.funds.get(slot.index())
    }

    pub fn fund_mut(&mut self, slot: FundSlot) -> Option<&mut Fund> {
        self.funds.get_mut(slot.index())
    }

    /// Sum of fund values; a fund without a quoted price counts as its cash.
    pub fn net_worth(&self, prices: &BTreeMap<Symbol, f64>) -> f64 {
        self.funds
            .iter()
            .map(|fund| fund.value(price_of(prices, &fund.symbol)))
            .sum()
    }

    /// Move the chart cursor of `slot`. `Prev` stops at zero.
    ///
    /// Returns the new cursor, or `None` for an unknown slot.
    pub fn advance_chart(&mut self, slot: FundSlot, direction: ChartDirection) -> Option<u64> {
        let cursor = self.chart_cursors.get_mut(slot.index())?;
        *cursor = match direction {
            ChartDirection::Next => cursor.saturating_add(1),
            ChartDirection::Prev => cursor.saturating_sub(1),
        };
        Some(*cursor)
    }

    /// Serializable projection at `prices`
    pub fn view(&self, prices: &BTreeMap<Symbol, f64>) -> PlayerView {
        let funds = self
            .funds
            .iter()
            .enumerate()
            .filter_map(|(index, fund)| {
                FundSlot::new(index).map(|slot| fund.view(slot, price_of(prices, &fund.symbol)))
            })
            .collect();

        PlayerView {
            player_id: self.id.clone(),
            funds,
            networth: self.net_worth(prices),
            chart_cursors: self.chart_cursors.clone(),
        }
    }
}

fn price_of(prices: &BTreeMap<Symbol, f64>, symbol: &Symbol) -> f64 {
    prices.get(symbol).copied().unwrap_or(0.0)
}

/// Player state as broadcast to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerView {
    pub player_id: ParticipantId,
    pub funds: Vec<FundView>,
    pub networth: f64,
    pub chart_cursors: Vec<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> Vec<Symbol> {
        vec![Symbol::new("aaba.us"), Symbol::new("cvx.us")]
    }

    fn slot(index: usize) -> FundSlot {
        FundSlot::new(index).unwrap()
    }

    #[test]
    fn test_new_player_splits_cash_evenly() {
        let player = Player::new(ParticipantId::new("Player 1"), 10_000.0, &symbols());

        assert_eq!(player.funds.len(), 2);
        assert_eq!(player.funds[0].cash, 5000.0);
        assert_eq!(player.funds[1].cash, 5000.0);
        assert_eq!(player.chart_cursors, vec![0, 0]);
    }

    #[test]
    fn test_net_worth_sums_funds() {
        let mut player = Player::new(ParticipantId::new("Player 1"), 10_000.0, &symbols());
        let mut prices = BTreeMap::new();
        prices.insert(Symbol::new("aaba.us"), 50.0);
        prices.insert(Symbol::new("cvx.us"), 80.0);

        player.fund_mut(slot(0)).unwrap().allocate_all(50.0);
        prices.insert(Symbol::new("aaba.us"), 60.0);

        assert_eq!(player.net_worth(&prices), 11_000.0);
    }

    #[test]
    fn test_net_worth_without_prices_is_cash() {
        let player = Player::new(ParticipantId::new("Player 1"), 10_000.0, &symbols());
        assert_eq!(player.net_worth(&BTreeMap::new()), 10_000.0);
    }

    #[test]
    fn test_chart_cursor_clamps_at_zero() {
        let mut player = Player::new(ParticipantId::new("Player 1"), 10_000.0, &symbols());

        assert_eq!(player.advance_chart(slot(0), ChartDirection::Prev), Some(0));
        assert_eq!(player.advance_chart(slot(0), ChartDirection::Next), Some(1));
        assert_eq!(player.advance_chart(slot(0), ChartDirection::Next), Some(2));
        assert_eq!(player.advance_chart(slot(0), ChartDirection::Prev), Some(1));
        assert_eq!(player.chart_cursors, vec![1, 0]);
    }

    #[test]
    fn test_chart_cursor_unknown_slot() {
        let mut player = Player::new(ParticipantId::new("Player 1"), 10_000.0, &symbols());
        assert_eq!(player.advance_chart(slot(2), ChartDirection::Next), None);
    }

    #[test]
    fn test_reseed_restores_initial_state() {
        let mut player = Player::new(ParticipantId::new("Player 1"), 10_000.0, &symbols());
        player.fund_mut(slot(1)).unwrap().allocate_all(12.5);
        player.advance_chart(slot(1), ChartDirection::Next);

        player.reseed(10_000.0, &symbols());

        assert_eq!(
            player,
            Player::new(ParticipantId::new("Player 1"), 10_000.0, &symbols())
        );
    }

    #[test]
    fn test_view_is_reproducible() {
        let mut player = Player::new(ParticipantId::new("Player 1"), 10_000.0, &symbols());
        player.fund_mut(slot(0)).unwrap().allocate_all(25.0);
        let mut prices = BTreeMap::new();
        prices.insert(Symbol::new("aaba.us"), 30.0);

        let view = player.view(&prices);
        assert_eq!(view, player.view(&prices));
        assert_eq!(view.funds[0].value, 6000.0);
        assert_eq!(view.funds[1].value, 5000.0);
        assert_eq!(view.networth, 11_000.0);
    }
}
