//! Replay feed sources
//!
//! A feed serves recorded `(price, action, reference_networth)` rows per
//! symbol. Reads past the end of a series clamp to its last row, so a
//! session outliving its data holds the final price.
//!
//! `CsvFeed` reads `<symbol>.csv` files from a directory; `InMemoryFeed`
//! serves series built in code.

use dashmap::DashMap;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use types::errors::FeedError;
use types::feed::{FeedSample, TradeAction};
use types::ids::Symbol;

/// Columns every series file must provide.
pub const REQUIRED_COLUMNS: [&str; 3] = ["price", "action", "networth"];

/// Source of replayed market data.
///
/// `tick` must never block on I/O once `load` has succeeded for the symbol;
/// the session calls it while applying a tick.
pub trait FeedSource: Send + Sync {
    /// Make a series available, returning its row count.
    fn load(&self, symbol: &Symbol) -> Result<usize, FeedError>;

    /// Row `index` of a series, clamped to the last row.
    fn tick(&self, symbol: &Symbol, index: u64) -> Result<FeedSample, FeedError>;

    /// Every symbol this source can serve, sorted.
    fn available_symbols(&self) -> Result<Vec<Symbol>, FeedError>;
}

fn clamped(symbol: &Symbol, rows: &[FeedSample], index: u64) -> Result<FeedSample, FeedError> {
    let last = rows.len().checked_sub(1).ok_or_else(|| FeedError::Empty {
        symbol: symbol.clone(),
    })?;
    let index = usize::try_from(index).unwrap_or(usize::MAX).min(last);
    Ok(rows[index])
}

// ── CSV directory feed ──────────────────────────────────────────────

/// Directory of `<symbol>.csv` replay files, cached after first load.
pub struct CsvFeed {
    dir: PathBuf,
    series: DashMap<Symbol, Arc<[FeedSample]>>,
}

impl CsvFeed {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            series: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, symbol: &Symbol) -> Option<PathBuf> {
        let name = symbol.as_str();
        let safe = !name.is_empty()
            && !name.contains(['/', '\\'])
            && name != "."
            && name != "..";
        safe.then(|| self.dir.join(format!("{name}.csv")))
    }

    fn read_series(&self, symbol: &Symbol) -> Result<Arc<[FeedSample]>, FeedError> {
        let path = self
            .path_for(symbol)
            .filter(|path| path.is_file())
            .ok_or_else(|| FeedError::NotFound {
                symbol: symbol.clone(),
            })?;

        let invalid = |reason: String| FeedError::InvalidFormat {
            symbol: symbol.clone(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_path(&path)
            .map_err(|e| FeedError::Io(e.to_string()))?;
        let headers = reader
            .headers()
            .map_err(|e| invalid(format!("unreadable header: {e}")))?
            .clone();

        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| invalid(format!("Missing required column '{name}'")))
        };
        let price_idx = column(REQUIRED_COLUMNS[0])?;
        let action_idx = column(REQUIRED_COLUMNS[1])?;
        let networth_idx = column(REQUIRED_COLUMNS[2])?;

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(|e| invalid(format!("row {}: {e}", line + 1)))?;
            let field = |idx: usize| record.get(idx).unwrap_or("");

            let price: f64 = field(price_idx)
                .parse()
                .map_err(|_| invalid(format!("row {}: price is not a number", line + 1)))?;
            if !price.is_finite() || price <= 0.0 {
                return Err(invalid(format!("row {}: price must be positive", line + 1)));
            }
            let reference_networth: f64 = field(networth_idx)
                .parse()
                .map_err(|_| invalid(format!("row {}: networth is not a number", line + 1)))?;

            rows.push(FeedSample {
                price,
                action: TradeAction::parse(field(action_idx)),
                reference_networth,
            });
        }

        if rows.is_empty() {
            return Err(FeedError::Empty {
                symbol: symbol.clone(),
            });
        }
        Ok(rows.into())
    }
}

impl FeedSource for CsvFeed {
    fn load(&self, symbol: &Symbol) -> Result<usize, FeedError> {
        let rows = self.read_series(symbol)?;
        let len = rows.len();
        self.series.insert(symbol.clone(), rows);
        info!(symbol = %symbol, rows = len, "Loaded replay series");
        Ok(len)
    }

    fn tick(&self, symbol: &Symbol, index: u64) -> Result<FeedSample, FeedError> {
        let cached = self.series.get(symbol).map(|rows| Arc::clone(rows.value()));
        let rows = match cached {
            Some(rows) => rows,
            None => {
                debug!(symbol = %symbol, "Series not cached, loading on demand");
                self.load(symbol)?;
                self.series
                    .get(symbol)
                    .map(|rows| Arc::clone(rows.value()))
                    .ok_or_else(|| FeedError::NotFound {
                        symbol: symbol.clone(),
                    })?
            }
        };
        clamped(symbol, &rows, index)
    }

    fn available_symbols(&self) -> Result<Vec<Symbol>, FeedError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| FeedError::Io(e.to_string()))?;
        let mut symbols: Vec<Symbol> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().map(|ext| ext == "csv").unwrap_or(false) {
                    path.file_stem()
                        .and_then(|stem| stem.to_str())
                        .map(Symbol::new)
                } else {
                    None
                }
            })
            .collect();
        symbols.sort();
        Ok(symbols)
    }
}

// ── In-memory feed ──────────────────────────────────────────────────

/// Feed over series held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeed {
    series: HashMap<Symbol, Vec<FeedSample>>,
}

impl InMemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: impl Into<Symbol>, rows: Vec<FeedSample>) -> Self {
        self.series.insert(symbol.into(), rows);
        self
    }

    /// Series with the given prices and `Hold` actions
    pub fn with_prices(self, symbol: impl Into<Symbol>, prices: &[f64]) -> Self {
        let rows = prices
            .iter()
            .map(|&price| FeedSample {
                price,
                action: TradeAction::Hold,
                reference_networth: 0.0,
            })
            .collect();
        self.with_series(symbol, rows)
    }

    fn rows(&self, symbol: &Symbol) -> Result<&[FeedSample], FeedError> {
        self.series
            .get(symbol)
            .map(Vec::as_slice)
            .ok_or_else(|| FeedError::NotFound {
                symbol: symbol.clone(),
            })
    }
}

impl FeedSource for InMemoryFeed {
    fn load(&self, symbol: &Symbol) -> Result<usize, FeedError> {
        let rows = self.rows(symbol)?;
        if rows.is_empty() {
            return Err(FeedError::Empty {
                symbol: symbol.clone(),
            });
        }
        Ok(rows.len())
    }

    fn tick(&self, symbol: &Symbol, index: u64) -> Result<FeedSample, FeedError> {
        clamped(symbol, self.rows(symbol)?, index)
    }

    fn available_symbols(&self) -> Result<Vec<Symbol>, FeedError> {
        let mut symbols: Vec<Symbol> = self.series.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_csv(dir: &TempDir, name: &str, body: &str) {
        fs::write(dir.path().join(format!("{name}.csv")), body).unwrap();
    }

    #[test]
    fn test_csv_load_and_tick() {
        let tmp = TempDir::new().unwrap();
        write_csv(
            &tmp,
            "aaba.us",
            "price,action,networth\n10.5,Buy,10000\n11.0,Hold,10476\n9.5,Sell,9047\n",
        );
        let feed = CsvFeed::new(tmp.path());
        let symbol = Symbol::new("aaba.us");

        assert_eq!(feed.load(&symbol).unwrap(), 3);
        let first = feed.tick(&symbol, 0).unwrap();
        assert_eq!(first.price, 10.5);
        assert_eq!(first.action, TradeAction::Buy);
        assert_eq!(first.reference_networth, 10_000.0);
        assert_eq!(feed.tick(&symbol, 2).unwrap().action, TradeAction::Sell);
    }

    #[test]
    fn test_csv_tick_clamps_past_end() {
        let tmp = TempDir::new().unwrap();
        write_csv(&tmp, "f.us", "price,action,networth\n1.0,Hold,1\n2.0,Hold,2\n");
        let feed = CsvFeed::new(tmp.path());
        let symbol = Symbol::new("f.us");

        assert_eq!(feed.tick(&symbol, 1).unwrap().price, 2.0);
        assert_eq!(feed.tick(&symbol, 10_000).unwrap().price, 2.0);
        assert_eq!(feed.tick(&symbol, u64::MAX).unwrap().price, 2.0);
    }

    #[test]
    fn test_csv_columns_in_any_order() {
        let tmp = TempDir::new().unwrap();
        write_csv(&tmp, "wen.us", "networth,date,action,price\n500,2017-01-03,sell,4.25\n");
        let feed = CsvFeed::new(tmp.path());

        let sample = feed.tick(&Symbol::new("wen.us"), 0).unwrap();
        assert_eq!(sample.price, 4.25);
        assert_eq!(sample.action, TradeAction::Sell);
    }

    #[test]
    fn test_csv_missing_file() {
        let tmp = TempDir::new().unwrap();
        let feed = CsvFeed::new(tmp.path());

        let err = feed.load(&Symbol::new("nope")).unwrap_err();
        assert!(matches!(err, FeedError::NotFound { .. }));
    }

    #[test]
    fn test_csv_rejects_path_like_symbols() {
        let tmp = TempDir::new().unwrap();
        let feed = CsvFeed::new(tmp.path());

        let err = feed.load(&Symbol::new("../secret")).unwrap_err();
        assert!(matches!(err, FeedError::NotFound { .. }));
    }

    #[test]
    fn test_csv_missing_column() {
        let tmp = TempDir::new().unwrap();
        write_csv(&tmp, "gild.us", "price,action\n1.0,Buy\n");
        let feed = CsvFeed::new(tmp.path());

        let err = feed.load(&Symbol::new("gild.us")).unwrap_err();
        match err {
            FeedError::InvalidFormat { reason, .. } => assert!(reason.contains("networth")),
            other => panic!("Expected InvalidFormat, got {:?}", other),
        }
    }

    #[test]
    fn test_csv_rejects_non_positive_price() {
        let tmp = TempDir::new().unwrap();
        write_csv(&tmp, "pcg.us", "price,action,networth\n0,Hold,1\n");
        let feed = CsvFeed::new(tmp.path());

        let err = feed.load(&Symbol::new("pcg.us")).unwrap_err();
        assert!(matches!(err, FeedError::InvalidFormat { .. }));
    }

    #[test]
    fn test_csv_header_only_is_empty() {
        let tmp = TempDir::new().unwrap();
        write_csv(&tmp, "yum.us", "price,action,networth\n");
        let feed = CsvFeed::new(tmp.path());

        let err = feed.load(&Symbol::new("yum.us")).unwrap_err();
        assert!(matches!(err, FeedError::Empty { .. }));
    }

    #[test]
    fn test_csv_available_symbols_sorted() {
        let tmp = TempDir::new().unwrap();
        write_csv(&tmp, "zion.us", "price,action,networth\n1,Hold,1\n");
        write_csv(&tmp, "afl.us", "price,action,networth\n1,Hold,1\n");
        fs::write(tmp.path().join("notes.txt"), "ignore me").unwrap();
        let feed = CsvFeed::new(tmp.path());

        let symbols = feed.available_symbols().unwrap();
        assert_eq!(symbols, vec![Symbol::new("afl.us"), Symbol::new("zion.us")]);
    }

    #[test]
    fn test_in_memory_feed() {
        let feed = InMemoryFeed::new().with_prices("a", &[1.0, 2.0, 3.0]);
        let symbol = Symbol::new("a");

        assert_eq!(feed.load(&symbol).unwrap(), 3);
        assert_eq!(feed.tick(&symbol, 5).unwrap().price, 3.0);
        assert!(feed.load(&Symbol::new("b")).is_err());
    }

    #[test]
    fn test_in_memory_feed_empty_series() {
        let feed = InMemoryFeed::new().with_prices("a", &[]);
        let symbol = Symbol::new("a");

        assert!(matches!(feed.load(&symbol), Err(FeedError::Empty { .. })));
        assert!(matches!(feed.tick(&symbol, 0), Err(FeedError::Empty { .. })));
    }
}
