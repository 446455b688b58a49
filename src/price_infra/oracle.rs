use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::price_infra::{Instrument, PricePoint};
use crate::types::price::Price;
use crate::types::ticker::Ticker;
use crate::types::timestamp::{Clock, SystemClock, Timestamp};

/// Source of quotes. The core asks for a fresh price for every decision and
/// never caches one beyond it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn instrument(&self, ticker: &Ticker) -> Option<Instrument>;

    async fn current_price(&self, ticker: &Ticker) -> Option<Price>;

    /// Latest observation at or before `at`
    async fn price_at(&self, ticker: &Ticker, at: Timestamp) -> Option<Price>;

    /// Observations in `[start, end]`, oldest first
    async fn price_range(&self, ticker: &Ticker, start: Timestamp, end: Timestamp) -> Vec<PricePoint>;

    /// One lookup per distinct ticker; tickers without a quote are absent.
    async fn current_prices(&self, tickers: &[Ticker]) -> HashMap<Ticker, Price> {
        let lookups = tickers.iter().map(|ticker| async move {
            (ticker.clone(), self.current_price(ticker).await)
        });

        futures::future::join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(ticker, price)| price.map(|p| (ticker, p)))
            .collect()
    }
}

/// Oracle fed by whoever owns the price feed; also used as the test double.
pub struct InMemoryPriceOracle {
    instruments: DashMap<Ticker, Instrument>,
    history: DashMap<Ticker, BTreeMap<u64, Price>>,
    clock: Arc<dyn Clock>,
}

impl InMemoryPriceOracle {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        InMemoryPriceOracle {
            instruments: DashMap::new(),
            history: DashMap::new(),
            clock,
        }
    }

    pub fn register(&self, ticker: Ticker, name: impl Into<String>) {
        let instrument = Instrument {
            ticker: ticker.clone(),
            name: name.into(),
        };
        self.instruments.insert(ticker, instrument);
    }

    /// Record a quote stamped with the oracle's clock
    pub fn set_price(&self, ticker: &Ticker, price: Price) {
        let now = self.clock.now();
        self.record_price(ticker, now, price);
    }

    pub fn record_price(&self, ticker: &Ticker, at: Timestamp, price: Price) {
        self.history
            .entry(ticker.clone())
            .or_default()
            .insert(at.as_millis(), price);
    }

    /// Forget every quote for `ticker` while keeping it listed
    pub fn clear_prices(&self, ticker: &Ticker) {
        self.history.remove(ticker);
    }

    pub fn tickers(&self) -> Vec<Ticker> {
        let mut tickers: Vec<Ticker> = self.instruments.iter().map(|i| i.key().clone()).collect();
        tickers.sort();
        tickers
    }
}

impl Default for InMemoryPriceOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PriceOracle for InMemoryPriceOracle {
    async fn instrument(&self, ticker: &Ticker) -> Option<Instrument> {
        self.instruments.get(ticker).map(|i| i.value().clone())
    }

    async fn current_price(&self, ticker: &Ticker) -> Option<Price> {
        self.history
            .get(ticker)
            .and_then(|series| series.values().next_back().copied())
    }

    async fn price_at(&self, ticker: &Ticker, at: Timestamp) -> Option<Price> {
        self.history
            .get(ticker)
            .and_then(|series| series.range(..=at.as_millis()).next_back().map(|(_, p)| *p))
    }

    async fn price_range(&self, ticker: &Ticker, start: Timestamp, end: Timestamp) -> Vec<PricePoint> {
        if start > end {
            return Vec::new();
        }

        self.history
            .get(ticker)
            .map(|series| {
                series.range(start.as_millis()..=end.as_millis())
                    .map(|(millis, price)| PricePoint {
                        timestamp: Timestamp::from_millis(*millis),
                        price: *price,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}
