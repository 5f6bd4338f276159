//! Periodic background sweeps.
//!
//! [`BookConsistencyMonitor`] sweeps every cached book on a fixed
//! interval and compares the locally computed CRC against the checksum
//! the exchange attached to the last applied message. On the first
//! divergent book it asks the market feed to resubscribe that
//! instrument and ends the sweep; the remaining books are checked again
//! next pass, after the recovery has had a chance to settle.
//!
//! [`SpotTickerPoller`] keeps the whole spot ticker universe in
//! [`MarketState`] over REST, so risk valuation can price cash balances
//! and settle currencies the WebSocket subscriptions do not cover.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::feed::market::MarketCommand;
use crate::models::instrument::InstType;
use crate::state::{MarketState, Shared};
use crate::trade::TradeClient;

/// Time between verification sweeps.
const SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Time between spot ticker polls.
const TICKER_POLL_INTERVAL: Duration = Duration::from_secs(30);

pub struct BookConsistencyMonitor {
    market: Shared<MarketState>,
    cmd_tx: mpsc::UnboundedSender<MarketCommand>,
    interval: Duration,
}

impl BookConsistencyMonitor {
    #[must_use]
    pub fn new(market: Shared<MarketState>, cmd_tx: mpsc::UnboundedSender<MarketCommand>) -> Self {
        Self {
            market,
            cmd_tx,
            interval: SWEEP_INTERVAL,
        }
    }

    /// Runs sweeps until the market feed goes away.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Book consistency monitor started");
        loop {
            tokio::time::sleep(self.interval).await;
            if let Some(inst_id) = self.sweep().await {
                if self.cmd_tx.send(MarketCommand::ResubscribeBook(inst_id)).is_err() {
                    info!("Market feed gone, monitor shutting down");
                    return;
                }
            }
        }
    }

    /// Verifies every book, returning the first divergent instrument.
    async fn sweep(&self) -> Option<String> {
        let market = self.market.lock().await;
        for book in market.books() {
            if book.verify() {
                debug!(inst_id = book.inst_id(), "Book checksum verified");
            } else {
                warn!(
                    inst_id = book.inst_id(),
                    local = book.checksum(),
                    exchange = book.exchange_checksum(),
                    "Book checksum divergence detected"
                );
                return Some(book.inst_id().to_string());
            }
        }
        None
    }
}

/// Polls spot tickers over REST into the shared market state.
pub struct SpotTickerPoller {
    trade: Arc<TradeClient>,
    market: Shared<MarketState>,
    interval: Duration,
}

impl SpotTickerPoller {
    #[must_use]
    pub fn new(trade: Arc<TradeClient>, market: Shared<MarketState>) -> Self {
        Self {
            trade,
            market,
            interval: TICKER_POLL_INTERVAL,
        }
    }

    /// Polls immediately, then on the fixed interval. Poll failures are
    /// logged and retried; valuation carries the last good prices.
    pub async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Spot ticker poller started");
        loop {
            match self.trade.market_tickers(InstType::Spot).await {
                Ok(tickers) => {
                    let count = tickers.len();
                    let mut market = self.market.lock().await;
                    for ticker in tickers {
                        market.insert_ticker(ticker);
                    }
                    debug!(count, "Spot tickers refreshed");
                }
                Err(e) => warn!(error = %e, "Spot ticker poll failed"),
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}
