//! The strategy engine loop.
//!
//! One cycle: reload parameters, check the data planes are healthy,
//! value the portfolio, reconcile the local order records against the
//! exchange mirror, ask the strategy for target ladders, diff them
//! against the resting orders and submit the batched actions. Cycles
//! run on a fixed cadence; a failed cycle cancels every tracked order
//! and backs off before trying again, since the local picture can no
//! longer be trusted until the next reconciliation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::feed::market::MarketCommand;
use crate::instrument::decide_td_mode;
use crate::models::instrument::Instrument;
use crate::models::order::{OrderSide, OrderType};
use crate::models::request::PlaceOrderRequest;
use crate::params::ParamsLoader;
use crate::reconcile::{LadderDiff, QuoteLevel, QuoteReconciler};
use crate::risk::{RiskSnapshot, exposure_ccys};
use crate::state::{MarketState, OrderCache, PortfolioState, Shared};
use crate::strategy::{QuoteContext, QuoteStrategy};
use crate::tracker::StrategyOrderTracker;
use crate::trade::TradeClient;

/// Time between quote cycles.
const CYCLE_INTERVAL: Duration = Duration::from_millis(500);

/// Back-off after a failed cycle, long enough for cancels to land and
/// the order channel to catch up.
const ERROR_BACKOFF: Duration = Duration::from_secs(20);

/// A book or account older than this is considered stale.
const MAX_DATA_AGE_MS: u64 = 60_000;

/// Account levels 1/2 trade spot in cash mode; see
/// [`decide_td_mode`].
const DEFAULT_ACCOUNT_LEVEL: u8 = 2;

pub struct Engine<S: QuoteStrategy> {
    inst_id: String,
    instrument: Instrument,
    /// Metadata for every instrument positions may reference.
    instruments: HashMap<String, Instrument>,
    market: Shared<MarketState>,
    portfolio: Shared<PortfolioState>,
    orders: Shared<OrderCache>,
    market_cmd: mpsc::UnboundedSender<MarketCommand>,
    trade: Arc<TradeClient>,
    strategy: S,
    tracker: StrategyOrderTracker,
    params: ParamsLoader,
    reconciler: QuoteReconciler,
}

impl<S: QuoteStrategy> Engine<S> {
    #[must_use]
    pub fn new(
        instrument: Instrument,
        instruments: HashMap<String, Instrument>,
        market: Shared<MarketState>,
        portfolio: Shared<PortfolioState>,
        orders: Shared<OrderCache>,
        market_cmd: mpsc::UnboundedSender<MarketCommand>,
        trade: Arc<TradeClient>,
        strategy: S,
        params: ParamsLoader,
    ) -> Self {
        let reconciler = QuoteReconciler::new(instrument.lot_sz);
        Self {
            inst_id: instrument.inst_id.clone(),
            instrument,
            instruments,
            market,
            portfolio,
            orders,
            market_cmd,
            trade,
            strategy,
            tracker: StrategyOrderTracker::new(),
            params,
            reconciler,
        }
    }

    /// Runs quote cycles until the process is stopped.
    pub async fn run(mut self) {
        info!(inst_id = %self.inst_id, "Engine started");
        loop {
            match self.cycle().await {
                Ok(()) => tokio::time::sleep(CYCLE_INTERVAL).await,
                Err(e) => {
                    error!("Cycle failed: {e}");
                    if let Err(e) = self.cancel_all().await {
                        error!("Cancel-all after failed cycle also failed: {e}");
                    }
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
    }

    async fn cycle(&mut self) -> Result<()> {
        self.params.refresh()?;

        if !self.healthy().await {
            return Ok(());
        }

        self.risk_summary().await;

        {
            let mut orders = self.orders.lock().await;
            if let Ok(set) = orders.get_mut() {
                self.tracker.reconcile(set);
            }
        }

        let (bid_diff, ask_diff) = self.propose_diffs().await?;
        self.submit(bid_diff, OrderSide::Buy).await?;
        self.submit(ask_diff, OrderSide::Sell).await?;
        Ok(())
    }

    /// All three data planes must be present and fresh before quoting.
    async fn healthy(&self) -> bool {
        let now = now_ms();

        {
            let market = self.market.lock().await;
            let Ok(book) = market.book(&self.inst_id) else {
                warn!(inst_id = %self.inst_id, "No order book yet, skipping cycle");
                return false;
            };
            if now.saturating_sub(book.timestamp_ms()) > MAX_DATA_AGE_MS {
                warn!(inst_id = %self.inst_id, "Order book stale, skipping cycle");
                return false;
            }
            if !book.verify() {
                warn!(inst_id = %self.inst_id, "Order book checksum mismatch, skipping cycle");
                // same recovery path the periodic sweep uses
                let _ = self
                    .market_cmd
                    .send(MarketCommand::ResubscribeBook(self.inst_id.clone()));
                return false;
            }
        }

        {
            let portfolio = self.portfolio.lock().await;
            let Ok(account) = portfolio.account() else {
                warn!("No account data yet, skipping cycle");
                return false;
            };
            if now.saturating_sub(account.u_time) > MAX_DATA_AGE_MS {
                warn!("Account data stale, skipping cycle");
                return false;
            }
        }

        if !self.orders.lock().await.is_ready() {
            warn!("Order channel not seeded yet, skipping cycle");
            return false;
        }

        true
    }

    /// Values the portfolio and folds the snapshot into the running
    /// measurement.
    async fn risk_summary(&mut self) {
        let (snapshot, exposures) = {
            let portfolio = self.portfolio.lock().await;
            let Ok(account) = portfolio.account() else {
                return;
            };
            let market = self.market.lock().await;
            let snapshot = RiskSnapshot::build(
                now_ms(),
                account,
                portfolio.positions(),
                &self.instruments,
                &market,
            );
            let ccy_by_position = exposure_ccys(portfolio.positions(), &self.instruments);
            let risk_free = &self.params.current().risk_free_ccys;
            let mut exposures: Vec<(String, Decimal)> = Vec::new();
            for ccy in ccy_by_position.values() {
                if risk_free.contains(ccy) || exposures.iter().any(|(c, _)| c == ccy) {
                    continue;
                }
                exposures.push((ccy.clone(), snapshot.exposure_in_ccy(ccy, &ccy_by_position)));
            }
            (snapshot, exposures)
        };
        for (ccy, exposure) in &exposures {
            debug!(ccy = %ccy, exposure = %exposure, "Delta exposure");
        }

        let tracked = self.tracker.len();
        let measurement = self.tracker.measurement_mut();
        measurement.consume_risk_snapshot(snapshot);
        info!(
            tracked,
            net = %measurement.net_filled_qty,
            volume = %measurement.trading_volume,
            pnl_usdt = %measurement.pnl_usdt().unwrap_or_default(),
            "Strategy measurement"
        );
    }

    async fn propose_diffs(&self) -> Result<(LadderDiff, LadderDiff)> {
        let market = self.market.lock().await;
        let book = market.book(&self.inst_id)?;
        let params = self.params.current();
        let proposal = self.strategy.propose(&QuoteContext {
            book,
            instrument: &self.instrument,
            params,
            measurement: self.tracker.measurement(),
        })?;
        drop(market);

        let bid_diff = self
            .reconciler
            .diff(&self.tracker.bid_orders(), &proposal.bids);
        let ask_diff = self
            .reconciler
            .diff(&self.tracker.ask_orders(), &proposal.asks);
        Ok((bid_diff, ask_diff))
    }

    /// Sends one side's actions: cancels first to free margin, then
    /// amends, then placements. Each batch is marked optimistically
    /// before the wire call and confirmed from the acks.
    async fn submit(&mut self, diff: LadderDiff, side: OrderSide) -> Result<()> {
        if diff.is_empty() {
            return Ok(());
        }

        if !diff.cancel.is_empty() {
            for request in &diff.cancel {
                self.tracker.mark_cancel_sent(&request.client_order_id);
            }
            let acks = self.trade.cancel_orders(&diff.cancel).await?;
            self.tracker.confirm_cancels(&acks);
        }

        if !diff.amend.is_empty() {
            for request in &diff.amend {
                self.tracker.mark_amend_sent(request);
            }
            let acks = self.trade.amend_orders(&diff.amend).await?;
            self.tracker.confirm_amends(&acks);
        }

        if !diff.place.is_empty() {
            let requests = self.place_requests(&diff.place, side)?;
            for request in &requests {
                self.tracker.record_placement(request);
            }
            // A transport failure does not mean the batch was rejected;
            // the orders may rest on the exchange. The SENT records stay
            // so the next reconcile pass (or the cancel-all on cycle
            // error) can find them. Only an explicit per-order rejection
            // drops a record, inside confirm_placements.
            let acks = self.trade.place_orders(&requests).await?;
            self.tracker.confirm_placements(&acks);
        }
        Ok(())
    }

    fn place_requests(
        &self,
        levels: &[QuoteLevel],
        side: OrderSide,
    ) -> Result<Vec<PlaceOrderRequest>> {
        let td_mode = decide_td_mode(
            &self.instrument,
            DEFAULT_ACCOUNT_LEVEL,
            self.params.current().td_mode_preference,
        )?;
        let requests = levels
            .iter()
            .map(|level| PlaceOrderRequest {
                inst_id: self.inst_id.clone(),
                td_mode,
                side,
                ord_type: OrderType::Limit,
                size: level.size,
                price: Some(level.price),
                client_order_id: Uuid::new_v4().simple().to_string(),
                pos_side: None,
                ccy: String::new(),
                reduce_only: false,
                tag: String::new(),
            })
            .collect();
        Ok(requests)
    }

    /// Cancels every tracked order; used when a cycle fails.
    async fn cancel_all(&mut self) -> Result<()> {
        let requests = self.tracker.cancel_all_requests();
        if requests.is_empty() {
            return Ok(());
        }
        warn!(count = requests.len(), "Cancelling all tracked orders");
        for request in &requests {
            self.tracker.mark_cancel_sent(&request.client_order_id);
        }
        let acks = self.trade.cancel_orders(&requests).await?;
        self.tracker.confirm_cancels(&acks);
        Ok(())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
