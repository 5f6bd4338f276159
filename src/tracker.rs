//! Local strategy order tracking and reconciliation.
//!
//! [`StrategyOrderTracker`] is the strategy's authoritative record of the
//! orders it believes it has in flight. Statuses move optimistically on
//! submission (`SENT`, `CXL_SENT`, `AMD_SENT`) and are overridden each
//! cycle by [`StrategyOrderTracker::reconcile`], which adopts the
//! exchange-reported state from the [`OpenOrderSet`] mirror. Optimistic
//! statuses are never trusted for fill accounting; only reconciled
//! cumulative-fill deltas reach the measurement counters.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::models::order::{OrderSide, OrderState, OrderType};
use crate::models::request::{AmendOrderRequest, CancelOrderRequest, OrderAck, PlaceOrderRequest};
use crate::orders::OpenOrderSet;
use crate::risk::RiskSnapshot;

/// Lifecycle status of a locally tracked strategy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyOrderStatus {
    /// Place request submitted, no exchange confirmation yet.
    Sent,
    /// Placement acknowledged; exchange order id known.
    Ack,
    Live,
    PartiallyFilled,
    Filled,
    Canceled,
    /// Cancel request submitted (optimistic).
    CxlSent,
    /// Cancel acknowledged; removal confirmed on the next reconcile.
    CxlAck,
    /// Amend request submitted (optimistic).
    AmdSent,
    /// Amend acknowledged; live state confirmed on the next reconcile.
    AmdAck,
}

/// One order the strategy believes it has sent.
#[derive(Debug, Clone)]
pub struct StrategyOrder {
    pub inst_id: String,
    pub side: OrderSide,
    pub ord_type: OrderType,
    /// Requested total size.
    pub size: Decimal,
    pub price: Decimal,
    /// Locally generated, unique per placement.
    pub client_order_id: String,
    /// Exchange order id, empty until acknowledged.
    pub order_id: String,
    pub status: StrategyOrderStatus,
    /// Client-assigned id of the last amend attempt.
    pub amend_req_id: String,
    /// Cumulative filled size as of the last reconcile.
    pub filled_size: Decimal,
    pub avg_fill_price: Option<Decimal>,
}

impl StrategyOrder {
    /// Size still working on the exchange.
    pub fn remaining_size(&self) -> Decimal {
        self.size - self.filled_size
    }
}

/// Running fill counters, all in exact decimal arithmetic.
#[derive(Debug, Clone, Default)]
pub struct StrategyMeasurement {
    /// Buy fills minus sell fills.
    pub net_filled_qty: Decimal,
    pub buy_filled_qty: Decimal,
    pub sell_filled_qty: Decimal,
    /// Gross filled quantity.
    pub trading_volume: Decimal,
    /// Portfolio snapshot at strategy start, for P&L diffing.
    pub inception_risk: Option<RiskSnapshot>,
    pub current_risk: Option<RiskSnapshot>,
}

impl StrategyMeasurement {
    fn record_fill(&mut self, side: OrderSide, delta: Decimal) {
        self.net_filled_qty += delta * side.sign();
        self.trading_volume += delta;
        match side {
            OrderSide::Buy => self.buy_filled_qty += delta,
            OrderSide::Sell => self.sell_filled_qty += delta,
        }
    }

    /// Stores a fresh risk snapshot, pinning the first one as inception.
    pub fn consume_risk_snapshot(&mut self, snapshot: RiskSnapshot) {
        if self.inception_risk.is_none() {
            self.inception_risk = Some(snapshot.clone());
        }
        self.current_risk = Some(snapshot);
    }

    /// Asset-value P&L since inception, when both snapshots exist.
    pub fn pnl_usdt(&self) -> Option<Decimal> {
        let inception = self.inception_risk.as_ref()?;
        let current = self.current_risk.as_ref()?;
        Some(current.asset_usdt_value - inception.asset_usdt_value)
    }
}

/// Authoritative local record of in-flight strategy orders.
#[derive(Debug, Default)]
pub struct StrategyOrderTracker {
    orders: HashMap<String, StrategyOrder>,
    measurement: StrategyMeasurement,
}

impl StrategyOrderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn get(&self, client_order_id: &str) -> Option<&StrategyOrder> {
        self.orders.get(client_order_id)
    }

    pub fn measurement(&self) -> &StrategyMeasurement {
        &self.measurement
    }

    pub fn measurement_mut(&mut self) -> &mut StrategyMeasurement {
        &mut self.measurement
    }

    /// Records a place request as `SENT` before any exchange confirmation.
    pub fn record_placement(&mut self, request: &PlaceOrderRequest) {
        let order = StrategyOrder {
            inst_id: request.inst_id.clone(),
            side: request.side,
            ord_type: request.ord_type,
            size: request.size,
            price: request.price.unwrap_or(Decimal::ZERO),
            client_order_id: request.client_order_id.clone(),
            order_id: String::new(),
            status: StrategyOrderStatus::Sent,
            amend_req_id: String::new(),
            filled_size: Decimal::ZERO,
            avg_fill_price: None,
        };
        self.orders.insert(request.client_order_id.clone(), order);
    }

    /// Applies per-order placement results: success moves the record to
    /// `ACK` and stores the exchange order id; failure drops the record
    /// entirely (no rejected state is kept).
    pub fn confirm_placements(&mut self, acks: &[OrderAck]) {
        for ack in acks {
            if ack.cl_ord_id.is_empty() {
                continue;
            }
            if ack.is_ok() {
                if let Some(order) = self.orders.get_mut(&ack.cl_ord_id) {
                    order.order_id = ack.ord_id.clone();
                    order.status = StrategyOrderStatus::Ack;
                }
            } else {
                if self.orders.remove(&ack.cl_ord_id).is_some() {
                    warn!(
                        cl_ord_id = %ack.cl_ord_id,
                        code = %ack.s_code,
                        msg = %ack.s_msg,
                        "placement rejected, dropping strategy order"
                    );
                }
            }
        }
    }

    /// Optimistically applies an amend at submission time.
    pub fn mark_amend_sent(&mut self, request: &AmendOrderRequest) {
        if let Some(order) = self.orders.get_mut(&request.client_order_id) {
            if let Some(size) = request.new_size {
                order.size = size;
            }
            if let Some(price) = request.new_price {
                order.price = price;
            }
            order.amend_req_id = request.req_id.clone();
            order.status = StrategyOrderStatus::AmdSent;
        }
    }

    pub fn confirm_amends(&mut self, acks: &[OrderAck]) {
        for ack in acks {
            if !ack.is_ok() {
                continue;
            }
            if let Some(order) = self.orders.get_mut(&ack.cl_ord_id) {
                order.status = StrategyOrderStatus::AmdAck;
            }
        }
    }

    /// Optimistically marks a cancel at submission time.
    pub fn mark_cancel_sent(&mut self, client_order_id: &str) {
        if let Some(order) = self.orders.get_mut(client_order_id) {
            order.status = StrategyOrderStatus::CxlSent;
        }
    }

    pub fn confirm_cancels(&mut self, acks: &[OrderAck]) {
        for ack in acks {
            if !ack.is_ok() {
                continue;
            }
            if let Some(order) = self.orders.get_mut(&ack.cl_ord_id) {
                order.status = StrategyOrderStatus::CxlAck;
            }
        }
    }

    /// Reconciles every local record against the exchange order mirror.
    ///
    /// Fill accounting works on cumulative deltas (new cumulative minus
    /// previously recorded cumulative) so an order observed at 0.5 filled
    /// and later at 1.0 contributes exactly 1.0, never 1.5. Terminal
    /// orders are removed locally and pruned from the mirror. Records the
    /// exchange has not reported yet are logged and retried next cycle.
    pub fn reconcile(&mut self, cache: &mut OpenOrderSet) {
        let mut not_found: Vec<String> = Vec::new();
        let mut prune: Vec<String> = Vec::new();
        let client_ids: Vec<String> = self.orders.keys().cloned().collect();

        for cid in client_ids {
            let Some(exchange) = cache.get_by_client_order_id(&cid) else {
                not_found.push(cid);
                continue;
            };
            let state = exchange.state;
            let acc_fill = exchange.acc_fill_sz;
            let fill_price = exchange.effective_fill_price();
            let side = exchange.side;
            let ord_id = exchange.ord_id.clone();

            let Some(order) = self.orders.get_mut(&cid) else {
                continue;
            };
            let delta = acc_fill - order.filled_size;
            if delta > Decimal::ZERO {
                self.measurement.record_fill(side, delta);
            }
            match state {
                OrderState::Live => {
                    order.status = StrategyOrderStatus::Live;
                }
                OrderState::PartiallyFilled => {
                    order.status = StrategyOrderStatus::PartiallyFilled;
                    order.filled_size = acc_fill;
                    order.avg_fill_price = fill_price;
                }
                OrderState::Filled | OrderState::Canceled => {
                    self.orders.remove(&cid);
                    prune.push(ord_id);
                }
            }
        }

        for ord_id in prune {
            cache.remove(&ord_id);
        }
        if !not_found.is_empty() {
            // Order reporting is eventually consistent; keep the records
            // and look again next cycle.
            warn!(count = not_found.len(), cl_ord_ids = ?not_found,
                  "strategy orders not found in order cache");
        }
        debug!(tracked = self.orders.len(), "reconcile pass complete");
    }

    /// Buy-side orders sorted best-first (price descending).
    pub fn bid_orders(&self) -> Vec<StrategyOrder> {
        let mut orders: Vec<StrategyOrder> = self
            .orders
            .values()
            .filter(|o| o.side == OrderSide::Buy)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.price.cmp(&a.price));
        orders
    }

    /// Sell-side orders sorted best-first (price ascending).
    pub fn ask_orders(&self) -> Vec<StrategyOrder> {
        let mut orders: Vec<StrategyOrder> = self
            .orders
            .values()
            .filter(|o| o.side == OrderSide::Sell)
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.price.cmp(&b.price));
        orders
    }

    /// Cancel requests for every tracked order.
    pub fn cancel_all_requests(&self) -> Vec<CancelOrderRequest> {
        self.orders
            .values()
            .map(|o| CancelOrderRequest {
                inst_id: o.inst_id.clone(),
                client_order_id: o.client_order_id.clone(),
            })
            .collect()
    }
}
