//! Quote ladder reconciliation.
//!
//! [`QuoteReconciler`] diffs the strategy's desired ladder for one side
//! against the orders already resting on the exchange and emits the
//! minimal set of place, amend and cancel actions. Orders that already
//! sit at a target level are left untouched so queue priority is kept.

use rust_decimal::Decimal;
use tracing::trace;
use uuid::Uuid;

use crate::instrument::trim_size_to_lot;
use crate::models::request::{AmendOrderRequest, CancelOrderRequest};
use crate::tracker::StrategyOrder;

/// One desired price level, best-first in a ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteLevel {
    pub price: Decimal,
    pub size: Decimal,
}

impl QuoteLevel {
    pub fn new(price: Decimal, size: Decimal) -> Self {
        Self { price, size }
    }
}

/// Actions needed to move one side's resting orders onto the target
/// ladder. Amends carry the order's new total size, not the remaining.
#[derive(Debug, Default)]
pub struct LadderDiff {
    pub place: Vec<QuoteLevel>,
    pub amend: Vec<AmendOrderRequest>,
    pub cancel: Vec<CancelOrderRequest>,
}

impl LadderDiff {
    pub fn is_empty(&self) -> bool {
        self.place.is_empty() && self.amend.is_empty() && self.cancel.is_empty()
    }
}

#[derive(Debug)]
pub struct QuoteReconciler {
    /// Lot size used to normalize remaining sizes before comparison.
    lot_sz: Decimal,
}

impl QuoteReconciler {
    pub fn new(lot_sz: Decimal) -> Self {
        Self { lot_sz }
    }

    /// Diffs one side of the book.
    ///
    /// Both inputs must be sorted best-first. Matching runs in two
    /// passes: first every target level that an existing order already
    /// satisfies exactly (same price, same lot-normalized remaining
    /// size) is struck from both lists, first match wins; then the
    /// leftovers are paired positionally, pairs become amends, surplus
    /// targets become placements, surplus orders become cancels.
    pub fn diff(&self, resting: &[StrategyOrder], target: &[QuoteLevel]) -> LadderDiff {
        let mut unmatched_orders: Vec<&StrategyOrder> = resting.iter().collect();
        let mut unmatched_targets: Vec<&QuoteLevel> = Vec::new();

        for level in target {
            let found = unmatched_orders.iter().position(|order| {
                order.price == level.price
                    && trim_size_to_lot(order.remaining_size(), self.lot_sz) == level.size
            });
            match found {
                Some(idx) => {
                    unmatched_orders.remove(idx);
                }
                None => unmatched_targets.push(level),
            }
        }

        let mut diff = LadderDiff::default();
        let mut orders = unmatched_orders.into_iter();
        for level in unmatched_targets {
            match orders.next() {
                Some(order) => {
                    let mut amend = AmendOrderRequest::new(
                        &order.inst_id,
                        &order.client_order_id,
                        Uuid::new_v4().simple().to_string(),
                    );
                    if order.price != level.price {
                        amend.new_price = Some(level.price);
                    }
                    // amend sizes are totals, so carry the filled part
                    let new_total = order.filled_size + level.size;
                    if new_total != order.size {
                        amend.new_size = Some(new_total);
                    }
                    if !amend.is_noop() {
                        diff.amend.push(amend);
                    }
                }
                None => diff.place.push(level.clone()),
            }
        }
        for order in orders {
            diff.cancel.push(CancelOrderRequest {
                inst_id: order.inst_id.clone(),
                client_order_id: order.client_order_id.clone(),
            });
        }

        trace!(
            place = diff.place.len(),
            amend = diff.amend.len(),
            cancel = diff.cancel.len(),
            "ladder diff"
        );
        diff
    }
}
