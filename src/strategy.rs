//! Quote generation.
//!
//! [`QuoteStrategy`] is the seam between the engine loop and the logic
//! that decides where to quote; [`SampleMaker`] is the built-in
//! implementation, a symmetric ladder stepped off the touch with
//! inventory-aware level counts so net exposure stays inside the
//! configured bounds.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::book::OrderBook;
use crate::error::Result;
use crate::instrument::{trim_price_to_tick, trim_size_to_lot};
use crate::models::instrument::Instrument;
use crate::models::order::OrderSide;
use crate::params::StrategyParams;
use crate::reconcile::QuoteLevel;
use crate::tracker::StrategyMeasurement;

/// Everything a strategy may consult when proposing quotes.
pub struct QuoteContext<'a> {
    pub book: &'a OrderBook,
    pub instrument: &'a Instrument,
    pub params: &'a StrategyParams,
    pub measurement: &'a StrategyMeasurement,
}

/// Desired ladders for both sides, best-first.
#[derive(Debug, Default, PartialEq)]
pub struct QuoteProposal {
    pub bids: Vec<QuoteLevel>,
    pub asks: Vec<QuoteLevel>,
}

pub trait QuoteStrategy {
    /// Proposes the ladders the engine should converge the resting
    /// orders toward. An empty side means quote nothing there.
    fn propose(&self, ctx: &QuoteContext<'_>) -> Result<QuoteProposal>;
}

/// Symmetric ladder maker.
///
/// Level `i` (0-based) bids at `best_bid * (1 - i * step_pct)` and asks
/// at `best_ask * (1 + i * step_pct)`, trimmed to the tick toward
/// passivity. The number of levels on each side shrinks as net
/// inventory approaches the configured maximum, reaching zero at the
/// bound.
#[derive(Debug, Default)]
pub struct SampleMaker;

impl SampleMaker {
    /// Levels affordable within the remaining inventory headroom.
    fn level_count(headroom: Decimal, size: Decimal, configured: usize) -> usize {
        if size <= Decimal::ZERO || headroom <= Decimal::ZERO {
            return 0;
        }
        let affordable = (headroom / size).floor().to_usize().unwrap_or(usize::MAX);
        affordable.min(configured)
    }

    fn ladder(
        touch: Decimal,
        side: OrderSide,
        count: usize,
        size: Decimal,
        step_pct: Decimal,
        tick_sz: Decimal,
    ) -> Vec<QuoteLevel> {
        let mut levels: Vec<QuoteLevel> = Vec::with_capacity(count);
        for i in 0..count {
            let step = step_pct * Decimal::from(i);
            let raw = match side {
                OrderSide::Buy => touch * (Decimal::ONE - step),
                OrderSide::Sell => touch * (Decimal::ONE + step),
            };
            let price = trim_price_to_tick(raw, tick_sz, side);
            if price <= Decimal::ZERO {
                break;
            }
            // coarse ticks can collapse adjacent steps onto one price
            if levels.last().is_some_and(|prev| prev.price == price) {
                continue;
            }
            levels.push(QuoteLevel::new(price, size));
        }
        levels
    }
}

impl QuoteStrategy for SampleMaker {
    fn propose(&self, ctx: &QuoteContext<'_>) -> Result<QuoteProposal> {
        let best_bid = ctx.book.best_bid_price()?;
        let best_ask = ctx.book.best_ask_price()?;

        let size = trim_size_to_lot(
            ctx.params.size_lot_multiple * ctx.instrument.lot_sz,
            ctx.instrument.lot_sz,
        );
        let net = ctx.measurement.net_filled_qty;
        let bid_count =
            Self::level_count(ctx.params.max_net_buy - net, size, ctx.params.order_count_per_side);
        let ask_count =
            Self::level_count(ctx.params.max_net_sell + net, size, ctx.params.order_count_per_side);

        Ok(QuoteProposal {
            bids: Self::ladder(
                best_bid,
                OrderSide::Buy,
                bid_count,
                size,
                ctx.params.step_pct,
                ctx.instrument.tick_sz,
            ),
            asks: Self::ladder(
                best_ask,
                OrderSide::Sell,
                ask_count,
                size,
                ctx.params.step_pct,
                ctx.instrument.tick_sz,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book::{BookAction, BookData};
    use crate::models::instrument::{InstState, InstType};
    use rust_decimal_macros::dec;

    fn instrument() -> Instrument {
        Instrument {
            inst_type: InstType::Swap,
            inst_id: "BTC-USDT-SWAP".to_string(),
            underlying: String::new(),
            base_ccy: String::new(),
            quote_ccy: String::new(),
            settle_ccy: "USDT".to_string(),
            ct_val: dec!(0.01),
            ct_mult: dec!(1),
            ct_type: None,
            tick_sz: dec!(0.1),
            lot_sz: dec!(1),
            min_sz: dec!(1),
            exp_time: 0,
            state: Some(InstState::Live),
        }
    }

    fn book(best_bid: &str, best_ask: &str) -> OrderBook {
        let mut book = OrderBook::new("BTC-USDT-SWAP");
        let data = BookData {
            asks: vec![[best_ask.to_string(), "5".to_string(), "0".to_string(), "1".to_string()]],
            bids: vec![[best_bid.to_string(), "5".to_string(), "0".to_string(), "1".to_string()]],
            ts: "1597026383085".to_string(),
            checksum: None,
        };
        book.apply(BookAction::Snapshot, &data).unwrap();
        book
    }

    fn params() -> StrategyParams {
        StrategyParams {
            step_pct: dec!(0.001),
            order_count_per_side: 3,
            size_lot_multiple: dec!(2),
            max_net_buy: dec!(100),
            max_net_sell: dec!(100),
            ..StrategyParams::default()
        }
    }

    #[test]
    fn symmetric_ladder_off_the_touch() {
        let book = book("100", "101");
        let instrument = instrument();
        let params = params();
        let measurement = StrategyMeasurement::default();
        let proposal = SampleMaker
            .propose(&QuoteContext {
                book: &book,
                instrument: &instrument,
                params: &params,
                measurement: &measurement,
            })
            .unwrap();

        assert_eq!(
            proposal.bids,
            vec![
                QuoteLevel::new(dec!(100), dec!(2)),
                QuoteLevel::new(dec!(99.9), dec!(2)),
                QuoteLevel::new(dec!(99.8), dec!(2)),
            ]
        );
        // sells ceil to tick: 101*1.001 = 101.101 -> 101.2
        assert_eq!(
            proposal.asks,
            vec![
                QuoteLevel::new(dec!(101), dec!(2)),
                QuoteLevel::new(dec!(101.2), dec!(2)),
                QuoteLevel::new(dec!(101.3), dec!(2)),
            ]
        );
    }

    #[test]
    fn long_inventory_shrinks_bid_side() {
        let book = book("100", "101");
        let instrument = instrument();
        let params = params();
        let mut measurement = StrategyMeasurement::default();
        // headroom of 3 with size 2 affords exactly one more bid level
        measurement.net_filled_qty = dec!(97);
        let proposal = SampleMaker
            .propose(&QuoteContext {
                book: &book,
                instrument: &instrument,
                params: &params,
                measurement: &measurement,
            })
            .unwrap();
        assert_eq!(proposal.bids.len(), 1);
        assert_eq!(proposal.asks.len(), 3);
    }

    #[test]
    fn at_the_bound_quotes_nothing() {
        let book = book("100", "101");
        let instrument = instrument();
        let params = params();
        let mut measurement = StrategyMeasurement::default();
        measurement.net_filled_qty = dec!(100);
        let proposal = SampleMaker
            .propose(&QuoteContext {
                book: &book,
                instrument: &instrument,
                params: &params,
                measurement: &measurement,
            })
            .unwrap();
        assert!(proposal.bids.is_empty());
        assert_eq!(proposal.asks.len(), 3);
    }

    #[test]
    fn empty_book_side_is_an_error() {
        let mut book = OrderBook::new("BTC-USDT-SWAP");
        let data = BookData {
            asks: vec![[
                "101".to_string(),
                "5".to_string(),
                "0".to_string(),
                "1".to_string(),
            ]],
            bids: vec![],
            ts: "1597026383085".to_string(),
            checksum: None,
        };
        book.apply(BookAction::Snapshot, &data).unwrap();
        let instrument = instrument();
        let params = params();
        let measurement = StrategyMeasurement::default();
        let result = SampleMaker.propose(&QuoteContext {
            book: &book,
            instrument: &instrument,
            params: &params,
            measurement: &measurement,
        });
        assert!(result.is_err());
    }
}
