//! Portfolio risk valuation.
//!
//! Builds a point-in-time [`RiskSnapshot`] from the account and position
//! caches: every cash balance and position is marked to USDT using live
//! tickers, and delta exposure is expressed in units of each position's
//! exposure currency. The valuation rules vary by instrument type, so
//! both tables live here as pure functions over the cached data.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::instrument::{exposure_ccy, value_ccy};
use crate::models::account::{Account, Position};
use crate::models::instrument::{CtType, InstType, Instrument};
use crate::models::order::PosSide;
use crate::state::MarketState;

/// Identifies one position leg. Long and short legs of the same
/// instrument are separate entries under long/short mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PositionKey {
    pub inst_id: String,
    pub pos_side: PosSide,
}

impl PositionKey {
    fn of(position: &Position) -> Self {
        Self {
            inst_id: position.inst_id.clone(),
            pos_side: position.pos_side,
        }
    }
}

/// Point-in-time portfolio valuation.
#[derive(Debug, Clone, Default)]
pub struct RiskSnapshot {
    pub timestamp_ms: u64,
    /// USDT conversion rate used for each currency encountered.
    pub price_to_usdt: HashMap<String, Decimal>,
    /// USDT value of each cash balance.
    pub cash_usdt_value: HashMap<String, Decimal>,
    /// Per-position mark-to-market value in USDT.
    pub position_usdt_value: HashMap<PositionKey, Decimal>,
    /// Per-position delta exposure in units of the exposure currency.
    pub delta_exposure: HashMap<PositionKey, Decimal>,
    /// Total of cash and position values, in USDT.
    pub asset_usdt_value: Decimal,
}

impl RiskSnapshot {
    /// Values the portfolio against current market prices.
    ///
    /// Currencies with no discoverable USDT price are carried at zero
    /// value rather than failing the whole snapshot.
    pub fn build<'a>(
        timestamp_ms: u64,
        account: &Account,
        positions: impl IntoIterator<Item = &'a Position>,
        instruments: &HashMap<String, Instrument>,
        market: &MarketState,
    ) -> Self {
        let mut snapshot = Self {
            timestamp_ms,
            ..Self::default()
        };

        for detail in &account.details {
            let price = snapshot.usdt_price(&detail.ccy, market);
            let value = detail.cash_bal * price;
            snapshot.cash_usdt_value.insert(detail.ccy.clone(), value);
            snapshot.asset_usdt_value += value;
        }

        for position in positions {
            let key = PositionKey::of(position);
            let Some(instrument) = instruments.get(&position.inst_id) else {
                debug!(inst_id = %position.inst_id, "no instrument metadata, skipping position");
                continue;
            };
            let value = snapshot.position_usdt_value(position, instrument, market);
            snapshot.asset_usdt_value += value;
            snapshot.position_usdt_value.insert(key.clone(), value);
            snapshot
                .delta_exposure
                .insert(key, delta_exposure(position, instrument));
        }

        snapshot
    }

    /// Total delta exposure in a given currency across all positions.
    pub fn exposure_in_ccy(
        &self,
        ccy: &str,
        positions: &HashMap<PositionKey, String>,
    ) -> Decimal {
        self.delta_exposure
            .iter()
            .filter(|(key, _)| positions.get(*key).is_some_and(|c| c == ccy))
            .map(|(_, delta)| delta)
            .sum()
    }

    /// Mark-to-market value of one position, in USDT.
    ///
    /// Swaps and futures carry their value as unrealized P&L in the
    /// settle currency; options carry the full option value. Spot and
    /// margin holdings are already counted in the cash balances.
    fn position_usdt_value(
        &mut self,
        position: &Position,
        instrument: &Instrument,
        market: &MarketState,
    ) -> Decimal {
        match position.inst_type {
            InstType::Swap | InstType::Futures => {
                position.upl * self.usdt_price(value_ccy(instrument), market)
            }
            InstType::Option => {
                position.opt_val * self.usdt_price(value_ccy(instrument), market)
            }
            InstType::Spot | InstType::Margin => Decimal::ZERO,
        }
    }

    /// USDT conversion rate for a currency, memoized per snapshot.
    ///
    /// Tries the direct `{ccy}-USDT` ticker, then its mark price, then
    /// hops through USDC. Unpriceable currencies resolve to zero.
    fn usdt_price(&mut self, ccy: &str, market: &MarketState) -> Decimal {
        if ccy == "USDT" {
            return Decimal::ONE;
        }
        if let Some(price) = self.price_to_usdt.get(ccy) {
            return *price;
        }
        let price = lookup_usdt_price(ccy, market).unwrap_or_else(|| {
            debug!(ccy, "no USDT conversion path, valuing at zero");
            Decimal::ZERO
        });
        self.price_to_usdt.insert(ccy.to_string(), price);
        price
    }
}

fn direct_price(base: &str, quote: &str, market: &MarketState) -> Option<Decimal> {
    let inst_id = format!("{base}-{quote}");
    if let Ok(ticker) = market.ticker(&inst_id) {
        let mid = ticker.mid();
        if !mid.is_zero() {
            return Some(mid);
        }
    }
    if let Ok(mark) = market.mark_price(&inst_id) {
        return mark.mark_px;
    }
    None
}

fn lookup_usdt_price(ccy: &str, market: &MarketState) -> Option<Decimal> {
    if let Some(price) = direct_price(ccy, "USDT", market) {
        return Some(price);
    }
    // hop through USDC for pairs that only quote there
    let via_usdc = direct_price(ccy, "USDC", market)?;
    let usdc_usdt = direct_price("USDC", "USDT", market)?;
    Some(via_usdc * usdc_usdt)
}

/// Delta exposure of one position, in units of its exposure currency.
pub fn delta_exposure(position: &Position, instrument: &Instrument) -> Decimal {
    match position.inst_type {
        InstType::Spot | InstType::Margin => position.pos,
        InstType::Option => position.delta_bs,
        InstType::Swap | InstType::Futures => {
            let contract_size = position.pos * instrument.ct_mult * instrument.ct_val;
            match instrument.ct_type {
                Some(CtType::Inverse) => match position.avg_px {
                    Some(avg_px) if !avg_px.is_zero() => contract_size / avg_px,
                    _ => Decimal::ZERO,
                },
                _ => contract_size,
            }
        }
    }
}

/// Exposure currency for each position, for grouping reports.
pub fn exposure_ccys<'a>(
    positions: impl IntoIterator<Item = &'a Position>,
    instruments: &HashMap<String, Instrument>,
) -> HashMap<PositionKey, String> {
    positions
        .into_iter()
        .filter_map(|position| {
            let instrument = instruments.get(&position.inst_id)?;
            Some((
                PositionKey::of(position),
                exposure_ccy(instrument).to_string(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::account::{BalanceDetail, MgnMode};
    use crate::models::instrument::InstState;
    use crate::models::ticker::Ticker;
    use rust_decimal_macros::dec;

    fn swap_instrument(inst_id: &str, ct_type: CtType) -> Instrument {
        Instrument {
            inst_type: InstType::Swap,
            inst_id: inst_id.to_string(),
            underlying: String::new(),
            base_ccy: String::new(),
            quote_ccy: String::new(),
            settle_ccy: if ct_type == CtType::Inverse { "BTC" } else { "USDT" }.to_string(),
            ct_val: dec!(0.01),
            ct_mult: dec!(1),
            ct_type: Some(ct_type),
            tick_sz: dec!(0.1),
            lot_sz: dec!(1),
            min_sz: dec!(1),
            exp_time: 0,
            state: Some(InstState::Live),
        }
    }

    fn swap_position(inst_id: &str, pos: Decimal, upl: Decimal) -> Position {
        Position {
            inst_id: inst_id.to_string(),
            inst_type: InstType::Swap,
            mgn_mode: MgnMode::Cross,
            pos_side: PosSide::Net,
            pos,
            avg_px: Some(dec!(50000)),
            upl,
            opt_val: Decimal::ZERO,
            delta_bs: Decimal::ZERO,
            u_time: 0,
        }
    }

    fn ticker(inst_id: &str, bid: Decimal, ask: Decimal) -> Ticker {
        Ticker {
            inst_type: InstType::Spot,
            inst_id: inst_id.to_string(),
            last: (bid + ask) / dec!(2),
            ask_px: ask,
            bid_px: bid,
            ask_sz: dec!(1),
            bid_sz: dec!(1),
            vol_24h: Decimal::ZERO,
            ts: 0,
        }
    }

    fn account(details: Vec<BalanceDetail>) -> Account {
        Account {
            u_time: 0,
            total_eq: Decimal::ZERO,
            details,
        }
    }

    fn balance(ccy: &str, cash: Decimal) -> BalanceDetail {
        BalanceDetail {
            ccy: ccy.to_string(),
            cash_bal: cash,
            eq: cash,
            liab: Decimal::ZERO,
            u_time: 0,
        }
    }

    #[test]
    fn cash_balances_marked_to_usdt() {
        let mut market = MarketState::new();
        market.insert_ticker(ticker("BTC-USDT", dec!(49999), dec!(50001)));
        let account = account(vec![balance("USDT", dec!(1000)), balance("BTC", dec!(0.1))]);

        let snapshot =
            RiskSnapshot::build(0, &account, [], &HashMap::new(), &market);
        assert_eq!(snapshot.cash_usdt_value["USDT"], dec!(1000));
        assert_eq!(snapshot.cash_usdt_value["BTC"], dec!(5000.0));
        assert_eq!(snapshot.asset_usdt_value, dec!(6000.0));
    }

    #[test]
    fn unpriceable_ccy_values_at_zero() {
        let market = MarketState::new();
        let account = account(vec![balance("XYZ", dec!(100))]);
        let snapshot =
            RiskSnapshot::build(0, &account, [], &HashMap::new(), &market);
        assert_eq!(snapshot.asset_usdt_value, Decimal::ZERO);
    }

    #[test]
    fn usdc_hop_prices_exotic_quote() {
        let mut market = MarketState::new();
        market.insert_ticker(ticker("ABC-USDC", dec!(2), dec!(2)));
        market.insert_ticker(ticker("USDC-USDT", dec!(1), dec!(1)));
        let account = account(vec![balance("ABC", dec!(10))]);
        let snapshot =
            RiskSnapshot::build(0, &account, [], &HashMap::new(), &market);
        assert_eq!(snapshot.asset_usdt_value, dec!(20));
    }

    #[test]
    fn linear_swap_upl_and_delta() {
        let mut market = MarketState::new();
        market.insert_ticker(ticker("BTC-USDT", dec!(50000), dec!(50000)));
        let account = account(vec![balance("USDT", dec!(1000))]);
        let mut instruments = HashMap::new();
        instruments.insert(
            "BTC-USDT-SWAP".to_string(),
            swap_instrument("BTC-USDT-SWAP", CtType::Linear),
        );
        let position = swap_position("BTC-USDT-SWAP", dec!(10), dec!(25));

        let snapshot = RiskSnapshot::build(0, &account, [&position], &instruments, &market);
        let key = PositionKey {
            inst_id: "BTC-USDT-SWAP".to_string(),
            pos_side: PosSide::Net,
        };
        // upl settles in USDT; delta is pos * ctMult * ctVal in BTC
        assert_eq!(snapshot.position_usdt_value[&key], dec!(25));
        assert_eq!(snapshot.delta_exposure[&key], dec!(0.10));
        assert_eq!(snapshot.asset_usdt_value, dec!(1025));
    }

    #[test]
    fn inverse_swap_delta_divides_by_entry() {
        let instrument = {
            let mut i = swap_instrument("BTC-USD-SWAP", CtType::Inverse);
            i.ct_val = dec!(100);
            i
        };
        let position = swap_position("BTC-USD-SWAP", dec!(5), Decimal::ZERO);
        // 5 * 1 * 100 / 50000 = 0.01 BTC
        assert_eq!(delta_exposure(&position, &instrument), dec!(0.01));
    }

    #[test]
    fn option_delta_uses_black_scholes_field() {
        let instrument = Instrument {
            inst_type: InstType::Option,
            inst_id: "BTC-USD-250926-50000-C".to_string(),
            underlying: "BTC-USD".to_string(),
            base_ccy: String::new(),
            quote_ccy: String::new(),
            settle_ccy: "BTC".to_string(),
            ct_val: dec!(1),
            ct_mult: dec!(1),
            ct_type: None,
            tick_sz: dec!(0.0001),
            lot_sz: dec!(1),
            min_sz: dec!(1),
            exp_time: 0,
            state: Some(InstState::Live),
        };
        let position = Position {
            inst_id: instrument.inst_id.clone(),
            inst_type: InstType::Option,
            mgn_mode: MgnMode::Cross,
            pos_side: PosSide::Long,
            pos: dec!(2),
            avg_px: None,
            upl: Decimal::ZERO,
            opt_val: dec!(0.05),
            delta_bs: dec!(0.6),
            u_time: 0,
        };
        assert_eq!(delta_exposure(&position, &instrument), dec!(0.6));
    }
}
