//! Instrument id parsing and price/size conformance helpers.

use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{QuoterieError, Result};
use crate::models::instrument::{CtType, InstType, Instrument};
use crate::models::order::{OrderSide, TdMode};

/// Derives the instrument type from the instrument id's segment count.
///
/// Two segments is spot (`BTC-USDT`), three is a perpetual or dated
/// contract (`BTC-USDT-SWAP`, `BTC-USDT-250926`), five is an option
/// (`BTC-USD-250926-50000-C`).
pub fn inst_type_from_inst_id(inst_id: &str) -> Result<InstType> {
    match inst_id.split('-').count() {
        2 => Ok(InstType::Spot),
        3 => {
            if inst_id.ends_with("-SWAP") {
                Ok(InstType::Swap)
            } else {
                Ok(InstType::Futures)
            }
        }
        5 => Ok(InstType::Option),
        _ => Err(QuoterieError::MalformedInstrumentId(inst_id.to_string())),
    }
}

/// Conforms a quote price to the instrument's tick size, rounding
/// toward passivity: buys floor, sells ceil.
pub fn trim_price_to_tick(price: Decimal, tick_sz: Decimal, side: OrderSide) -> Decimal {
    if tick_sz <= Decimal::ZERO {
        return price;
    }
    let ticks = price / tick_sz;
    let trimmed = match side {
        OrderSide::Buy => ticks.floor(),
        OrderSide::Sell => ticks.ceil(),
    };
    (trimmed * tick_sz).normalize()
}

/// Conforms a size to the instrument's lot size by rounding to the
/// nearest lot multiple.
pub fn trim_size_to_lot(size: Decimal, lot_sz: Decimal) -> Decimal {
    if lot_sz <= Decimal::ZERO {
        return size;
    }
    let lots = (size / lot_sz).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    (lots * lot_sz).normalize()
}

/// Picks a trade mode valid for the account level and instrument.
///
/// `account_level` follows the exchange convention: 1 simple (cash), 2
/// single-currency margin, 3 multi-currency margin, 4 portfolio
/// margin. A configured preference is honored where the account level
/// and instrument allow it and coerced to the nearest valid mode
/// otherwise; spot always trades cash under single-currency margin and
/// cross above, margin instruments trade isolated under multi-currency
/// and portfolio margin unless the preference says cross.
pub fn decide_td_mode(
    instrument: &Instrument,
    account_level: u8,
    preference: Option<TdMode>,
) -> Result<TdMode> {
    let inst_type = instrument.inst_type;
    match account_level {
        // cash accounts can only trade spot and long options
        1 => match inst_type {
            InstType::Spot | InstType::Option => Ok(TdMode::Cash),
            _ => Err(QuoterieError::Config(format!(
                "{} instruments cannot trade in a cash account",
                inst_type.as_str()
            ))),
        },
        2 => Ok(match preference {
            Some(TdMode::Cash) if !matches!(inst_type, InstType::Spot | InstType::Margin) => {
                TdMode::Cross
            }
            _ if inst_type == InstType::Spot => TdMode::Cash,
            Some(preferred) => preferred,
            None => TdMode::Cross,
        }),
        3 | 4 => Ok(match preference {
            Some(TdMode::Cash) => TdMode::Cross,
            _ if inst_type == InstType::Margin => TdMode::Isolated,
            _ if inst_type == InstType::Spot => TdMode::Cross,
            Some(preferred) => preferred,
            None => TdMode::Cross,
        }),
        _ => Err(QuoterieError::Config(format!(
            "unsupported account level {account_level}"
        ))),
    }
}

/// Currency a position in this instrument is exposed to.
pub fn exposure_ccy(instrument: &Instrument) -> &str {
    match instrument.inst_type {
        InstType::Spot | InstType::Margin => &instrument.base_ccy,
        InstType::Option => &instrument.settle_ccy,
        InstType::Swap | InstType::Futures => match instrument.ct_type {
            Some(CtType::Inverse) => &instrument.settle_ccy,
            _ => {
                // linear contract sizes are denominated in the leading
                // id segment, e.g. BTC for BTC-USDT-SWAP
                instrument.inst_id.split('-').next().unwrap_or_default()
            }
        },
    }
}

/// Currency a position's mark-to-market value is quoted in.
pub fn value_ccy(instrument: &Instrument) -> &str {
    match instrument.inst_type {
        InstType::Spot | InstType::Margin => &instrument.quote_ccy,
        _ => &instrument.settle_ccy,
    }
}
