//! Orders channel models.
//!
//! Streams the authenticated account's order lifecycle events. One
//! [`OpenOrder`] is the exchange's full reported state for one order; the
//! local strategy layer only ever sees these as read snapshots.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::instrument::InstType;
use super::{FeedArg, de_decimal_or_zero, de_ms_or_zero, de_opt_decimal};

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderSide::Buy => "buy",
            OrderSide::Sell => "sell",
        }
    }

    /// +1 for buys, -1 for sells; used to sign fill deltas.
    pub fn sign(&self) -> Decimal {
        match self {
            OrderSide::Buy => Decimal::ONE,
            OrderSide::Sell => -Decimal::ONE,
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    PostOnly,
    Fok,
    Ioc,
    OptimalLimitIoc,
}

/// Exchange-reported order lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Live,
    PartiallyFilled,
    Filled,
    Canceled,
}

/// Trade mode attached to an order: non-margin `cash`, or margin
/// `cross`/`isolated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TdMode {
    Cash,
    Isolated,
    Cross,
}

/// Position side for derivatives accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PosSide {
    Long,
    Short,
    Net,
}

impl PosSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            PosSide::Long => "long",
            PosSide::Short => "short",
            PosSide::Net => "net",
        }
    }
}

/// One exchange order's full reported state.
#[derive(Debug, Clone, Deserialize)]
pub struct OpenOrder {
    #[serde(rename = "ordId")]
    pub ord_id: String,
    /// Client-assigned id; empty for orders placed outside this client.
    #[serde(rename = "clOrdId", default)]
    pub cl_ord_id: String,
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "instType")]
    pub inst_type: InstType,
    pub side: OrderSide,
    #[serde(rename = "ordType")]
    pub ord_type: OrderType,
    pub state: OrderState,
    /// Limit price; absent for market orders.
    #[serde(default, deserialize_with = "de_opt_decimal")]
    pub px: Option<Decimal>,
    /// Requested size.
    #[serde(deserialize_with = "de_decimal_or_zero")]
    pub sz: Decimal,
    /// Accumulated filled size.
    #[serde(rename = "accFillSz", default, deserialize_with = "de_decimal_or_zero")]
    pub acc_fill_sz: Decimal,
    /// Last fill price.
    #[serde(rename = "fillPx", default, deserialize_with = "de_opt_decimal")]
    pub fill_px: Option<Decimal>,
    /// Average fill price over the order's lifetime.
    #[serde(rename = "avgPx", default, deserialize_with = "de_opt_decimal")]
    pub avg_px: Option<Decimal>,
    #[serde(rename = "tdMode", default)]
    pub td_mode: Option<TdMode>,
    #[serde(rename = "posSide", default)]
    pub pos_side: Option<PosSide>,
    #[serde(rename = "cTime", default, deserialize_with = "de_ms_or_zero")]
    pub c_time: u64,
    #[serde(rename = "uTime", default, deserialize_with = "de_ms_or_zero")]
    pub u_time: u64,
}

impl OpenOrder {
    /// Best available fill price: lifetime average, falling back to the
    /// last fill.
    pub fn effective_fill_price(&self) -> Option<Decimal> {
        self.avg_px.or(self.fill_px)
    }
}

/// A push message from the `orders` channel.
#[derive(Debug, Clone, Deserialize)]
pub struct OrdersPush {
    pub arg: FeedArg,
    pub data: Vec<OpenOrder>,
}
