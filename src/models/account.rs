//! Account balance and position channel models.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::instrument::InstType;
use super::order::PosSide;
use super::{FeedArg, de_decimal_or_zero, de_ms_or_zero, de_opt_decimal};

/// Margin mode a position is held under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MgnMode {
    Cross,
    Isolated,
    Cash,
}

/// One currency's balance detail within the account.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceDetail {
    pub ccy: String,
    /// Cash balance.
    #[serde(rename = "cashBal", default, deserialize_with = "de_decimal_or_zero")]
    pub cash_bal: Decimal,
    /// Equity of the currency.
    #[serde(default, deserialize_with = "de_decimal_or_zero")]
    pub eq: Decimal,
    /// Liabilities (margin borrowing).
    #[serde(default, deserialize_with = "de_decimal_or_zero")]
    pub liab: Decimal,
    #[serde(rename = "uTime", default, deserialize_with = "de_ms_or_zero")]
    pub u_time: u64,
}

/// The account-wide balance snapshot pushed on the `account` channel.
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    #[serde(rename = "uTime", default, deserialize_with = "de_ms_or_zero")]
    pub u_time: u64,
    #[serde(rename = "totalEq", default, deserialize_with = "de_decimal_or_zero")]
    pub total_eq: Decimal,
    #[serde(default)]
    pub details: Vec<BalanceDetail>,
}

impl Account {
    pub fn detail(&self, ccy: &str) -> Option<&BalanceDetail> {
        self.details.iter().find(|d| d.ccy == ccy)
    }
}

/// A push message from the `account` channel.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountPush {
    pub arg: FeedArg,
    pub data: Vec<Account>,
}

/// One open position.
#[derive(Debug, Clone, Deserialize)]
pub struct Position {
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "instType")]
    pub inst_type: InstType,
    #[serde(rename = "mgnMode")]
    pub mgn_mode: MgnMode,
    #[serde(rename = "posSide")]
    pub pos_side: PosSide,
    /// Position size in contracts (or base units for margin).
    #[serde(default, deserialize_with = "de_decimal_or_zero")]
    pub pos: Decimal,
    #[serde(rename = "avgPx", default, deserialize_with = "de_opt_decimal")]
    pub avg_px: Option<Decimal>,
    /// Unrealized profit and loss.
    #[serde(default, deserialize_with = "de_decimal_or_zero")]
    pub upl: Decimal,
    /// Option value (options only).
    #[serde(rename = "optVal", default, deserialize_with = "de_decimal_or_zero")]
    pub opt_val: Decimal,
    /// Black-Scholes delta (options only).
    #[serde(rename = "deltaBS", default, deserialize_with = "de_decimal_or_zero")]
    pub delta_bs: Decimal,
    #[serde(rename = "uTime", default, deserialize_with = "de_ms_or_zero")]
    pub u_time: u64,
}

/// A push message from the `positions` channel.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionsPush {
    pub arg: FeedArg,
    pub data: Vec<Position>,
}
