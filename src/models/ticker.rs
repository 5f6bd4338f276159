//! Ticker and mark price channel models.

use rust_decimal::Decimal;
use serde::Deserialize;

use super::instrument::InstType;
use super::{FeedArg, de_decimal_or_zero, de_ms_or_zero, de_opt_decimal};

/// One instrument's latest trade and top-of-book prices.
#[derive(Debug, Clone, Deserialize)]
pub struct Ticker {
    #[serde(rename = "instType")]
    pub inst_type: InstType,
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(default, deserialize_with = "de_decimal_or_zero")]
    pub last: Decimal,
    #[serde(rename = "askPx", default, deserialize_with = "de_decimal_or_zero")]
    pub ask_px: Decimal,
    #[serde(rename = "bidPx", default, deserialize_with = "de_decimal_or_zero")]
    pub bid_px: Decimal,
    #[serde(rename = "askSz", default, deserialize_with = "de_decimal_or_zero")]
    pub ask_sz: Decimal,
    #[serde(rename = "bidSz", default, deserialize_with = "de_decimal_or_zero")]
    pub bid_sz: Decimal,
    #[serde(rename = "vol24h", default, deserialize_with = "de_decimal_or_zero")]
    pub vol_24h: Decimal,
    #[serde(default, deserialize_with = "de_ms_or_zero")]
    pub ts: u64,
}

impl Ticker {
    /// Mid between best bid and ask.
    pub fn mid(&self) -> Decimal {
        (self.ask_px + self.bid_px) / Decimal::TWO
    }
}

/// A push message from the `tickers` channel.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerPush {
    pub arg: FeedArg,
    pub data: Vec<Ticker>,
}

/// One instrument's mark price.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkPrice {
    #[serde(rename = "instType")]
    pub inst_type: InstType,
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "markPx", default, deserialize_with = "de_opt_decimal")]
    pub mark_px: Option<Decimal>,
    #[serde(default, deserialize_with = "de_ms_or_zero")]
    pub ts: u64,
}

/// A push message from the `mark-price` channel.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkPricePush {
    pub arg: FeedArg,
    pub data: Vec<MarkPrice>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn ticker_mid_from_wire_strings() {
        let push: TickerPush = serde_json::from_str(
            r#"{
                "arg": {"channel": "tickers", "instId": "BTC-USDT"},
                "data": [{
                    "instType": "SPOT",
                    "instId": "BTC-USDT",
                    "last": "9999.99",
                    "askPx": "10000",
                    "bidPx": "9998",
                    "askSz": "11",
                    "bidSz": "5",
                    "vol24h": "2222",
                    "ts": "1597026383085"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(push.data[0].mid(), dec!(9999));
    }
}
