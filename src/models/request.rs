//! Outbound order action requests and their acknowledgements.
//!
//! The exchange expects every numeric field as a string, and empty
//! strings where a field does not apply, so the serializers here render
//! decimals through their exact text form.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, Serializer};

use super::order::{OrderSide, OrderType, PosSide, TdMode};

fn ser_decimal<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_string())
}

fn ser_opt_decimal<S: Serializer>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(&v.to_string()),
        None => serializer.serialize_str(""),
    }
}

fn ser_opt_pos_side<S: Serializer>(value: &Option<PosSide>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) => serializer.serialize_str(v.as_str()),
        None => serializer.serialize_str(""),
    }
}

/// A request to place one new order.
#[derive(Debug, Clone, Serialize)]
pub struct PlaceOrderRequest {
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "tdMode")]
    pub td_mode: TdMode,
    pub side: OrderSide,
    #[serde(rename = "ordType")]
    pub ord_type: OrderType,
    #[serde(rename = "sz", serialize_with = "ser_decimal")]
    pub size: Decimal,
    #[serde(rename = "px", serialize_with = "ser_opt_decimal")]
    pub price: Option<Decimal>,
    #[serde(rename = "clOrdId")]
    pub client_order_id: String,
    #[serde(rename = "posSide", serialize_with = "ser_opt_pos_side")]
    pub pos_side: Option<PosSide>,
    /// Margin currency, only for margin trades.
    #[serde(default)]
    pub ccy: String,
    #[serde(rename = "reduceOnly")]
    pub reduce_only: bool,
    #[serde(default)]
    pub tag: String,
}

/// A request to amend one resting order in place.
#[derive(Debug, Clone, Serialize)]
pub struct AmendOrderRequest {
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "clOrdId")]
    pub client_order_id: String,
    /// Client-assigned id for this amend attempt.
    #[serde(rename = "reqId")]
    pub req_id: String,
    #[serde(rename = "newSz", serialize_with = "ser_opt_decimal")]
    pub new_size: Option<Decimal>,
    #[serde(rename = "newPx", serialize_with = "ser_opt_decimal")]
    pub new_price: Option<Decimal>,
    #[serde(rename = "cxlOnFail")]
    pub cancel_on_fail: bool,
}

impl AmendOrderRequest {
    pub fn new(inst_id: &str, client_order_id: &str, req_id: String) -> Self {
        Self {
            inst_id: inst_id.to_string(),
            client_order_id: client_order_id.to_string(),
            req_id,
            new_size: None,
            new_price: None,
            cancel_on_fail: false,
        }
    }

    /// True when the amend changes nothing and need not be sent.
    pub fn is_noop(&self) -> bool {
        self.new_size.is_none() && self.new_price.is_none()
    }
}

/// A request to cancel one resting order.
#[derive(Debug, Clone, Serialize)]
pub struct CancelOrderRequest {
    #[serde(rename = "instId")]
    pub inst_id: String,
    #[serde(rename = "clOrdId")]
    pub client_order_id: String,
}

/// Per-order result inside a batched trade response.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderAck {
    #[serde(rename = "ordId", default)]
    pub ord_id: String,
    #[serde(rename = "clOrdId", default)]
    pub cl_ord_id: String,
    /// `"0"` means the individual order succeeded.
    #[serde(rename = "sCode", default)]
    pub s_code: String,
    #[serde(rename = "sMsg", default)]
    pub s_msg: String,
    #[serde(rename = "reqId", default)]
    pub req_id: String,
}

impl OrderAck {
    pub fn is_ok(&self) -> bool {
        self.s_code == "0"
    }
}
