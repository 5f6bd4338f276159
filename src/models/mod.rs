//! Shared models for OKX WebSocket V5 messages.
//!
//! Contains channel definitions, subscription request frames, event
//! acknowledgements, and the serde helpers needed for OKX's all-strings
//! wire format (decimals and timestamps arrive as JSON strings, with the
//! empty string standing in for "absent").

pub mod account;
pub mod book;
pub mod instrument;
pub mod order;
pub mod request;
pub mod ticker;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Available OKX WebSocket V5 channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    /// Full depth order book (wire name: `"books"`).
    Books,
    /// Top-5 depth order book (wire name: `"books5"`).
    Books5,
    Tickers,
    MarkPrice,
    /// Private order updates (wire name: `"orders"`).
    Orders,
    /// Private balance updates (wire name: `"account"`).
    Account,
    Positions,
}

impl Channel {
    /// Returns the wire-format channel name expected by the OKX API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Books => "books",
            Channel::Books5 => "books5",
            Channel::Tickers => "tickers",
            Channel::MarkPrice => "mark-price",
            Channel::Orders => "orders",
            Channel::Account => "account",
            Channel::Positions => "positions",
        }
    }
}

/// The `arg` object identifying a channel subscription.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedArg {
    pub channel: String,
    #[serde(rename = "instId", skip_serializing_if = "Option::is_none")]
    pub inst_id: Option<String>,
    #[serde(rename = "instType", skip_serializing_if = "Option::is_none")]
    pub inst_type: Option<String>,
}

impl FeedArg {
    /// Subscription argument for an instrument-scoped channel.
    pub fn instrument(channel: Channel, inst_id: &str) -> Self {
        Self {
            channel: channel.as_str().to_string(),
            inst_id: Some(inst_id.to_string()),
            inst_type: None,
        }
    }

    /// Subscription argument for an instrument-type-scoped channel
    /// (e.g. the orders channel with `instType: "ANY"`).
    pub fn inst_type(channel: Channel, inst_type: &str) -> Self {
        Self {
            channel: channel.as_str().to_string(),
            inst_id: None,
            inst_type: Some(inst_type.to_string()),
        }
    }

    /// Subscription argument for an account-wide channel.
    pub fn bare(channel: Channel) -> Self {
        Self {
            channel: channel.as_str().to_string(),
            inst_id: None,
            inst_type: None,
        }
    }
}

/// A `subscribe` or `unsubscribe` request frame.
#[derive(Debug, Serialize)]
pub struct OpRequest {
    pub op: String,
    pub args: Vec<FeedArg>,
}

impl OpRequest {
    pub fn subscribe(args: Vec<FeedArg>) -> Self {
        Self {
            op: "subscribe".to_string(),
            args,
        }
    }

    pub fn unsubscribe(args: Vec<FeedArg>) -> Self {
        Self {
            op: "unsubscribe".to_string(),
            args,
        }
    }
}

/// One credential entry in a `login` frame.
#[derive(Debug, Serialize)]
pub struct LoginArg {
    #[serde(rename = "apiKey")]
    pub api_key: String,
    pub passphrase: String,
    pub timestamp: String,
    pub sign: String,
}

/// A `login` request frame for the private endpoint.
#[derive(Debug, Serialize)]
pub struct LoginRequest {
    pub op: String,
    pub args: Vec<LoginArg>,
}

impl LoginRequest {
    pub fn new(arg: LoginArg) -> Self {
        Self {
            op: "login".to_string(),
            args: vec![arg],
        }
    }
}

/// Event acknowledgement pushed after subscribe/unsubscribe/login, or an
/// asynchronous error report.
#[derive(Debug, Deserialize)]
pub struct EventMessage {
    pub event: String,
    #[serde(default)]
    pub arg: Option<FeedArg>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub msg: Option<String>,
}

impl EventMessage {
    /// True for asynchronous error reports and failed acknowledgements.
    pub fn is_error(&self) -> bool {
        self.event == "error" || self.code.as_deref().is_some_and(|c| c != "0" && !c.is_empty())
    }

    /// Logs the event at a severity matching its outcome.
    pub fn log(&self) {
        let channel = self.arg.as_ref().map(|a| a.channel.as_str()).unwrap_or("");
        if self.is_error() {
            tracing::warn!(
                event = %self.event,
                channel,
                code = self.code.as_deref().unwrap_or(""),
                msg = self.msg.as_deref().unwrap_or(""),
                "Exchange event error"
            );
        } else {
            tracing::info!(event = %self.event, channel, "Exchange event");
        }
    }
}

/// Deserializes an OKX decimal string, treating absent/empty as `None`.
pub(crate) fn de_opt_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(text) => text
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// Deserializes an OKX decimal string, treating absent/empty as zero.
pub(crate) fn de_decimal_or_zero<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(de_opt_decimal(deserializer)?.unwrap_or(Decimal::ZERO))
}

/// Deserializes an OKX millisecond-epoch timestamp string, treating
/// absent/empty as zero.
pub(crate) fn de_ms_or_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(0),
        Some(text) => text.parse::<u64>().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscribe_frame_serializes_inst_id_arg() {
        let request = OpRequest::subscribe(vec![FeedArg::instrument(Channel::Books, "BTC-USDT")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "op": "subscribe",
                "args": [{"channel": "books", "instId": "BTC-USDT"}]
            })
        );
    }

    #[test]
    fn subscribe_frame_serializes_inst_type_arg() {
        let request = OpRequest::subscribe(vec![FeedArg::inst_type(Channel::Orders, "ANY")]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "op": "subscribe",
                "args": [{"channel": "orders", "instType": "ANY"}]
            })
        );
    }

    #[test]
    fn event_error_deserializes() {
        let msg: EventMessage = serde_json::from_str(
            r#"{"event":"error","code":"60012","msg":"Invalid request"}"#,
        )
        .unwrap();
        assert_eq!(msg.event, "error");
        assert_eq!(msg.code.as_deref(), Some("60012"));
    }
}
