//! Crate-level error types.
//!
//! [`QuoterieError`] unifies every error source (configuration, WebSocket,
//! REST, JSON, book and order-state lookups) behind a single enum so
//! callers can match on the variant they care about while still using the
//! `?` operator for easy propagation.

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QuoterieError>;

/// Which side of the order book an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookSide {
    Bids,
    Asks,
}

impl std::fmt::Display for BookSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookSide::Bids => write!(f, "bids"),
            BookSide::Asks => write!(f, "asks"),
        }
    }
}

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum QuoterieError {
    /// Configuration is missing or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// A WebSocket operation (connect, send, receive) failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Reading a local file (e.g. the params file) failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A REST request to the exchange failed.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// A message arrived that could not be interpreted at all.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    /// A numeric field carried text that does not parse as a decimal.
    #[error("malformed decimal in field {field}: {value:?}")]
    MalformedDecimal { field: &'static str, value: String },

    /// An accessor was called on a book side with no levels yet.
    ///
    /// Recoverable: the caller should treat the book as "not ready".
    #[error("order book for {inst_id}: {side} side not initiated")]
    EmptyBookSide { inst_id: String, side: BookSide },

    /// A shared cache has not received its first snapshot yet.
    #[error("{0} not ready in cache")]
    NotReady(&'static str),

    /// An instrument id could not be decomposed into exchange segments.
    #[error("invalid instrument id {0:?}")]
    MalformedInstrumentId(String),

    /// A well-formed instrument id the exchange does not list.
    #[error("instrument {0:?} not found on the exchange")]
    InstrumentNotFound(String),

    /// The exchange rejected an authenticated request.
    #[error("auth error: {0}")]
    Auth(String),

    /// The exchange answered an RPC with a non-zero error code.
    #[error("exchange error {code}: {message}")]
    Exchange { code: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlisted_instrument_is_not_reported_as_malformed() {
        let unlisted = QuoterieError::InstrumentNotFound("BTC-USDT-SWAP".to_string());
        assert_eq!(
            unlisted.to_string(),
            "instrument \"BTC-USDT-SWAP\" not found on the exchange"
        );
        let malformed = QuoterieError::MalformedInstrumentId("BTCUSDT".to_string());
        assert_eq!(malformed.to_string(), "invalid instrument id \"BTCUSDT\"");
    }
}
