//! Order book channel models.
//!
//! Depth levels arrive as string quadruples `[price, size, _, orderCount]`.
//! The raw text is kept alongside the parsed values because the exchange
//! checksum is defined over the exact wire strings; reformatting a decimal
//! breaks the CRC.

use serde::Deserialize;

use super::FeedArg;

/// A raw depth level as it appears on the wire.
pub type RawLevel = [String; 4];

/// Whether a book message replaces or patches the local book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookAction {
    Snapshot,
    Update,
}

/// A push message from a depth channel (`books`, `books5`, ...).
///
/// An absent `action` field is treated as a snapshot; the top-5 channel
/// never sets it.
#[derive(Debug, Clone, Deserialize)]
pub struct BookPush {
    pub arg: FeedArg,
    #[serde(default)]
    pub action: Option<BookAction>,
    pub data: Vec<BookData>,
}

/// One snapshot or incremental update for a single instrument.
#[derive(Debug, Clone, Deserialize)]
pub struct BookData {
    #[serde(default)]
    pub asks: Vec<RawLevel>,
    #[serde(default)]
    pub bids: Vec<RawLevel>,
    /// Millisecond epoch as a string.
    pub ts: String,
    /// Signed CRC-32 over the top 25 levels; zero/absent means
    /// "do not verify".
    #[serde(default)]
    pub checksum: Option<i32>,
}

impl BookPush {
    /// The effective action: absent means snapshot.
    pub fn effective_action(&self) -> BookAction {
        self.action.unwrap_or(BookAction::Snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_message_deserializes() {
        let push: BookPush = serde_json::from_str(
            r#"{
                "arg": {"channel": "books", "instId": "BTC-USDT"},
                "action": "update",
                "data": [{
                    "asks": [["8476.98", "415", "0", "13"]],
                    "bids": [["8476.97", "256", "0", "12"]],
                    "ts": "1597026383085",
                    "checksum": -855196043
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(push.effective_action(), BookAction::Update);
        assert_eq!(push.arg.inst_id.as_deref(), Some("BTC-USDT"));
        let data = &push.data[0];
        assert_eq!(data.asks[0][0], "8476.98");
        assert_eq!(data.checksum, Some(-855196043));
    }

    #[test]
    fn absent_action_is_snapshot() {
        let push: BookPush = serde_json::from_str(
            r#"{
                "arg": {"channel": "books5", "instId": "BTC-USDT"},
                "data": [{"asks": [], "bids": [], "ts": "0"}]
            }"#,
        )
        .unwrap();
        assert_eq!(push.effective_action(), BookAction::Snapshot);
        assert_eq!(push.data[0].checksum, None);
    }
}
