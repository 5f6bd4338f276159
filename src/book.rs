//! Incrementally maintained, checksum-verified order book.
//!
//! The exchange streams depth deltas over one WebSocket connection; the
//! only way to detect a dropped or reordered message is the CRC-32 the
//! exchange computes over the top 25 levels' exact wire strings. Levels
//! therefore retain their original price/size text next to the parsed
//! decimals — reformatting `"8477.00"` as `"8477"` would silently break
//! every subsequent verification.

use rust_decimal::Decimal;

use crate::error::{BookSide, QuoterieError, Result};
use crate::models::book::{BookAction, BookData, RawLevel};

/// Levels per side included in the checksum payload.
const CHECKSUM_DEPTH: usize = 25;

/// One side's price/size/order-count tuple at a single price.
///
/// Equality and ordering consider the price only: a level is replaced or
/// deleted by price, never matched by size.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    pub price: Decimal,
    pub quantity: Decimal,
    pub order_count: u64,
    pub price_text: String,
    pub quantity_text: String,
    pub order_count_text: String,
}

impl PriceLevel {
    /// Parses a wire-format `[price, size, _, orderCount]` quadruple,
    /// retaining the original text for checksum fidelity.
    pub fn from_raw(raw: &RawLevel) -> Result<Self> {
        let price = raw[0]
            .parse::<Decimal>()
            .map_err(|_| QuoterieError::MalformedDecimal {
                field: "price",
                value: raw[0].clone(),
            })?;
        let quantity = raw[1]
            .parse::<Decimal>()
            .map_err(|_| QuoterieError::MalformedDecimal {
                field: "size",
                value: raw[1].clone(),
            })?;
        let order_count = raw[3].parse::<u64>().unwrap_or(0);
        Ok(Self {
            price,
            quantity,
            order_count,
            price_text: raw[0].clone(),
            quantity_text: raw[1].clone(),
            order_count_text: raw[3].clone(),
        })
    }
}

impl PartialEq for PriceLevel {
    fn eq(&self, other: &Self) -> bool {
        self.price == other.price
    }
}

impl PartialOrd for PriceLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.price.partial_cmp(&other.price)
    }
}

/// Price-ordered depth for one instrument: bids strictly descending,
/// asks strictly ascending, no duplicate prices, no zero-size levels.
#[derive(Debug, Clone)]
pub struct OrderBook {
    inst_id: String,
    bids: Vec<PriceLevel>,
    asks: Vec<PriceLevel>,
    timestamp_ms: u64,
    exchange_checksum: i32,
}

impl OrderBook {
    /// Creates an empty book for one instrument.
    pub fn new(inst_id: impl Into<String>) -> Self {
        Self {
            inst_id: inst_id.into(),
            bids: Vec::new(),
            asks: Vec::new(),
            timestamp_ms: 0,
            exchange_checksum: 0,
        }
    }

    pub fn inst_id(&self) -> &str {
        &self.inst_id
    }

    pub fn bids(&self) -> &[PriceLevel] {
        &self.bids
    }

    pub fn asks(&self) -> &[PriceLevel] {
        &self.asks
    }

    /// Millisecond epoch of the last applied message.
    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp_ms
    }

    pub fn exchange_checksum(&self) -> i32 {
        self.exchange_checksum
    }

    /// Replaces the bid side wholesale; accepts unordered input.
    pub fn apply_bid_snapshot(&mut self, mut levels: Vec<PriceLevel>) {
        levels.retain(|l| !l.quantity.is_zero());
        levels.sort_by(|a, b| b.price.cmp(&a.price));
        self.bids = levels;
        self.assert_sorted();
    }

    /// Replaces the ask side wholesale; accepts unordered input.
    pub fn apply_ask_snapshot(&mut self, mut levels: Vec<PriceLevel>) {
        levels.retain(|l| !l.quantity.is_zero());
        levels.sort_by(|a, b| a.price.cmp(&b.price));
        self.asks = levels;
        self.assert_sorted();
    }

    /// Patches a single bid price: insert, replace, or remove on zero size.
    pub fn apply_bid_update(&mut self, level: PriceLevel) {
        Self::update_side(&mut self.bids, level, |a, b| a.price > b.price);
        self.assert_sorted();
    }

    /// Patches a single ask price: insert, replace, or remove on zero size.
    pub fn apply_ask_update(&mut self, level: PriceLevel) {
        Self::update_side(&mut self.asks, level, |a, b| a.price < b.price);
        self.assert_sorted();
    }

    /// Shared single-level patch. `outranks(a, b)` is true when `a` sits
    /// closer to the touch than `b`. Updates cluster near the touch, so a
    /// linear scan from the best level is adequate.
    fn update_side<F>(levels: &mut Vec<PriceLevel>, level: PriceLevel, outranks: F)
    where
        F: Fn(&PriceLevel, &PriceLevel) -> bool,
    {
        // Extends past the current worst level: append (unless it is a
        // deletion of a price we never had).
        let extends = match levels.last() {
            None => true,
            Some(worst) => outranks(worst, &level),
        };
        if extends {
            if !level.quantity.is_zero() {
                levels.push(level);
            }
            return;
        }
        for i in 0..levels.len() {
            if outranks(&level, &levels[i]) {
                if !level.quantity.is_zero() {
                    levels.insert(i, level);
                }
                return;
            }
            if level.price == levels[i].price {
                if level.quantity.is_zero() {
                    levels.remove(i);
                } else {
                    levels[i] = level;
                }
                return;
            }
        }
    }

    /// Applies one wire message (snapshot replaces, update patches) and
    /// records its timestamp and exchange checksum.
    pub fn apply(&mut self, action: BookAction, data: &BookData) -> Result<()> {
        match action {
            BookAction::Snapshot => {
                if !data.asks.is_empty() {
                    let levels = Self::parse_levels(&data.asks)?;
                    self.apply_ask_snapshot(levels);
                }
                if !data.bids.is_empty() {
                    let levels = Self::parse_levels(&data.bids)?;
                    self.apply_bid_snapshot(levels);
                }
            }
            BookAction::Update => {
                for raw in &data.asks {
                    self.apply_ask_update(PriceLevel::from_raw(raw)?);
                }
                for raw in &data.bids {
                    self.apply_bid_update(PriceLevel::from_raw(raw)?);
                }
            }
        }
        if !data.ts.is_empty() {
            self.timestamp_ms = data
                .ts
                .parse::<u64>()
                .map_err(|_| QuoterieError::MalformedMessage(format!("bad ts {:?}", data.ts)))?;
        }
        if let Some(checksum) = data.checksum {
            self.exchange_checksum = checksum;
        }
        Ok(())
    }

    fn parse_levels(raw: &[RawLevel]) -> Result<Vec<PriceLevel>> {
        raw.iter().map(PriceLevel::from_raw).collect()
    }

    /// Computes the signed CRC-32 over the interleaved
    /// `bid_px:bid_qty:ask_px:ask_qty` string of the top 25 levels per
    /// side, using the exact wire text of each level.
    pub fn checksum(&self) -> i32 {
        let depth = self.bids.len().max(self.asks.len()).min(CHECKSUM_DEPTH);
        let mut fields: Vec<&str> = Vec::with_capacity(depth * 4);
        for i in 0..depth {
            if let Some(bid) = self.bids.get(i) {
                fields.push(&bid.price_text);
                fields.push(&bid.quantity_text);
            }
            if let Some(ask) = self.asks.get(i) {
                fields.push(&ask.price_text);
                fields.push(&ask.quantity_text);
            }
        }
        let payload = fields.join(":");
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(payload.as_bytes());
        // The exchange publishes the CRC reinterpreted as signed 32-bit.
        hasher.finalize() as i32
    }

    /// True when the local book matches the exchange checksum, or when the
    /// exchange has not supplied one (zero means "do not verify").
    pub fn verify(&self) -> bool {
        self.exchange_checksum == 0 || self.checksum() == self.exchange_checksum
    }

    fn empty_side_err(&self, side: BookSide) -> QuoterieError {
        QuoterieError::EmptyBookSide {
            inst_id: self.inst_id.clone(),
            side,
        }
    }

    pub fn best_bid(&self) -> Result<&PriceLevel> {
        self.bids.first().ok_or_else(|| self.empty_side_err(BookSide::Bids))
    }

    pub fn best_ask(&self) -> Result<&PriceLevel> {
        self.asks.first().ok_or_else(|| self.empty_side_err(BookSide::Asks))
    }

    pub fn best_bid_price(&self) -> Result<Decimal> {
        Ok(self.best_bid()?.price)
    }

    pub fn best_ask_price(&self) -> Result<Decimal> {
        Ok(self.best_ask()?.price)
    }

    /// The bid at 1-indexed depth `level`; `Ok(None)` beyond available
    /// depth. Errors only when the side has no levels at all.
    pub fn bid_at_level(&self, level: usize) -> Result<Option<&PriceLevel>> {
        if self.bids.is_empty() {
            return Err(self.empty_side_err(BookSide::Bids));
        }
        Ok(self.bids.get(level.max(1) - 1))
    }

    /// The ask at 1-indexed depth `level`; `Ok(None)` beyond available
    /// depth. Errors only when the side has no levels at all.
    pub fn ask_at_level(&self, level: usize) -> Result<Option<&PriceLevel>> {
        if self.asks.is_empty() {
            return Err(self.empty_side_err(BookSide::Asks));
        }
        Ok(self.asks.get(level.max(1) - 1))
    }

    /// Midpoint between best bid and best ask.
    pub fn mid_price(&self) -> Result<Decimal> {
        let bid = self.best_bid_price()?;
        let ask = self.best_ask_price()?;
        Ok((bid + ask) / Decimal::TWO)
    }

    /// Sort-order corruption indicates a defect in the update algorithm,
    /// not an external condition, so it fails loudly in debug builds.
    fn assert_sorted(&self) {
        debug_assert!(
            self.bids.windows(2).all(|w| w[0].price > w[1].price),
            "bid side out of order for {}",
            self.inst_id
        );
        debug_assert!(
            self.asks.windows(2).all(|w| w[0].price < w[1].price),
            "ask side out of order for {}",
            self.inst_id
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn lvl(price: &str, qty: &str) -> PriceLevel {
        PriceLevel::from_raw(&[
            price.to_string(),
            qty.to_string(),
            "0".to_string(),
            "1".to_string(),
        ])
        .unwrap()
    }

    fn two_level_book() -> OrderBook {
        let mut book = OrderBook::new("BTC-USDT");
        book.apply_bid_snapshot(vec![lvl("99", "1")]);
        book.apply_ask_snapshot(vec![lvl("100", "1")]);
        book
    }

    #[test]
    fn snapshot_sorts_unordered_input() {
        let mut book = OrderBook::new("BTC-USDT");
        book.apply_bid_snapshot(vec![lvl("98", "1"), lvl("100", "2"), lvl("99", "3")]);
        book.apply_ask_snapshot(vec![lvl("103", "1"), lvl("101", "2"), lvl("102", "3")]);
        let bid_prices: Vec<Decimal> = book.bids().iter().map(|l| l.price).collect();
        let ask_prices: Vec<Decimal> = book.asks().iter().map(|l| l.price).collect();
        assert_eq!(bid_prices, vec![dec!(100), dec!(99), dec!(98)]);
        assert_eq!(ask_prices, vec![dec!(101), dec!(102), dec!(103)]);
    }

    #[test]
    fn update_inserts_replaces_and_appends() {
        let mut book = OrderBook::new("BTC-USDT");
        book.apply_bid_snapshot(vec![lvl("100", "1"), lvl("98", "1")]);
        // interior insert
        book.apply_bid_update(lvl("99", "5"));
        // in-place replace
        book.apply_bid_update(lvl("100", "7"));
        // extends past the worst level
        book.apply_bid_update(lvl("97", "2"));
        let prices: Vec<Decimal> = book.bids().iter().map(|l| l.price).collect();
        assert_eq!(prices, vec![dec!(100), dec!(99), dec!(98), dec!(97)]);
        assert_eq!(book.bids()[0].quantity, dec!(7));
        // new best bid goes to the front
        book.apply_bid_update(lvl("101", "1"));
        assert_eq!(book.best_bid_price().unwrap(), dec!(101));
    }

    #[test]
    fn zero_quantity_removes_existing_level() {
        let mut book = OrderBook::new("BTC-USDT");
        book.apply_ask_snapshot(vec![lvl("100", "1"), lvl("101", "2")]);
        book.apply_ask_update(lvl("100", "0"));
        assert_eq!(book.asks().len(), 1);
        assert_eq!(book.best_ask_price().unwrap(), dec!(101));
    }

    #[test]
    fn zero_quantity_at_absent_price_is_noop() {
        let mut book = OrderBook::new("BTC-USDT");
        book.apply_ask_snapshot(vec![lvl("100", "1")]);
        // interior miss
        book.apply_ask_update(lvl("100.5", "0"));
        // beyond the worst level
        book.apply_ask_update(lvl("200", "0"));
        // empty side
        book.apply_bid_update(lvl("99", "0"));
        assert_eq!(book.asks().len(), 1);
        assert!(book.bids().is_empty());
    }

    #[test]
    fn checksum_known_vector() {
        let book = two_level_book();
        // CRC-32 of "99:1:100:1", signed
        assert_eq!(book.checksum(), 1987059921);
    }

    #[test]
    fn checksum_changes_when_level_mutates() {
        let mut book = two_level_book();
        book.apply_bid_update(lvl("99", "2"));
        // CRC-32 of "99:2:100:1"
        assert_eq!(book.checksum(), 1201158732);
    }

    #[test]
    fn checksum_interleaves_uneven_depths() {
        let mut book = OrderBook::new("SOL-USDT");
        book.apply_bid_snapshot(vec![lvl("25.5", "10"), lvl("25.4", "2")]);
        book.apply_ask_snapshot(vec![lvl("25.6", "1")]);
        // CRC-32 of "25.5:10:25.6:1:25.4:2"
        assert_eq!(book.checksum(), 1712555369);
    }

    #[test]
    fn checksum_single_sided_book() {
        let mut book = OrderBook::new("BTC-USDT");
        book.apply_ask_snapshot(vec![lvl("100", "1")]);
        assert_eq!(book.checksum(), -95115943);

        let mut book = OrderBook::new("XRP-USDT");
        book.apply_bid_snapshot(vec![lvl("3.35", "10")]);
        assert_eq!(book.checksum(), -783443606);
    }

    #[test]
    fn checksum_uses_original_text_not_reformatted_decimals() {
        let mut book = OrderBook::new("BTC-USDT");
        let asks = [
            ("8476.98", "415"),
            ("8477", "7"),
            ("8477.34", "85"),
            ("8477.56", "1"),
            ("8505.84", "8"),
            ("8506.37", "85"),
            ("8506.49", "2"),
            ("8506.96", "100"),
        ];
        let bids = [
            ("8476.97", "256"),
            ("8475.55", "101"),
            ("8475.54", "100"),
            ("8475.3", "1"),
            ("8447.32", "6"),
            ("8447.02", "246"),
            ("8446.83", "24"),
            ("8446", "95"),
        ];
        book.apply_ask_snapshot(asks.iter().map(|(p, q)| lvl(p, q)).collect());
        book.apply_bid_snapshot(bids.iter().map(|(p, q)| lvl(p, q)).collect());
        assert_eq!(book.checksum(), -2102840145);
    }

    #[test]
    fn checksum_truncates_to_top_25_levels() {
        let mut deep = OrderBook::new("BTC-USDT");
        let bids: Vec<PriceLevel> = (0..30).map(|i| lvl(&format!("{}", 100 - i), "1")).collect();
        let asks: Vec<PriceLevel> = (0..30).map(|i| lvl(&format!("{}", 101 + i), "1")).collect();
        deep.apply_bid_snapshot(bids.clone());
        deep.apply_ask_snapshot(asks.clone());

        let mut shallow = OrderBook::new("BTC-USDT");
        shallow.apply_bid_snapshot(bids.into_iter().take(25).collect());
        shallow.apply_ask_snapshot(asks.into_iter().take(25).collect());

        assert_eq!(deep.checksum(), -1182526463);
        assert_eq!(deep.checksum(), shallow.checksum());
    }

    #[test]
    fn verify_ignores_zero_exchange_checksum() {
        let book = two_level_book();
        assert_eq!(book.exchange_checksum(), 0);
        assert!(book.verify());
    }

    #[test]
    fn end_to_end_snapshot_update_checksum() {
        let mut book = OrderBook::new("BTC-USDT");
        let snapshot: BookData = serde_json::from_str(
            r#"{
                "asks": [["100", "1", "0", "1"]],
                "bids": [["99", "1", "0", "1"]],
                "ts": "1597026383085",
                "checksum": 1987059921
            }"#,
        )
        .unwrap();
        book.apply(BookAction::Snapshot, &snapshot).unwrap();
        assert!(book.verify());
        assert_eq!(book.timestamp_ms(), 1597026383085);

        let update: BookData = serde_json::from_str(
            r#"{
                "asks": [["100.5", "2", "0", "1"]],
                "bids": [],
                "ts": "1597026383185",
                "checksum": 770287150
            }"#,
        )
        .unwrap();
        book.apply(BookAction::Update, &update).unwrap();
        assert_eq!(book.best_ask_price().unwrap(), dec!(100));
        assert_eq!(
            book.ask_at_level(2).unwrap().map(|l| l.price),
            Some(dec!(100.5))
        );
        assert!(book.verify());

        // a dropped delta now shows up as a mismatch
        let stale: BookData = serde_json::from_str(
            r#"{"asks": [], "bids": [], "ts": "", "checksum": 123456}"#,
        )
        .unwrap();
        book.apply(BookAction::Update, &stale).unwrap();
        assert!(!book.verify());
    }

    #[test]
    fn accessors_on_empty_side() {
        let book = OrderBook::new("BTC-USDT");
        assert!(matches!(
            book.best_bid(),
            Err(QuoterieError::EmptyBookSide { .. })
        ));
        assert!(matches!(
            book.mid_price(),
            Err(QuoterieError::EmptyBookSide { .. })
        ));
    }

    #[test]
    fn level_accessors_clamp_and_bound() {
        let book = two_level_book();
        // level 0 is treated as level 1
        assert_eq!(
            book.bid_at_level(0).unwrap().map(|l| l.price),
            Some(dec!(99))
        );
        assert_eq!(book.ask_at_level(1).unwrap().map(|l| l.price), Some(dec!(100)));
        // beyond depth is "not available", not an error
        assert_eq!(book.ask_at_level(9).unwrap().map(|l| l.price), None);
    }

    #[test]
    fn malformed_level_rejected() {
        let raw = ["abc".to_string(), "1".to_string(), "0".to_string(), "1".to_string()];
        assert!(matches!(
            PriceLevel::from_raw(&raw),
            Err(QuoterieError::MalformedDecimal { field: "price", .. })
        ));
    }
}
