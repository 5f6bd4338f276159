//! Shared in-memory state written by the feed tasks and read by the
//! strategy engine.
//!
//! Each cache lives behind an `Arc<tokio::sync::Mutex<..>>` handle that
//! is passed explicitly to whoever needs it. Caches that start empty
//! distinguish "no data received yet" from "received and empty" by
//! wrapping the payload in `Option`; readers get a `NotReady` error
//! until the first push lands.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::book::OrderBook;
use crate::error::{QuoterieError, Result};
use crate::models::account::{Account, Position};
use crate::models::order::PosSide;
use crate::models::ticker::{MarkPrice, Ticker};
use crate::orders::OpenOrderSet;

pub type Shared<T> = Arc<Mutex<T>>;

pub fn shared<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}

/// Order books, tickers and mark prices keyed by instrument id.
#[derive(Debug, Default)]
pub struct MarketState {
    books: HashMap<String, OrderBook>,
    tickers: HashMap<String, Ticker>,
    mark_prices: HashMap<String, MarkPrice>,
}

impl MarketState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn book(&self, inst_id: &str) -> Result<&OrderBook> {
        self.books
            .get(inst_id)
            .ok_or(QuoterieError::NotReady("order book"))
    }

    pub fn book_mut(&mut self, inst_id: &str) -> Option<&mut OrderBook> {
        self.books.get_mut(inst_id)
    }

    pub fn insert_book(&mut self, book: OrderBook) {
        self.books.insert(book.inst_id().to_string(), book);
    }

    pub fn remove_book(&mut self, inst_id: &str) -> Option<OrderBook> {
        self.books.remove(inst_id)
    }

    pub fn books(&self) -> impl Iterator<Item = &OrderBook> {
        self.books.values()
    }

    pub fn ticker(&self, inst_id: &str) -> Result<&Ticker> {
        self.tickers
            .get(inst_id)
            .ok_or(QuoterieError::NotReady("ticker"))
    }

    pub fn insert_ticker(&mut self, ticker: Ticker) {
        self.tickers.insert(ticker.inst_id.clone(), ticker);
    }

    pub fn mark_price(&self, inst_id: &str) -> Result<&MarkPrice> {
        self.mark_prices
            .get(inst_id)
            .ok_or(QuoterieError::NotReady("mark price"))
    }

    pub fn insert_mark_price(&mut self, mark: MarkPrice) {
        self.mark_prices.insert(mark.inst_id.clone(), mark);
    }
}

/// Account balances and open positions from the private feed.
#[derive(Debug, Default)]
pub struct PortfolioState {
    account: Option<Account>,
    /// Keyed by instrument id plus position side, since long and short
    /// legs of the same instrument are distinct positions.
    positions: HashMap<(String, PosSide), Position>,
}

impl PortfolioState {
    pub fn new() -> Self {
        Self::default()
    }

    fn position_key(position: &Position) -> (String, PosSide) {
        (position.inst_id.clone(), position.pos_side)
    }

    pub fn account(&self) -> Result<&Account> {
        self.account
            .as_ref()
            .ok_or(QuoterieError::NotReady("account"))
    }

    pub fn set_account(&mut self, account: Account) {
        self.account = Some(account);
    }

    pub fn apply_positions(&mut self, positions: impl IntoIterator<Item = Position>) {
        for position in positions {
            let key = Self::position_key(&position);
            if position.pos.is_zero() {
                self.positions.remove(&key);
            } else {
                self.positions.insert(key, position);
            }
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }
}

/// Mirror of the account's open orders, absent until the first orders
/// push seeds it.
#[derive(Debug, Default)]
pub struct OrderCache {
    orders: Option<OpenOrderSet>,
}

impl OrderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Result<&OpenOrderSet> {
        self.orders
            .as_ref()
            .ok_or(QuoterieError::NotReady("open orders"))
    }

    pub fn get_mut(&mut self) -> Result<&mut OpenOrderSet> {
        self.orders
            .as_mut()
            .ok_or(QuoterieError::NotReady("open orders"))
    }

    /// Merges an orders push, seeding the set on first contact.
    pub fn apply(&mut self, orders: impl IntoIterator<Item = crate::models::order::OpenOrder>) {
        self.orders.get_or_insert_with(OpenOrderSet::new).apply(orders);
    }

    pub fn is_ready(&self) -> bool {
        self.orders.is_some()
    }
}
