//! Public market-data feed task.
//!
//! [`MarketFeed`] owns the public WebSocket connection: it subscribes
//! the book, ticker and mark-price channels for the traded instrument,
//! applies every push to the shared [`MarketState`] in arrival order,
//! and reconnects with exponential backoff when the connection drops.
//! The book consistency monitor sends [`MarketCommand::ResubscribeBook`]
//! when a checksum diverges; the feed then drops the local book,
//! unsubscribes, waits out a cooldown and subscribes again so the
//! exchange pushes a fresh snapshot.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use tungstenite::Message as WsMessage;

use super::{INITIAL_BACKOFF, MAX_BACKOFF, WsReader, WsWriter, connect, subscribe, unsubscribe};
use crate::book::OrderBook;
use crate::models::book::{BookAction, BookPush};
use crate::models::ticker::{MarkPricePush, TickerPush};
use crate::models::{Channel, EventMessage, FeedArg};
use crate::state::{MarketState, Shared};

/// Wait before resubscribing a diverged book.
const RESUBSCRIBE_COOLDOWN: Duration = Duration::from_secs(3);

/// Commands sent to the market feed from other tasks.
#[derive(Debug)]
pub enum MarketCommand {
    /// Tear down and re-establish the book subscription for an
    /// instrument whose checksum diverged.
    ResubscribeBook(String),
}

/// Why the reader loop exited.
enum DisconnectReason {
    ConnectionError,
    Shutdown,
}

pub struct MarketFeed {
    url: String,
    inst_id: String,
    market: Shared<MarketState>,
    cmd_rx: mpsc::UnboundedReceiver<MarketCommand>,
}

impl MarketFeed {
    #[must_use]
    pub fn new(
        url: String,
        inst_id: String,
        market: Shared<MarketState>,
        cmd_rx: mpsc::UnboundedReceiver<MarketCommand>,
    ) -> Self {
        Self {
            url,
            inst_id,
            market,
            cmd_rx,
        }
    }

    fn subscriptions(&self) -> Vec<FeedArg> {
        vec![
            FeedArg::instrument(Channel::Books, &self.inst_id),
            FeedArg::instrument(Channel::Tickers, &self.inst_id),
            FeedArg::instrument(Channel::MarkPrice, &self.inst_id),
        ]
    }

    /// Runs the feed indefinitely, reconnecting with backoff.
    pub async fn run(mut self) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            info!(url = %self.url, "Connecting to public WebSocket");
            let (mut write, read) = match connect(&self.url).await {
                Ok(pair) => pair,
                Err(e) => {
                    error!("Connection failed: {e}");
                    info!(backoff_secs = backoff.as_secs(), "Backing off before retry");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            if let Err(e) = subscribe(&mut write, self.subscriptions()).await {
                warn!("Subscribe failed: {e}");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }

            // A reconnect always starts from a fresh snapshot, so any
            // stale book must not survive the gap.
            self.market.lock().await.remove_book(&self.inst_id);

            backoff = INITIAL_BACKOFF;
            match self.read_loop(read, &mut write).await {
                DisconnectReason::ConnectionError => {
                    warn!("Public feed disconnected, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                DisconnectReason::Shutdown => {
                    info!("Market feed shutting down");
                    return;
                }
            }
        }
    }

    async fn read_loop(&mut self, mut read: WsReader, write: &mut WsWriter) -> DisconnectReason {
        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            if let Err(e) = self.dispatch(&text).await {
                                warn!("Failed to handle market message: {e}");
                            }
                        }
                        Some(Ok(_)) => {} // Binary/Ping/Pong/Close frames
                        Some(Err(e)) => {
                            warn!("WebSocket error: {e}");
                            return DisconnectReason::ConnectionError;
                        }
                        None => {
                            warn!("WebSocket stream ended");
                            return DisconnectReason::ConnectionError;
                        }
                    }
                }

                cmd = self.cmd_rx.recv() => {
                    match cmd {
                        Some(MarketCommand::ResubscribeBook(inst_id)) => {
                            if let Err(e) = self.resubscribe_book(write, &inst_id).await {
                                warn!("Book resubscribe failed: {e}");
                                return DisconnectReason::ConnectionError;
                            }
                        }
                        None => return DisconnectReason::Shutdown,
                    }
                }
            }
        }
    }

    /// Recovers a diverged book: drop it, stop the subscription, cool
    /// down, subscribe again for a fresh snapshot.
    async fn resubscribe_book(&self, write: &mut WsWriter, inst_id: &str) -> crate::Result<()> {
        warn!(inst_id, "Resubscribing order book after checksum divergence");
        self.market.lock().await.remove_book(inst_id);
        unsubscribe(write, vec![FeedArg::instrument(Channel::Books, inst_id)]).await?;
        tokio::time::sleep(RESUBSCRIBE_COOLDOWN).await;
        subscribe(write, vec![FeedArg::instrument(Channel::Books, inst_id)]).await?;
        Ok(())
    }

    async fn dispatch(&self, text: &str) -> crate::Result<()> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        if value.get("event").is_some() {
            let event: EventMessage = serde_json::from_value(value)?;
            event.log();
            return Ok(());
        }

        let channel = value
            .pointer("/arg/channel")
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        match channel {
            "books" | "books5" => {
                let push: BookPush = serde_json::from_value(value)?;
                self.apply_book(push).await?;
            }
            "tickers" => {
                let push: TickerPush = serde_json::from_value(value)?;
                let mut market = self.market.lock().await;
                for ticker in push.data {
                    market.insert_ticker(ticker);
                }
            }
            "mark-price" => {
                let push: MarkPricePush = serde_json::from_value(value)?;
                let mut market = self.market.lock().await;
                for mark in push.data {
                    market.insert_mark_price(mark);
                }
            }
            other => debug!(channel = other, "Ignoring unhandled channel"),
        }
        Ok(())
    }

    async fn apply_book(&self, push: BookPush) -> crate::Result<()> {
        let Some(inst_id) = push.arg.inst_id.clone() else {
            warn!("Book push without instrument id");
            return Ok(());
        };
        let action = push.effective_action();
        let mut market = self.market.lock().await;
        for data in &push.data {
            match action {
                BookAction::Snapshot => {
                    let mut book = OrderBook::new(inst_id.clone());
                    book.apply(BookAction::Snapshot, data)?;
                    debug!(
                        inst_id = %inst_id,
                        bids = book.bids().len(),
                        asks = book.asks().len(),
                        "Book snapshot applied"
                    );
                    market.insert_book(book);
                }
                BookAction::Update => match market.book_mut(&inst_id) {
                    Some(book) => book.apply(BookAction::Update, data)?,
                    // updates before a snapshot (or after a checksum
                    // teardown) have nothing to land on
                    None => warn!(inst_id = %inst_id, "Book update without snapshot, dropping"),
                },
            }
        }
        Ok(())
    }
}
