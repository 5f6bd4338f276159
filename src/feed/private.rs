//! Authenticated feed task.
//!
//! [`PrivateFeed`] owns the private WebSocket connection: it logs in
//! with a signed frame, subscribes the orders, account and positions
//! channels, and applies every push to the shared order and portfolio
//! caches. Like the public feed it reconnects with exponential backoff;
//! each reconnect performs a fresh login.

use futures_util::StreamExt;
use tracing::{debug, error, info, warn};
use tungstenite::Message as WsMessage;

use super::{INITIAL_BACKOFF, MAX_BACKOFF, WsReader, WsWriter, connect, login, subscribe};
use crate::auth::Credentials;
use crate::models::account::{AccountPush, PositionsPush};
use crate::models::order::OrdersPush;
use crate::models::{Channel, EventMessage, FeedArg};
use crate::state::{OrderCache, PortfolioState, Shared};

/// Why the reader loop exited.
enum DisconnectReason {
    ConnectionError,
    /// The exchange rejected the login; retrying will not help.
    AuthFailure,
}

pub struct PrivateFeed {
    url: String,
    credentials: Credentials,
    orders: Shared<OrderCache>,
    portfolio: Shared<PortfolioState>,
}

impl PrivateFeed {
    #[must_use]
    pub fn new(
        url: String,
        credentials: Credentials,
        orders: Shared<OrderCache>,
        portfolio: Shared<PortfolioState>,
    ) -> Self {
        Self {
            url,
            credentials,
            orders,
            portfolio,
        }
    }

    fn subscriptions() -> Vec<FeedArg> {
        vec![
            FeedArg::inst_type(Channel::Orders, "ANY"),
            FeedArg::bare(Channel::Account),
            FeedArg::inst_type(Channel::Positions, "ANY"),
        ]
    }

    /// Runs the feed indefinitely, reconnecting with backoff. Returns
    /// only on login rejection, which needs operator attention.
    pub async fn run(self) {
        let mut backoff = INITIAL_BACKOFF;

        loop {
            info!(url = %self.url, "Connecting to private WebSocket");
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

            let request = match self.credentials.login_request() {
                Ok(request) => request,
                Err(e) => {
                    error!("Cannot build login request: {e}");
                    return;
                }
            };
            if let Err(e) = login(&mut write, request).await {
                warn!("Login send failed: {e}");
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                continue;
            }

            backoff = INITIAL_BACKOFF;
            match self.read_loop(read, &mut write).await {
                DisconnectReason::ConnectionError => {
                    warn!("Private feed disconnected, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                DisconnectReason::AuthFailure => {
                    error!("Exchange rejected credentials, stopping private feed");
                    return;
                }
            }
        }
    }

    async fn read_loop(&self, mut read: WsReader, write: &mut WsWriter) -> DisconnectReason {
        while let Some(msg) = read.next().await {
            match msg {
                Ok(WsMessage::Text(text)) => match self.dispatch(&text, write).await {
                    Ok(true) => {}
                    Ok(false) => return DisconnectReason::AuthFailure,
                    Err(e) => warn!("Failed to handle private message: {e}"),
                },
                Ok(_) => {} // Binary/Ping/Pong/Close frames
                Err(e) => {
                    warn!("WebSocket error: {e}");
                    return DisconnectReason::ConnectionError;
                }
            }
        }
        warn!("WebSocket stream ended");
        DisconnectReason::ConnectionError
    }

    /// Handles one frame. Returns `Ok(false)` on login rejection.
    async fn dispatch(&self, text: &str, write: &mut WsWriter) -> crate::Result<bool> {
        let value: serde_json::Value = serde_json::from_str(text)?;

        if value.get("event").is_some() {
            let event: EventMessage = serde_json::from_value(value)?;
            if event.event == "login" {
                if event.is_error() {
                    event.log();
                    return Ok(false);
                }
                info!("Login confirmed, subscribing private channels");
                subscribe(write, Self::subscriptions()).await?;
                return Ok(true);
            }
            event.log();
            return Ok(true);
        }

        let channel = value
            .pointer("/arg/channel")
            .and_then(|c| c.as_str())
            .unwrap_or_default();
        match channel {
            "orders" => {
                let push: OrdersPush = serde_json::from_value(value)?;
                debug!(count = push.data.len(), "Order updates");
                self.orders.lock().await.apply(push.data);
            }
            "account" => {
                let push: AccountPush = serde_json::from_value(value)?;
                let mut portfolio = self.portfolio.lock().await;
                if let Some(account) = push.data.into_iter().next_back() {
                    portfolio.set_account(account);
                }
            }
            "positions" => {
                let push: PositionsPush = serde_json::from_value(value)?;
                self.portfolio.lock().await.apply_positions(push.data);
            }
            other => debug!(channel = other, "Ignoring unhandled channel"),
        }
        Ok(true)
    }
}
