//! Async WebSocket plumbing shared by the public and private feeds.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};
use tungstenite::Message;

use crate::Result;
use crate::models::{FeedArg, LoginRequest, OpRequest};

pub mod market;
pub mod private;

/// Write half of an exchange WebSocket connection.
pub type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Read half of an exchange WebSocket connection.
pub type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Initial backoff duration between reconnection attempts.
pub(crate) const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Maximum backoff duration between reconnection attempts.
pub(crate) const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Establishes a WebSocket connection to the given URL.
///
/// # Errors
///
/// Returns a [`QuoterieError`](crate::QuoterieError) if the connection
/// or TLS handshake fails.
pub async fn connect(url: &str) -> Result<(WsWriter, WsReader)> {
    let (ws_stream, _) = connect_async(url).await?;
    info!("WebSocket handshake completed");

    Ok(ws_stream.split())
}

/// Subscribes to a set of channels in one request.
///
/// # Errors
///
/// Returns a [`QuoterieError`](crate::QuoterieError) if sending fails.
pub async fn subscribe(write: &mut WsWriter, args: Vec<FeedArg>) -> Result<()> {
    let channels = channel_names(&args);
    let request = OpRequest::subscribe(args);
    let json = serde_json::to_string(&request)?;
    write.send(Message::Text(json.into())).await?;
    info!(channels = ?channels, "Subscribed to channels");

    Ok(())
}

/// Unsubscribes from a set of channels in one request.
///
/// # Errors
///
/// Returns a [`QuoterieError`](crate::QuoterieError) if sending fails.
pub async fn unsubscribe(write: &mut WsWriter, args: Vec<FeedArg>) -> Result<()> {
    let channels = channel_names(&args);
    let request = OpRequest::unsubscribe(args);
    let json = serde_json::to_string(&request)?;
    write.send(Message::Text(json.into())).await?;
    info!(channels = ?channels, "Unsubscribed from channels");

    Ok(())
}

/// Channel names for logging, owned so the args can move into the
/// request afterwards.
fn channel_names(args: &[FeedArg]) -> Vec<String> {
    args.iter().map(|a| a.channel.clone()).collect()
}

/// Sends a login frame on the private connection. The exchange answers
/// with a `login` event that the read loop watches for.
///
/// # Errors
///
/// Returns a [`QuoterieError`](crate::QuoterieError) if sending fails.
pub async fn login(write: &mut WsWriter, request: LoginRequest) -> Result<()> {
    let json = serde_json::to_string(&request)?;
    write.send(Message::Text(json.into())).await?;
    debug!("Sent login request");

    Ok(())
}
