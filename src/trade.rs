//! REST order submission.
//!
//! [`TradeClient`] wraps the exchange's batch trade endpoints. The
//! exchange accepts at most 20 entries per batch request, so larger
//! request sets are chunked transparently and the per-order results
//! concatenated. Every response carries a per-order `sCode`; callers
//! (the order tracker) decide per order what a failure means, so this
//! layer only fails hard when the whole request was rejected.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::auth::Credentials;
use crate::error::{QuoterieError, Result};
use crate::models::instrument::{InstType, Instrument, RestResponse};
use crate::models::request::{
    AmendOrderRequest, CancelOrderRequest, OrderAck, PlaceOrderRequest,
};
use crate::models::ticker::Ticker;

/// Exchange-imposed cap on entries per batch trade request.
const MAX_BATCH: usize = 20;

const PLACE_PATH: &str = "/api/v5/trade/batch-orders";
const AMEND_PATH: &str = "/api/v5/trade/amend-batch-orders";
const CANCEL_PATH: &str = "/api/v5/trade/cancel-batch-orders";
const INSTRUMENTS_PATH: &str = "/api/v5/public/instruments";
const TICKERS_PATH: &str = "/api/v5/market/tickers";

pub struct TradeClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl TradeClient {
    pub fn new(base_url: String, credentials: Credentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }

    pub async fn place_orders(&self, requests: &[PlaceOrderRequest]) -> Result<Vec<OrderAck>> {
        self.post_batched(PLACE_PATH, requests).await
    }

    pub async fn amend_orders(&self, requests: &[AmendOrderRequest]) -> Result<Vec<OrderAck>> {
        self.post_batched(AMEND_PATH, requests).await
    }

    pub async fn cancel_orders(&self, requests: &[CancelOrderRequest]) -> Result<Vec<OrderAck>> {
        self.post_batched(CANCEL_PATH, requests).await
    }

    /// Fetches instrument metadata (tick size, lot size, contract
    /// values). Public endpoint, no signature needed.
    pub async fn instruments(&self, inst_type: InstType) -> Result<Vec<Instrument>> {
        let url = format!(
            "{}{}?instType={}",
            self.base_url,
            INSTRUMENTS_PATH,
            inst_type.as_str()
        );
        let response: RestResponse<Instrument> =
            self.http.get(&url).send().await?.json().await?;
        if !response.is_ok() {
            return Err(QuoterieError::Exchange {
                code: response.code,
                message: response.msg,
            });
        }
        Ok(response.data)
    }

    /// Fetches tickers for every instrument of a type. The spot
    /// universe backs USDT valuation of currencies the WebSocket
    /// subscriptions do not cover. Public endpoint, no signature.
    pub async fn market_tickers(&self, inst_type: InstType) -> Result<Vec<Ticker>> {
        let url = format!(
            "{}{}?instType={}",
            self.base_url,
            TICKERS_PATH,
            inst_type.as_str()
        );
        let response: RestResponse<Ticker> =
            self.http.get(&url).send().await?.json().await?;
        if !response.is_ok() {
            return Err(QuoterieError::Exchange {
                code: response.code,
                message: response.msg,
            });
        }
        Ok(response.data)
    }

    async fn post_batched<T: Serialize>(&self, path: &str, requests: &[T]) -> Result<Vec<OrderAck>> {
        let mut acks = Vec::with_capacity(requests.len());
        for chunk in requests.chunks(MAX_BATCH) {
            acks.extend(self.post_chunk(path, chunk).await?);
        }
        Ok(acks)
    }

    async fn post_chunk<T: Serialize>(&self, path: &str, chunk: &[T]) -> Result<Vec<OrderAck>> {
        let body = batch_body(chunk)?;
        let response: RestResponse<OrderAck> = self.post_signed(path, body).await?;
        // code "1" with data means per-order failures; let the caller
        // inspect each sCode
        if response.data.is_empty() && !response.is_ok() {
            warn!(path, code = %response.code, msg = %response.msg, "batch request rejected");
            return Err(QuoterieError::Exchange {
                code: response.code,
                message: response.msg,
            });
        }
        debug!(path, count = response.data.len(), "batch response");
        Ok(response.data)
    }

    async fn post_signed<R: DeserializeOwned>(&self, path: &str, body: String) -> Result<R> {
        let headers = self.credentials.rest_headers("POST", path, &body)?;
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("OK-ACCESS-KEY", &headers.api_key)
            .header("OK-ACCESS-SIGN", &headers.signature)
            .header("OK-ACCESS-TIMESTAMP", &headers.timestamp)
            .header("OK-ACCESS-PASSPHRASE", &headers.passphrase)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await?;
        Ok(response.json().await?)
    }
}

/// Serializes one chunk as the JSON array the batch endpoints expect.
fn batch_body<T: Serialize>(chunk: &[T]) -> Result<String> {
    Ok(serde_json::to_string(chunk)?)
}
