//! Application configuration loaded from environment variables.
//!
//! Credentials **must** be provided via environment variables:
//! - `OKX_API_KEY` — API key
//! - `OKX_SECRET_KEY` — API secret used for request signing
//! - `OKX_PASSPHRASE` — the passphrase chosen when the key was created
//!
//! Optional overrides point the client at the demo environment or a
//! non-default instrument:
//! - `OKX_PUBLIC_WS_URL`, `OKX_PRIVATE_WS_URL`, `OKX_REST_URL`
//! - `OKX_INST_ID` — instrument to quote (default `BTC-USDT-SWAP`)
//! - `OKX_PARAMS_FILE` — strategy parameter file path

/// Default public WebSocket endpoint.
const DEFAULT_PUBLIC_WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";
/// Default private (authenticated) WebSocket endpoint.
const DEFAULT_PRIVATE_WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/private";
/// Default REST base URL.
const DEFAULT_REST_URL: &str = "https://www.okx.com";
const DEFAULT_INST_ID: &str = "BTC-USDT-SWAP";
const DEFAULT_PARAMS_FILE: &str = "params.json";

/// Top-level application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    /// Instrument the strategy quotes.
    pub inst_id: String,
    /// Path of the hot-reloaded strategy parameter file.
    pub params_file: String,
}

/// Exchange endpoints and credentials.
#[derive(Debug)]
pub struct ExchangeConfig {
    pub public_ws_url: String,
    pub private_ws_url: String,
    pub rest_url: String,
    pub api_key: Option<String>,
    pub secret_key: Option<String>,
    pub passphrase: Option<String>,
}

impl ExchangeConfig {
    /// True when a full credential triple is present.
    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some() && self.secret_key.is_some() && self.passphrase.is_some()
    }
}

/// Loads the application configuration from environment variables.
///
/// Endpoints default to the production exchange and can be overridden
/// individually. Credentials are optional (market-data-only mode) but
/// when any of the three is set all must be present.
///
/// # Errors
///
/// Returns [`QuoterieError::Config`](crate::QuoterieError::Config) if
/// the credential triple is only partially set.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let public_ws_url =
        non_empty_var("OKX_PUBLIC_WS_URL").unwrap_or_else(|| DEFAULT_PUBLIC_WS_URL.to_string());
    let private_ws_url =
        non_empty_var("OKX_PRIVATE_WS_URL").unwrap_or_else(|| DEFAULT_PRIVATE_WS_URL.to_string());
    let rest_url = non_empty_var("OKX_REST_URL").unwrap_or_else(|| DEFAULT_REST_URL.to_string());
    let inst_id = non_empty_var("OKX_INST_ID").unwrap_or_else(|| DEFAULT_INST_ID.to_string());
    let params_file =
        non_empty_var("OKX_PARAMS_FILE").unwrap_or_else(|| DEFAULT_PARAMS_FILE.to_string());

    let api_key = non_empty_var("OKX_API_KEY");
    let secret_key = non_empty_var("OKX_SECRET_KEY");
    let passphrase = non_empty_var("OKX_PASSPHRASE");

    let set = [&api_key, &secret_key, &passphrase]
        .iter()
        .filter(|v| v.is_some())
        .count();
    if set != 0 && set != 3 {
        let missing: Vec<&str> = [
            ("OKX_API_KEY", &api_key),
            ("OKX_SECRET_KEY", &secret_key),
            ("OKX_PASSPHRASE", &passphrase),
        ]
        .iter()
        .filter(|(_, v)| v.is_none())
        .map(|(name, _)| *name)
        .collect();
        return Err(crate::QuoterieError::Config(format!(
            "incomplete credentials: {} missing",
            missing.join(", ")
        )));
    }

    Ok(AppConfig {
        exchange: ExchangeConfig {
            public_ws_url,
            private_ws_url,
            rest_url,
            api_key,
            secret_key,
            passphrase,
        },
        inst_id,
        params_file,
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}
