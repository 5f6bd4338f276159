//! Request signing for the exchange's REST and WebSocket APIs.
//!
//! Both surfaces authenticate with the same primitive: base64 of an
//! HMAC-SHA256 over a timestamped prehash string. REST requests carry
//! the signature in `OK-ACCESS-*` headers with an ISO 8601 millisecond
//! timestamp; the private WebSocket login frame signs a fixed path with
//! an epoch-seconds timestamp instead.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::prelude::*;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{QuoterieError, Result};
use crate::models::{LoginArg, LoginRequest};

/// WebSocket login signs this path regardless of the connection URL.
const LOGIN_SIGN_PATH: &str = "/users/self/verify";

/// API credentials; the secret is wiped from memory on drop.
pub struct Credentials {
    pub api_key: String,
    pub passphrase: String,
    secret_key: Zeroizing<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"<redacted>")
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Signed header set for one REST request.
#[derive(Debug)]
pub struct SignedHeaders {
    pub api_key: String,
    pub signature: String,
    pub timestamp: String,
    pub passphrase: String,
}

impl Credentials {
    pub fn new(api_key: String, secret_key: String, passphrase: String) -> Self {
        Self {
            api_key,
            passphrase,
            secret_key: Zeroizing::new(secret_key),
        }
    }

    /// Builds the `OK-ACCESS-*` headers for a REST request. `body` must
    /// be the exact serialized payload that will be sent, or empty for
    /// GET requests.
    pub fn rest_headers(&self, method: &str, path: &str, body: &str) -> Result<SignedHeaders> {
        let timestamp = iso_timestamp_now();
        let prehash = format!("{timestamp}{method}{path}{body}");
        let signature = sign(&self.secret_key, &prehash)?;
        Ok(SignedHeaders {
            api_key: self.api_key.clone(),
            signature,
            timestamp,
            passphrase: self.passphrase.clone(),
        })
    }

    /// Builds the login frame for the private WebSocket channel.
    pub fn login_request(&self) -> Result<LoginRequest> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .to_string();
        let prehash = format!("{timestamp}GET{LOGIN_SIGN_PATH}");
        let signature = sign(&self.secret_key, &prehash)?;
        Ok(LoginRequest::new(LoginArg {
            api_key: self.api_key.clone(),
            passphrase: self.passphrase.clone(),
            timestamp,
            sign: signature,
        }))
    }
}

/// `Base64(HMAC-SHA256(secret, prehash))`.
fn sign(secret: &str, prehash: &str) -> Result<String> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| QuoterieError::Auth(format!("invalid HMAC key: {e}")))?;
    mac.update(prehash.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}

fn iso_timestamp_now() -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format_iso_millis(now.as_secs(), now.subsec_millis())
}

/// ISO 8601 UTC with millisecond precision, e.g. `2020-12-08T09:08:57.715Z`.
fn format_iso_millis(secs: u64, millis: u32) -> String {
    let days = secs / 86400;
    let time_secs = secs % 86400;
    let hours = time_secs / 3600;
    let minutes = (time_secs % 3600) / 60;
    let seconds = time_secs % 60;

    // Civil date from days since epoch (algorithm from Howard Hinnant)
    let z = days as i64 + 719468;
    let era = z.div_euclid(146097);
    let doe = z.rem_euclid(146097) as u64;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe as i64 + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };

    format!("{y:04}-{m:02}-{d:02}T{hours:02}:{minutes:02}:{seconds:02}.{millis:03}Z")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_matches_known_vector() {
        let prehash = "2020-12-08T09:08:57.715ZGET/api/v5/account/balance";
        let sig = sign("SECRET", prehash).unwrap();
        assert_eq!(sig, "519+qeQjT10moKz7JoEYLMZiAhk4XUzZDY0+NfciSBU=");
    }

    #[test]
    fn login_sign_matches_known_vector() {
        let sig = sign("SECRET", "1538054050GET/users/self/verify").unwrap();
        assert_eq!(sig, "gD6ujK2XAWUnyDDnLsGM0iw03T3xzw5qGtVGwp84zpw=");
    }

    #[test]
    fn iso_format_known_instants() {
        assert_eq!(format_iso_millis(1_700_000_000, 715), "2023-11-14T22:13:20.715Z");
        // leap day
        assert_eq!(format_iso_millis(951_782_400, 0), "2000-02-29T00:00:00.000Z");
    }

    #[test]
    fn rest_headers_echo_key_and_passphrase() {
        let creds = Credentials::new("key".into(), "SECRET".into(), "phrase".into());
        let headers = creds.rest_headers("GET", "/api/v5/account/balance", "").unwrap();
        assert_eq!(headers.api_key, "key");
        assert_eq!(headers.passphrase, "phrase");
        assert!(headers.timestamp.ends_with('Z'));
        assert!(BASE64_STANDARD.decode(&headers.signature).is_ok());
    }

    #[test]
    fn debug_redacts_secret() {
        // Values must not collide with field names in the Debug output.
        let creds = Credentials::new("key".into(), "SECRET".into(), "hunter2".into());
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("SECRET"));
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
