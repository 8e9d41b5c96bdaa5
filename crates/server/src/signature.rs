//! Slack request signature verification.
//!
//! Every inbound callback carries `x-slack-signature` and
//! `x-slack-request-timestamp` headers; the signature is an HMAC-SHA256 over
//! `v0:{timestamp}:{body}` keyed with the app's signing secret.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Reject requests whose timestamp is more than five minutes old.
const MAX_AGE_SECS: u64 = 300;
/// Tolerated clock skew for timestamps from the future.
const MAX_SKEW_SECS: u64 = 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("request is missing the `{0}` header")]
    MissingHeader(&'static str),
    #[error("request timestamp is not a unix timestamp")]
    MalformedTimestamp,
    #[error("request timestamp is outside the replay window")]
    StaleTimestamp,
    #[error("request signature does not match")]
    Mismatch,
}

/// Verify an inbound request against the signing secret.
pub fn verify(
    body: &str,
    timestamp: &str,
    signature: &str,
    signing_secret: &SecretString,
) -> Result<(), SignatureError> {
    let ts: u64 = timestamp.parse().map_err(|_| SignatureError::MalformedTimestamp)?;
    let now = unix_now();
    if now.saturating_sub(ts) > MAX_AGE_SECS || ts > now + MAX_SKEW_SECS {
        return Err(SignatureError::StaleTimestamp);
    }

    match compute(timestamp, body, signing_secret) {
        Some(expected) if expected == signature => Ok(()),
        _ => Err(SignatureError::Mismatch),
    }
}

/// Compute the `v0=<hex>` signature for a timestamp and body. Exposed so
/// tests can sign their own requests.
pub fn compute(timestamp: &str, body: &str, signing_secret: &SecretString) -> Option<String> {
    let mut mac =
        HmacSha256::new_from_slice(signing_secret.expose_secret().as_bytes()).ok()?;
    mac.update(format!("v0:{timestamp}:{body}").as_bytes());
    Some(format!("v0={}", hex::encode(mac.finalize().into_bytes())))
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}
