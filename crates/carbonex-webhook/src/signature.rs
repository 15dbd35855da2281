//! Payment provider signature verification.
//!
//! The provider signs `"{t}.{raw_body}"` with HMAC-SHA256 under the shared
//! secret and sends `t=<unix_seconds>,v1=<hex>[,v1=<hex>...]`. Several
//! `v1` entries appear while the provider rotates secrets; any one
//! matching is enough. The timestamp must then lie within the replay
//! window of the receiver's clock.

use carbonex_types::{CarbonexError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Parsed `t=...,v1=...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Timestamp exactly as sent; it is part of the signed payload.
    pub timestamp_raw: String,
    pub timestamp: i64,
    /// Hex-encoded `v1` signatures, in header order.
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parse a signature header. Unknown keys and malformed parts are skipped.
    ///
    /// # Errors
    /// `MissingSignature` for an empty header; `MalformedSignatureHeader`
    /// if there is no usable `t` or no `v1`.
    pub fn parse(header: &str) -> Result<Self> {
        if header.trim().is_empty() {
            return Err(CarbonexError::MissingSignature);
        }
        let mut timestamp_raw = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp_raw = Some(value.to_string()),
                "v1" => signatures.push(value.to_string()),
                _ => {}
            }
        }
        let timestamp_raw = timestamp_raw.ok_or(CarbonexError::MalformedSignatureHeader)?;
        if signatures.is_empty() {
            return Err(CarbonexError::MalformedSignatureHeader);
        }
        let timestamp = timestamp_raw
            .parse()
            .map_err(|_| CarbonexError::MalformedSignatureHeader)?;
        Ok(Self {
            timestamp_raw,
            timestamp,
            signatures,
        })
    }
}

/// Verifies provider signatures with a shared secret.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: Vec<u8>,
    tolerance_secs: i64,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish()
    }
}

impl SignatureVerifier {
    /// # Errors
    /// `Configuration` if the secret is empty or the tolerance is not positive.
    pub fn new(secret: &str, tolerance_secs: i64) -> Result<Self> {
        if secret.is_empty() {
            return Err(CarbonexError::Configuration(
                "webhook signing secret is empty".into(),
            ));
        }
        if tolerance_secs <= 0 {
            return Err(CarbonexError::Configuration(
                "webhook tolerance must be positive".into(),
            ));
        }
        Ok(Self {
            secret: secret.as_bytes().to_vec(),
            tolerance_secs,
        })
    }

    /// Check `header` against `body` at time `now` (unix seconds).
    ///
    /// Returns the signed timestamp.
    ///
    /// # Errors
    /// `MissingSignature`, `MalformedSignatureHeader`, `SignatureMismatch`
    /// or `TimestampOutsideTolerance`.
    pub fn verify(&self, body: &[u8], header: Option<&str>, now: i64) -> Result<i64> {
        let header = SignatureHeader::parse(header.unwrap_or_default())?;
        let mac = self.mac(&header.timestamp_raw, body)?;

        let matched = header
            .signatures
            .iter()
            .filter_map(|sig| hex::decode(sig).ok())
            .any(|sig| mac.clone().verify_slice(&sig).is_ok());
        if !matched {
            return Err(CarbonexError::SignatureMismatch);
        }

        let skew = now.saturating_sub(header.timestamp);
        if skew.saturating_abs() > self.tolerance_secs {
            return Err(CarbonexError::TimestampOutsideTolerance { skew_secs: skew });
        }
        Ok(header.timestamp)
    }

    /// Hex signature of `body` at `timestamp`, as the provider computes it.
    ///
    /// # Errors
    /// `Internal` if the MAC cannot be keyed.
    pub fn sign(&self, timestamp: i64, body: &[u8]) -> Result<String> {
        let mac = self.mac(&timestamp.to_string(), body)?;
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// A complete `t=...,v1=...` header for `body` at `timestamp`.
    ///
    /// # Errors
    /// `Internal` if the MAC cannot be keyed.
    pub fn header_for(&self, timestamp: i64, body: &[u8]) -> Result<String> {
        Ok(format!("t={timestamp},v1={}", self.sign(timestamp, body)?))
    }

    fn mac(&self, timestamp: &str, body: &[u8]) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|e| CarbonexError::Internal(format!("hmac key: {e}")))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }
}
