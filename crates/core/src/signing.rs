//! Webhook HMAC signing and verification.
//!
//! Two inbound channels are authenticated here:
//!
//! - **Payment confirmations** carry a `Payment-Signature` header of the form
//!   `t=<unix seconds>,v1=<hex>` where the signature is
//!   HMAC-SHA256 over `"{t}.{body}"`. Signatures older than the tolerance
//!   window are rejected to stop replays of captured requests.
//! - **Print provider notifications** carry `X-Rpi-Signature: <hex>`, an
//!   HMAC-SHA256 over the raw body.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the payment confirmation signature.
pub const PAYMENT_SIGNATURE_HEADER: &str = "payment-signature";

/// Header carrying the print provider notification signature.
pub const PROVIDER_SIGNATURE_HEADER: &str = "x-rpi-signature";

/// Maximum age of a payment signature timestamp (seconds).
pub const DEFAULT_SIGNATURE_TOLERANCE_SECS: i64 = 300;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("Signature header is missing or malformed")]
    Malformed,

    #[error("Signature timestamp is outside the tolerance window")]
    Stale,

    #[error("Signature does not match payload")]
    Mismatch,
}

// ---------------------------------------------------------------------------
// Raw HMAC
// ---------------------------------------------------------------------------

/// Compute a hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn compute_hmac_hex(secret: &str, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a hex-encoded HMAC-SHA256 in constant time.
pub fn verify_hmac_hex(secret: &str, payload: &[u8], signature_hex: &str) -> bool {
    let Some(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

// ---------------------------------------------------------------------------
// Payment confirmation signatures
// ---------------------------------------------------------------------------

/// Parsed `t=...,v1=...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSignature {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

impl PaymentSignature {
    /// Parse the header value. Unknown keys are ignored; at least one `v1`
    /// entry and exactly one `t` entry are required.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part.trim().split_once('=').ok_or(SignatureError::Malformed)?;
            match key {
                "t" => {
                    if timestamp.is_some() {
                        return Err(SignatureError::Malformed);
                    }
                    timestamp = Some(value.parse().map_err(|_| SignatureError::Malformed)?);
                }
                "v1" => signatures.push(value.to_string()),
                _ => {}
            }
        }

        match timestamp {
            Some(timestamp) if !signatures.is_empty() => Ok(Self {
                timestamp,
                signatures,
            }),
            _ => Err(SignatureError::Malformed),
        }
    }
}

fn signed_payload(timestamp: i64, body: &[u8]) -> Vec<u8> {
    let mut payload = format!("{timestamp}.").into_bytes();
    payload.extend_from_slice(body);
    payload
}

/// Build a `Payment-Signature` header value for `body` at `timestamp`.
pub fn sign_payment_payload(secret: &str, timestamp: i64, body: &[u8]) -> String {
    let sig = compute_hmac_hex(secret, &signed_payload(timestamp, body));
    format!("t={timestamp},v1={sig}")
}

/// Verify a payment confirmation against its header at time `now`
/// (unix seconds).
pub fn verify_payment_signature(
    secret: &str,
    header: &str,
    body: &[u8],
    now: i64,
    tolerance_secs: i64,
) -> Result<(), SignatureError> {
    let parsed = PaymentSignature::parse(header)?;
    if (now - parsed.timestamp).abs() > tolerance_secs {
        return Err(SignatureError::Stale);
    }

    let payload = signed_payload(parsed.timestamp, body);
    if parsed
        .signatures
        .iter()
        .any(|sig| verify_hmac_hex(secret, &payload, sig))
    {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Verify a print provider notification body against `X-Rpi-Signature`.
pub fn verify_provider_signature(
    secret: &str,
    header: &str,
    body: &[u8],
) -> Result<(), SignatureError> {
    if header.trim().is_empty() {
        return Err(SignatureError::Malformed);
    }
    if verify_hmac_hex(secret, body, header) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

// ---------------------------------------------------------------------------
// hex helpers (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string; `None` on odd length or non-hex characters.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
