//! Signed-ingress verification.
//!
//! Providers sign the exact bytes on the wire — `HMAC-SHA256(secret,
//! "<unix_ts>.<raw_body>")` — and send the result in a header of the form
//! `t=<unix_ts>,v1=<hex>`. Verification MUST run against those raw bytes;
//! any JSON re-serialization before the MAC check would silently break
//! interoperability with providers that don't round-trip field order.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Default tolerance window (seconds) for the `t=` timestamp.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    MalformedHeader,
    #[error("timestamp outside tolerance")]
    TimestampOutOfTolerance,
    #[error("signature mismatch")]
    BadSignature,
}

struct ParsedHeader {
    timestamp: i64,
    signature: String,
}

fn parse_header(header: &str) -> Result<ParsedHeader, SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut signature: Option<String> = None;

    for pair in header.split(',') {
        let mut kv = pair.splitn(2, '=');
        let key = kv.next().unwrap_or("").trim();
        let value = kv.next().unwrap_or("").trim();
        match key {
            "t" => timestamp = value.parse::<i64>().ok(),
            "v1" => signature = Some(value.to_string()),
            _ => {} // unknown pairs are ignored
        }
    }

    match (timestamp, signature) {
        (Some(t), Some(v1)) if !v1.is_empty() => Ok(ParsedHeader {
            timestamp: t,
            signature: v1.to_lowercase(),
        }),
        _ => Err(SignatureError::MalformedHeader),
    }
}

fn hmac_hex(secret: &str, signed_payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts a key of any length");
    mac.update(signed_payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies `raw_body` against `header` using `secret`, with `now` injected
/// by the caller so the check is deterministic under test. `tolerance`
/// defaults to [`DEFAULT_TOLERANCE_SECS`] when `None`.
pub fn verify(
    raw_body: &[u8],
    header: &str,
    secret: &str,
    now: i64,
    tolerance: Option<i64>,
) -> Result<(), SignatureError> {
    let parsed = parse_header(header)?;
    let tolerance = tolerance.unwrap_or(DEFAULT_TOLERANCE_SECS);

    if (now - parsed.timestamp).abs() > tolerance {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let mut signed_payload = parsed.timestamp.to_string().into_bytes();
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(raw_body);

    let expected = hmac_hex(secret, &signed_payload);

    // Constant-time compare over equal-length byte slices. Hex digests of a
    // fixed-width MAC are always the same length, so this never leaks
    // length information either.
    let matches: bool = expected.as_bytes().ct_eq(parsed.signature.as_bytes()).into();
    if !matches {
        return Err(SignatureError::BadSignature);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, ts: i64, body: &[u8]) -> String {
        let mut payload = ts.to_string().into_bytes();
        payload.push(b'.');
        payload.extend_from_slice(body);
        format!("t={},v1={}", ts, hmac_hex(secret, &payload))
    }

    #[test]
    fn accepts_valid_signature() {
        let body = br#"{"id":"evt_1","event":"payment.succeeded"}"#;
        let header = sign("whsec_test", 1_000_000, body);
        assert_eq!(verify(body, &header, "whsec_test", 1_000_000, None), Ok(()));
    }

    #[test]
    fn rejects_tampered_body() {
        let body = br#"{"id":"evt_1","event":"payment.succeeded"}"#;
        let header = sign("whsec_test", 1_000_000, body);
        let tampered = br#"{"id":"evt_1","event":"payment.failed"}"#;
        assert_eq!(
            verify(tampered, &header, "whsec_test", 1_000_000, None),
            Err(SignatureError::BadSignature)
        );
    }

    #[test]
    fn rejects_wrong_secret() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign("whsec_test", 1_000_000, body);
        assert_eq!(
            verify(body, &header, "whsec_other", 1_000_000, None),
            Err(SignatureError::BadSignature)
        );
    }

    #[test]
    fn accepts_timestamp_exactly_at_tolerance_boundary() {
        let body = b"{}";
        let header = sign("s", 1_000_000, body);
        assert_eq!(verify(body, &header, "s", 1_000_300, None), Ok(()));
    }

    #[test]
    fn rejects_timestamp_one_second_past_tolerance() {
        let body = b"{}";
        let header = sign("s", 1_000_000, body);
        assert_eq!(
            verify(body, &header, "s", 1_000_301, None),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn rejects_malformed_header_missing_t() {
        let header = "v1=abcd";
        assert_eq!(
            verify(b"{}", header, "s", 0, None),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn rejects_malformed_header_missing_v1() {
        let header = "t=1000000";
        assert_eq!(
            verify(b"{}", header, "s", 1_000_000, None),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn rejects_non_integer_timestamp() {
        let header = "t=notanumber,v1=abcd";
        assert_eq!(
            verify(b"{}", header, "s", 0, None),
            Err(SignatureError::MalformedHeader)
        );
    }

    #[test]
    fn ignores_unknown_pairs_in_header() {
        let body = b"{}";
        let base = sign("s", 1_000_000, body);
        let header = format!("{},extra=ignored", base);
        assert_eq!(verify(body, &header, "s", 1_000_000, None), Ok(()));
    }

    #[test]
    fn signature_hex_comparison_is_case_insensitive() {
        let body = b"{}";
        let base = sign("s", 1_000_000, body);
        let (prefix, hex) = base.split_once("v1=").unwrap();
        let header = format!("{}v1={}", prefix, hex.to_uppercase());
        assert_eq!(verify(body, &header, "s", 1_000_000, None), Ok(()));
    }
}
