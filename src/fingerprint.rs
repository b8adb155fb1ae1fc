//! Fingerprinter — the sole deduplication key.
//!
//! Operates on the exact bytes that already passed signature verification.
//! Any re-encoding here (e.g. re-serializing the parsed JSON) would produce a
//! fingerprint that no longer matches what was actually signed.

use sha2::{Digest, Sha256};

/// `fingerprint(raw) = lowercase_hex(sha256(raw))`.
pub fn fingerprint(raw_body: &[u8]) -> String {
    hex::encode(Sha256::digest(raw_body))
}

/// The deterministic blob-store key for an event: `<tenant_id>/<fingerprint>.json`.
pub fn blob_key(tenant_id: &uuid::Uuid, fingerprint: &str) -> String {
    format!("{}/{}.json", tenant_id, fingerprint)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_known_sha256_vector() {
        // sha256("") = e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        assert_eq!(
            fingerprint(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn is_deterministic() {
        let body = br#"{"id":"evt_1"}"#;
        assert_eq!(fingerprint(body), fingerprint(body));
    }

    #[test]
    fn differs_on_single_byte_change() {
        assert_ne!(fingerprint(b"a"), fingerprint(b"b"));
    }

    #[test]
    fn blob_key_matches_scheme() {
        let id = uuid::Uuid::nil();
        assert_eq!(
            blob_key(&id, "abc123"),
            "00000000-0000-0000-0000-000000000000/abc123.json"
        );
    }
}
