//! Small shared helpers with no natural home in a single module.

use rand::Rng;

/// A URL-safe random token of `len` bytes of entropy, hex-encoded.
///
/// Used for tenant tokens and raw API keys — anywhere we need an opaque,
/// unguessable identifier that's also safe to embed directly in a URL path.
pub fn random_urlsafe(len: usize) -> String {
    let bytes: Vec<u8> = (0..len).map(|_| rand::thread_rng().gen()).collect();
    hex::encode(bytes)
}
