//! Webhook signatures
//!
//! NetBox signs the raw request body with HMAC-SHA512 and sends the hex
//! digest in `X-Hook-Signature`.

use ring::hmac;

/// Header carrying the body signature
pub const SIGNATURE_HEADER: &str = "x-hook-signature";

/// Shared secret configured on the NetBox webhook
pub struct WebhookSecret {
    key: hmac::Key,
}

impl WebhookSecret {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: hmac::Key::new(hmac::HMAC_SHA512, secret.as_ref()),
        }
    }

    /// Hex signature of `body`, as NetBox computes it
    pub fn sign(&self, body: &[u8]) -> String {
        hex::encode(hmac::sign(&self.key, body).as_ref())
    }

    /// Check a hex signature against `body` in constant time
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        match hex::decode(signature.trim()) {
            Ok(tag) => hmac::verify(&self.key, body, &tag).is_ok(),
            Err(_) => false,
        }
    }
}

// Custom Debug implementation that hides the key
impl std::fmt::Debug for WebhookSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("WebhookSecret(<REDACTED>)")
    }
}
