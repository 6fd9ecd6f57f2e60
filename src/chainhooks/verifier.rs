//! HMAC signature verification for inbound chainhook deliveries

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::debug;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the delivery signature
pub const SIGNATURE_HEADER: &str = "x-chainhook-signature";

/// Prefix of the signature header value
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Compute the signature header value for a raw body.
pub fn sign_payload(raw_body: &[u8], secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(raw_body);
    format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

/// Check a signature header against the raw body.
///
/// Returns true only when the header is present and equals
/// `sha256=<hex(HMAC-SHA256(secret, raw_body))>`. The comparison runs in
/// constant time with respect to the header contents.
pub fn verify_signature(raw_body: &[u8], signature: Option<&str>, secret: &str) -> bool {
    let Some(signature) = signature else {
        return false;
    };

    let expected = sign_payload(raw_body, secret);
    constant_time_eq(signature.as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    // Pad both sides to the same length with different fill bytes so that a
    // length mismatch can never compare equal.
    let max_len = a.len().max(b.len());
    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a);
    b_padded[..b.len()].copy_from_slice(b);

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);
    (lengths_equal & contents_equal).into()
}

/// Verifies deliveries with the configured shared secret.
///
/// A verifier without a secret accepts every request.
pub struct WebhookVerifier {
    secret: Option<SecretString>,
}

impl WebhookVerifier {
    /// Create a verifier; an empty secret disables verification
    pub fn new(secret: Option<SecretString>) -> Self {
        let secret = secret.filter(|s| !s.expose_secret().is_empty());
        if secret.is_none() {
            debug!("No webhook secret configured, signature verification disabled");
        }
        Self { secret }
    }

    /// Create a verifier from an optional plain string secret
    pub fn from_secret(secret: Option<&str>) -> Self {
        Self::new(secret.map(|s| SecretString::from(s.to_string())))
    }

    /// Verifier that accepts every request
    pub fn disabled() -> Self {
        Self { secret: None }
    }

    /// Whether a secret is configured
    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Verify a delivery; always true when verification is disabled
    pub fn verify(&self, raw_body: &[u8], signature: Option<&str>) -> bool {
        match &self.secret {
            Some(secret) => verify_signature(raw_body, signature, secret.expose_secret()),
            None => true,
        }
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
