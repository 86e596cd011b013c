//! Inbound webhook signature verification for the voice/SMS channel
//! adapters: an HMAC-SHA256 check against the provider's shared secret.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::{ChannelError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Verify an `X-Hub-Signature-256`-style `sha256=<hex>` header against the
/// raw request body, using the tenant's configured webhook signing secret
/// (`receptionist_core::config::GatewayConfig::webhook_signing_secret`).
pub fn verify_hmac_sha256(signature_header: Option<&str>, body: &[u8], secret: Option<&str>) -> Result<()> {
    let secret = secret.ok_or_else(|| ChannelError::SignatureInvalid("no webhook secret configured".to_string()))?;

    let header = signature_header
        .ok_or_else(|| ChannelError::SignatureInvalid("missing signature header".to_string()))?;

    let sig_hex = header
        .strip_prefix("sha256=")
        .ok_or_else(|| ChannelError::SignatureInvalid("malformed signature header".to_string()))?;

    let expected = hex::decode(sig_hex)
        .map_err(|_| ChannelError::SignatureInvalid("signature is not valid hex".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| ChannelError::SignatureInvalid("invalid HMAC key length".to_string()))?;
    mac.update(body);

    mac.verify_slice(&expected)
        .map_err(|_| ChannelError::SignatureInvalid("signature mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hmac::Mac;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_a_correctly_signed_body() {
        let body = br#"{"CallSid":"CA1"}"#;
        let header = sign("wh-secret", body);
        assert!(verify_hmac_sha256(Some(&header), body, Some("wh-secret")).is_ok());
    }

    #[test]
    fn rejects_a_tampered_body() {
        let body = br#"{"CallSid":"CA1"}"#;
        let header = sign("wh-secret", body);
        let tampered = br#"{"CallSid":"CA2"}"#;
        assert!(verify_hmac_sha256(Some(&header), tampered, Some("wh-secret")).is_err());
    }

    #[test]
    fn rejects_when_no_secret_is_configured() {
        let body = b"anything";
        assert!(verify_hmac_sha256(Some("sha256=00"), body, None).is_err());
    }

    #[test]
    fn rejects_missing_header() {
        assert!(verify_hmac_sha256(None, b"x", Some("secret")).is_err());
    }
}
