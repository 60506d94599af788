//! Signed session cookie.
//!
//! Value format: `{session_id}.{base64url(hmac_sha256(session_id))}`. Only the
//! id travels to the browser; the session contents stay server-side.

use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";

fn mac_for(secret: &str) -> anyhow::Result<HmacSha256> {
    <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow::anyhow!("invalid session key: {e}"))
}

pub fn sign_session_id(id: Uuid, secret: &str) -> anyhow::Result<String> {
    let payload = id.to_string();
    let mut mac = mac_for(secret)?;
    mac.update(payload.as_bytes());
    let signature = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
    Ok(format!("{}.{}", payload, signature))
}

/// Returns the session id if the cookie value carries a valid signature.
pub fn verify_session_cookie(value: &str, secret: &str) -> Option<Uuid> {
    let (payload, signature_b64) = value.split_once('.')?;
    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .ok()?;

    let mut mac = mac_for(secret).ok()?;
    mac.update(payload.as_bytes());
    mac.verify_slice(&signature).ok()?;

    Uuid::parse_str(payload).ok()
}
