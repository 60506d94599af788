use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use rand::{rngs::OsRng, RngCore};
use regex::Regex;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};

use crate::{
    auth::provider::{IdentityClaims, IdentityProvider},
    db::{NewUser, Store, StoreError, User},
    error::AppError,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Email from the claims, normalized. Missing or malformed email is an
/// authentication failure: no account is ever keyed on anything else.
pub fn claimed_email(claims: &IdentityClaims) -> Result<String, AppError> {
    let email = claims
        .email
        .as_deref()
        .map(|e| e.trim().to_lowercase())
        .ok_or(AppError::Unauthenticated)?;
    if !is_valid_email(&email) {
        warn!(email = %email, "provider returned malformed email");
        return Err(AppError::Unauthenticated);
    }
    Ok(email)
}

/// 16 random bytes, URL-safe base64 without padding.
pub fn generate_state_token() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Both sides must be present and identical byte for byte. Constant time in
/// the token contents.
pub fn states_match(stored: Option<&str>, received: Option<&str>) -> bool {
    match (stored, received) {
        (Some(stored), Some(received)) => {
            stored.len() == received.len()
                && bool::from(stored.as_bytes().ct_eq(received.as_bytes()))
        }
        _ => false,
    }
}

/// Returns the user for the claimed email, creating it on first login.
///
/// The pre-check is only a fast path. Two callbacks racing on a new email both
/// reach the insert; the unique constraint rejects the loser, which then reads
/// the winner's row. A conflict on the provider subject alone returns the
/// account already linked to that subject.
pub async fn upsert_oauth_user(
    store: &dyn Store,
    claims: &IdentityClaims,
) -> Result<User, AppError> {
    let email = claimed_email(claims)?;

    if let Some(user) = store.find_user_by_email(&email).await? {
        debug!(user_id = user.id, "existing user");
        return Ok(user);
    }

    match store
        .create_user(NewUser::from_oauth(&email, claims.sub.as_deref()))
        .await
    {
        Ok(user) => {
            info!(user_id = user.id, email = %user.email, "user created on first login");
            Ok(user)
        }
        Err(StoreError::Conflict) => {
            debug!(email = %email, "lost insert race; re-reading user");
            if let Some(user) = store.find_user_by_email(&email).await? {
                return Ok(user);
            }
            // Not an email race: the subject is already linked to another address.
            if let Some(subject) = claims.sub.as_deref() {
                if let Some(user) = store.find_user_by_oauth_id(subject).await? {
                    warn!(
                        user_id = user.id,
                        claimed = %email,
                        stored = %user.email,
                        "provider subject already linked to a different email"
                    );
                    return Ok(user);
                }
            }
            warn!(email = %email, "user insert conflicted with no matching account");
            Err(AppError::Unauthenticated)
        }
        Err(e) => Err(e.into()),
    }
}

/// Resolves a bearer token to a known user. Every failure is `Unauthenticated`.
pub async fn resolve_from_token(
    store: &dyn Store,
    provider: &dyn IdentityProvider,
    token: &str,
) -> Result<User, AppError> {
    let claims = match provider.verify_token(token).await {
        Ok(c) => c,
        Err(e) => {
            warn!(error = %e, "token verification failed");
            return Err(AppError::Unauthenticated);
        }
    };
    let email = claimed_email(&claims)?;

    match store.find_user_by_email(&email).await? {
        Some(user) => Ok(user),
        None => {
            warn!(email = %email, "token valid but no user for email");
            Err(AppError::Unauthenticated)
        }
    }
}
