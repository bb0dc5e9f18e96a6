use std::fmt;

use base64::{
    Engine,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const DEFAULT_COOKIE_MAX_AGE: i64 = 60 * 60 * 24 * 7;
pub const EXPIRED_COOKIE_MAX_AGE: i64 = 60 * 60;

const JWT_PAYLOAD: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Deserialize)]
struct Claims {
    exp: i64,
}

/// Bearer token issued by the upstream API. Opaque apart from the JWT `exp` claim.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Anything that is not a JWT with a numeric `exp` counts as expired.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expiry() {
            Some(exp) => exp < now.timestamp(),
            None => true,
        }
    }

    fn expiry(&self) -> Option<i64> {
        let payload = self.0.split('.').nth(1)?;
        let bytes = JWT_PAYLOAD.decode(payload).ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;

        Some(claims.exp)
    }
}

// Keeps tokens out of logs.
impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(..)")
    }
}

/// Lifetime in seconds of the login cookie, from the upstream `expiresAt`.
pub fn cookie_max_age(expires_at: Option<&str>, now: DateTime<Utc>) -> i64 {
    let Some(expiry) = expires_at.and_then(|raw| DateTime::parse_from_rfc3339(raw).ok()) else {
        return DEFAULT_COOKIE_MAX_AGE;
    };

    let seconds = (expiry.with_timezone(&Utc) - now).num_seconds();
    if seconds > 0 {
        seconds
    } else {
        EXPIRED_COOKIE_MAX_AGE
    }
}
