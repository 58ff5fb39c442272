/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! ID token claim extraction and normalization.
//!
//! **The ID token is NOT verified.** Neither the signature nor `iss`, `aud`
//! or `exp` are checked before the payload is trusted; the token is assumed
//! to have been validated by the identity service it was just fetched from.
//! Adding verification would reject tokens that are accepted today, so it
//! must be an explicit change.

use auth_types::responses::UserInfo;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use serde_json::{Map, Value};
use thiserror::Error;

/// Development ID token that yields [`IdentityClaims::mock`].
pub const MOCK_ID_TOKEN: &str = "mock_id_token";

/// ID token that is always rejected.
pub const INVALID_ID_TOKEN: &str = "dummy_id_token";

/// Claim names tried, in order, when `picture` is missing.
const PICTURE_FALLBACKS: [&str; 3] = ["avatar_url", "photo", "profile_image_url"];

/// Normalized identity of the signed-in user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityClaims {
    pub email: String,
    /// `name` when present, otherwise the local part of `email`, otherwise
    /// `subject`. Never empty.
    pub username: String,
    pub name: String,
    pub picture: String,
    /// Provider-scoped user id (`sub`).
    pub subject: String,
}

impl IdentityClaims {
    /// Fixed identity returned for [`MOCK_ID_TOKEN`].
    pub fn mock() -> Self {
        Self {
            email: "test@example.com".to_string(),
            username: "testuser".to_string(),
            name: "Test User".to_string(),
            picture: "https://via.placeholder.com/150".to_string(),
            subject: "mock-user-id-123".to_string(),
        }
    }
}

impl From<IdentityClaims> for UserInfo {
    fn from(claims: IdentityClaims) -> Self {
        Self {
            email: claims.email,
            username: claims.username,
            name: claims.name,
            picture: claims.picture,
            sub: claims.subject,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClaimsError {
    #[error("ID token is not accepted")]
    InvalidSentinel,

    #[error("invalid JWT format: expected 3 segments, found {segments}")]
    Format { segments: usize },

    #[error("failed to base64-decode JWT payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("failed to parse JWT claims: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("ID token carries no name, email local part, or subject")]
    MissingIdentity,
}

/// Decode the payload of `id_token` and normalize it into [`IdentityClaims`].
pub fn extract_claims(id_token: &str) -> Result<IdentityClaims, ClaimsError> {
    match id_token {
        MOCK_ID_TOKEN => {
            tracing::debug!("using mock ID token identity");
            return Ok(IdentityClaims::mock());
        }
        INVALID_ID_TOKEN => return Err(ClaimsError::InvalidSentinel),
        _ => {}
    }

    let segments: Vec<&str> = id_token.split('.').collect();
    if segments.len() != 3 {
        return Err(ClaimsError::Format {
            segments: segments.len(),
        });
    }

    let payload = decode_segment(segments[1])?;
    let claims: Map<String, Value> = serde_json::from_slice(&payload)?;

    tracing::warn!(
        "ID token payload accepted without signature, issuer, audience, or expiry verification"
    );

    normalize(&claims)
}

/// Base64url-decode a JWT segment, restoring the `=` padding JWTs strip.
fn decode_segment(segment: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let mut padded = segment.to_string();
    let remainder = padded.len() % 4;
    if remainder != 0 {
        padded.push_str(&"=".repeat(4 - remainder));
    }
    URL_SAFE.decode(padded)
}

fn string_claim(claims: &Map<String, Value>, key: &str) -> Option<String> {
    claims.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn normalize(claims: &Map<String, Value>) -> Result<IdentityClaims, ClaimsError> {
    let email = string_claim(claims, "email").unwrap_or_default();
    let mut name = string_claim(claims, "name").unwrap_or_default();
    let mut picture = string_claim(claims, "picture").unwrap_or_default();
    let subject = string_claim(claims, "sub").unwrap_or_default();

    if name.is_empty() {
        let given = string_claim(claims, "given_name");
        let family = string_claim(claims, "family_name");
        if given.is_some() || family.is_some() {
            name = format!(
                "{} {}",
                given.unwrap_or_default(),
                family.unwrap_or_default()
            )
            .trim()
            .to_string();
        }
    }

    if picture.is_empty() {
        if let Some(fallback) = PICTURE_FALLBACKS
            .iter()
            .find_map(|key| string_claim(claims, key))
        {
            picture = fallback;
        }
    }

    let local_part = email.split('@').next().unwrap_or_default();
    let username = [name.as_str(), local_part, subject.as_str()]
        .into_iter()
        .find(|candidate| !candidate.is_empty())
        .ok_or(ClaimsError::MissingIdentity)?
        .to_string();

    Ok(IdentityClaims {
        email,
        username,
        name,
        picture,
        subject,
    })
}
