use axum::http;
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config;
use crate::models::UserIdentity;

/// Pull the bearer credential out of the handshake, if any.
///
/// Checked in order: `Authorization` header, `auth_token` cookie, `token`
/// query parameter. The query parameter exists because browsers cannot set
/// headers on a WebSocket upgrade.
pub fn handshake_token(
    headers: &http::HeaderMap,
    query: &HashMap<String, String>,
) -> Option<String> {
    if let Some(auth_header) = headers.get(http::header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            return Some(
                auth_str
                    .strip_prefix("Bearer ")
                    .unwrap_or(auth_str)
                    .to_string(),
            );
        }
    }

    if let Some(cookie_header) = headers.get(http::header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie::Cookie::split_parse(cookie_str).flatten() {
                if cookie.name() == "auth_token" {
                    return Some(cookie.value().to_string());
                }
            }
        }
    }

    query.get("token").cloned()
}

/// Resolve a credential into a caller identity.
///
/// Absent, malformed, expired or wrongly-signed tokens all degrade to the
/// guest identity. Presence and viewing are open; mutation authorization
/// happens at the document-service boundary, so a failed credential must
/// never reject the underlying connection.
pub fn resolve_identity(token: Option<&str>) -> UserIdentity {
    resolve_with_secret(token, config::get_config().jwt_secret.as_deref())
}

pub fn resolve_with_secret(token: Option<&str>, secret: Option<&str>) -> UserIdentity {
    let Some(token) = token else {
        return UserIdentity::guest();
    };
    let Some(secret) = secret else {
        warn!("No JWT secret configured; treating connection as guest");
        return UserIdentity::guest();
    };

    match validate_jwt(token, secret) {
        Ok(token_data) => {
            let claims = token_data.claims;
            let id = claims
                .get("sub")
                .or_else(|| claims.get("id"))
                .and_then(claim_as_string);
            match id {
                Some(id) => {
                    let name = claims
                        .get("name")
                        .and_then(|v| v.as_str())
                        .unwrap_or("Unknown User")
                        .to_string();
                    debug!("Token validated for user: {}", id);
                    UserIdentity { id, name }
                }
                None => {
                    warn!("Token carries no subject claim; treating connection as guest");
                    UserIdentity::guest()
                }
            }
        }
        Err(e) => {
            warn!("JWT verification failed: {}; treating connection as guest", e);
            UserIdentity::guest()
        }
    }
}

/// Validate a JWT token and return the token data
pub fn validate_jwt(
    token: &str,
    secret: &str,
) -> Result<TokenData<serde_json::Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<serde_json::Value>(token, &decoding_key, &validation)
}

fn claim_as_string(value: &serde_json::Value) -> Option<String> {
    value
        .as_str()
        .map(str::to_string)
        .or_else(|| value.as_i64().map(|n| n.to_string()))
}
