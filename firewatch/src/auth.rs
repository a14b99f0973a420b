use axum::http::{header, HeaderMap};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::errors::{Error, Result};

/// Issued-token length, matching 32 random bytes of url-safe base64.
const TOKEN_LEN: usize = 43;

/// An authenticated caller. Opaque: gated handlers only care that one exists.
#[derive(Debug, Clone, Copy)]
pub struct Principal;

/// In-process bearer-token registry with per-token expiry.
pub struct TokenStore {
    tokens: Mutex<HashMap<String, i64>>,
    ttl_secs: i64,
}

impl TokenStore {
    pub fn new(ttl_secs: i64) -> Self {
        Self {
            tokens: Mutex::new(HashMap::new()),
            ttl_secs,
        }
    }

    /// Mints a fresh token, returning it with its lifetime in seconds.
    pub fn issue(&self, now: i64) -> (String, i64) {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LEN)
            .map(char::from)
            .collect();
        self.tokens
            .lock()
            .unwrap()
            .insert(token.clone(), now + self.ttl_secs);
        (token, self.ttl_secs)
    }

    /// Drops expired entries and reports whether `token` is live.
    pub fn verify(&self, token: &str, now: i64) -> bool {
        let mut tokens = self.tokens.lock().unwrap();
        tokens.retain(|_, expiry| *expiry > now);
        tokens.contains_key(token)
    }

    pub fn revoke(&self, token: &str) {
        self.tokens.lock().unwrap().remove(token);
    }
}

/// Extracts the token from a strict `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut parts = value.split_whitespace();
    let scheme = parts.next()?;
    let token = parts.next()?;
    if parts.next().is_some() || !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.to_string())
}

/// The admin gate. Header bearer token first; `query_token` is the
/// deliberate relaxation that lets the export endpoint work as a plain
/// download link. Rejection means the caller performed no side effect yet.
pub fn authorize(
    store: &TokenStore,
    headers: &HeaderMap,
    query_token: Option<&str>,
    now: i64,
) -> Result<Principal> {
    let token = bearer_token(headers)
        .or_else(|| query_token.map(str::to_string))
        .ok_or(Error::Unauthorized("missing token"))?;

    if store.verify(&token, now) {
        Ok(Principal)
    } else {
        Err(Error::Unauthorized("invalid or expired token"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        headers
    }

    #[test]
    fn issued_token_verifies_until_ttl() {
        let store = TokenStore::new(60);
        let (token, ttl) = store.issue(1_000);
        assert_eq!(ttl, 60);
        assert_eq!(token.len(), TOKEN_LEN);

        assert!(store.verify(&token, 1_000));
        assert!(store.verify(&token, 1_059));
        // expiry boundary: a token is dead once its expiry time arrives
        assert!(!store.verify(&token, 1_060));
    }

    #[test]
    fn revoked_token_stops_verifying() {
        let store = TokenStore::new(60);
        let (token, _) = store.issue(1_000);
        store.revoke(&token);
        assert!(!store.verify(&token, 1_000));
    }

    #[test]
    fn bearer_parsing_is_strict() {
        assert_eq!(
            bearer_token(&headers_with("Bearer abc123")),
            Some("abc123".to_string())
        );
        assert_eq!(
            bearer_token(&headers_with("bearer abc123")),
            Some("abc123".to_string())
        );
        assert_eq!(bearer_token(&headers_with("Basic abc123")), None);
        assert_eq!(bearer_token(&headers_with("Bearer")), None);
        assert_eq!(bearer_token(&headers_with("Bearer a b")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn authorize_accepts_header_or_query_token() {
        let store = TokenStore::new(60);
        let (token, _) = store.issue(1_000);

        let headers = headers_with(&format!("Bearer {token}"));
        assert!(authorize(&store, &headers, None, 1_000).is_ok());
        assert!(authorize(&store, &HeaderMap::new(), Some(&token), 1_000).is_ok());
    }

    #[test]
    fn authorize_rejects_missing_and_bogus_tokens() {
        let store = TokenStore::new(60);
        store.issue(1_000);

        assert!(matches!(
            authorize(&store, &HeaderMap::new(), None, 1_000),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            authorize(&store, &headers_with("Bearer nope"), None, 1_000),
            Err(Error::Unauthorized(_))
        ));
    }
}
