//! Bearer-token identity resolution
//!
//! The API authenticates requests by resolving the `Authorization: Bearer`
//! token to a user uid. Resolution is behind a trait so deployments can
//! plug in their token verifier; the built-in [`StaticTokenResolver`] maps
//! a fixed token table and serves development and tests.

use crate::{AppState, HttpError};
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::collections::HashMap;

/// Maps bearer tokens to user uids
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a token to a user uid, or `None` if the token is invalid
    async fn resolve(&self, token: &str) -> Option<String>;
}

/// Fixed token table, configured at startup
///
/// Tokens are opaque strings; each maps to one user uid. Roles are not
/// stored here, the services read them from the database per request.
#[derive(Debug, Default, Clone)]
pub struct StaticTokenResolver {
    tokens: HashMap<String, String>,
}

impl StaticTokenResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token for a user uid, builder style
    pub fn with_token(mut self, token: impl Into<String>, user_uid: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_uid.into());
        self
    }

    /// Parse a `token=uid,token=uid` table, as carried by `STIMMAP_TOKENS`
    ///
    /// Malformed entries are skipped.
    pub fn from_env_table(table: &str) -> Self {
        let mut resolver = Self::new();
        for entry in table.split(',') {
            if let Some((token, uid)) = entry.split_once('=') {
                let (token, uid) = (token.trim(), uid.trim());
                if !token.is_empty() && !uid.is_empty() {
                    resolver.tokens.insert(token.to_string(), uid.to_string());
                }
            }
        }
        resolver
    }
}

#[async_trait]
impl IdentityResolver for StaticTokenResolver {
    async fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}

/// Authenticated requester, extracted from the Authorization header
///
/// Rejects with 401 when the header is missing, not a bearer token, or the
/// token resolves to no user.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_uid: String,
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = HttpError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| HttpError::new("Missing bearer token", "NOT_AUTHORIZED"))?;

        let user_uid = state
            .identity
            .resolve(token)
            .await
            .ok_or_else(|| HttpError::new("Invalid bearer token", "NOT_AUTHORIZED"))?;

        Ok(AuthUser { user_uid })
    }
}
