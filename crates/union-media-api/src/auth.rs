use std::sync::Arc;

use axum::http::HeaderMap;
use reqwest::StatusCode;
use serde::Deserialize;
use union_media_core::util::sanitize;

use crate::config::AppConfig;
use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

/// Exchanges bearer tokens for user identities with the hosted auth service.
///
/// Any signed-in session passes; row-level policies in the database decide
/// what that user may change.
#[derive(Debug, Clone)]
pub struct SupabaseSessionVerifier {
    client: reqwest::Client,
    config: Arc<AppConfig>,
}

impl SupabaseSessionVerifier {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Runs the whole gate: header extraction, then session verification.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, AppError> {
        let token = extract_bearer_token(headers)?;
        self.verify_access_token(token).await
    }

    pub async fn verify_access_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let response = self
            .client
            .get(&self.config.supabase_user_url)
            .bearer_auth(token)
            .header("apikey", &self.config.supabase_anon_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| {
                AppError::unauthorized(format!(
                    "Session verification request failed: {}",
                    sanitize(&error)
                ))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(AppError::unauthorized("Invalid or expired session"));
        }
        if !status.is_success() {
            return Err(AppError::unauthorized(format!(
                "Session verification failed with HTTP {}",
                status.as_u16()
            )));
        }

        let user = response.json::<SessionUser>().await.map_err(|error| {
            AppError::unauthorized(format!(
                "Session verification response parse failed: {}",
                sanitize(&error)
            ))
        })?;

        let user_id = user
            .id
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::unauthorized("Session does not resolve to a user"))?;

        Ok(AuthenticatedUser { user_id })
    }
}

pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| AppError::unauthorized("Missing Authorization header"))?
        .to_str()
        .map_err(|_| AppError::unauthorized("Authorization header is not valid UTF-8"))?;

    let (scheme, token) = header
        .split_once(' ')
        .ok_or_else(|| AppError::unauthorized("Authorization header must be `Bearer <token>`"))?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(AppError::unauthorized(
            "Authorization scheme must be `Bearer`",
        ));
    }
    let token = token.trim();
    if token.is_empty() {
        return Err(AppError::unauthorized("Bearer token is empty"));
    }

    Ok(token)
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    id: Option<String>,
}
