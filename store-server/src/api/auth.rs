//! Bearer-token auth extractor
//!
//! Resolves the Authorization header through the session gate and rejects
//! non-active accounts before any handler logic runs.

use axum::{extract::FromRequestParts, http::request::Parts};
use shared::error::{AppError, ErrorCode};
use shared::models::{AccountStatus, Identity};

use crate::core::ServerState;

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Identity);

impl CurrentUser {
    pub fn identity(&self) -> &Identity {
        &self.0
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    header.strip_prefix("Bearer ").map(str::trim)
}

impl FromRequestParts<ServerState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        // Reuse a previous extraction on the same request
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let token = parts
            .headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(AppError::unauthorized)?;

        let identity = state
            .sessions
            .resolve(token)
            .await?
            .ok_or_else(|| AppError::new(ErrorCode::SessionInvalid))?;

        match identity.status {
            AccountStatus::Active => {}
            AccountStatus::Suspended => {
                tracing::warn!(user_id = %identity.id, "Suspended account rejected");
                return Err(AppError::new(ErrorCode::AccountSuspended));
            }
            AccountStatus::Banned => {
                tracing::warn!(user_id = %identity.id, "Banned account rejected");
                return Err(AppError::new(ErrorCode::AccountBanned));
            }
        }

        let user = CurrentUser(identity);
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// Admin-only extractor; wraps [`CurrentUser`] with a role check
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

impl FromRequestParts<ServerState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &ServerState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(identity) = CurrentUser::from_request_parts(parts, state).await?;
        if !identity.is_admin() {
            return Err(AppError::new(ErrorCode::AdminRequired));
        }
        Ok(AdminUser(identity))
    }
}
