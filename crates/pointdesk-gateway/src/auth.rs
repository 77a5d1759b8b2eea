use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use pointdesk_core::{DeskError, EntityId, Principal, Role};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ApiError;
use crate::routes::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Login of the employee.
    pub sub: String,
    pub employee_id: EntityId,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
}

/// Issues and checks HS256 session tokens.
#[derive(Clone)]
pub struct TokenSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_minutes: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(
        &self,
        principal: &Principal,
    ) -> Result<(String, DateTime<Utc>), jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: principal.login.clone(),
            employee_id: principal.employee_id,
            role: principal.role,
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;
        Ok((token, expires_at))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["sub", "exp"]);
        Ok(decode::<Claims>(token, &self.decoding_key, &validation)?.claims)
    }
}

/// The signed-in employee, reloaded from the store on every request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Principal);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError(DeskError::Authentication))?;

        let claims = state.tokens.verify(token).map_err(|err| {
            warn!("rejected token for {}: {err}", parts.uri);
            ApiError(DeskError::Authentication)
        })?;

        // A deleted or renamed employee loses access immediately.
        let employee = match state.desk.employee(claims.employee_id).await {
            Ok(employee) if employee.login == claims.sub => employee,
            Ok(_) | Err(DeskError::NotFound { .. }) => {
                return Err(ApiError(DeskError::Authentication));
            }
            Err(err) => return Err(err.into()),
        };

        let user = AuthUser(Principal::from_employee(&employee));
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

/// An [`AuthUser`] holding the ADMIN role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Principal);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(principal) = AuthUser::from_request_parts(parts, state).await?;
        if let Err(err) = principal.require_admin() {
            warn!("{} denied admin access to {}", principal.login, parts.uri);
            return Err(err.into());
        }
        Ok(AdminUser(principal))
    }
}
