//! Authentication and authorization.
//!
//! Bearer JWTs are validated by middleware and turned into a request-scoped
//! [`AuthUser`] carried in request extensions. Back-office access is gated by
//! an ordered [`ClearanceLevel`] rather than string comparison, so a manager
//! clears every staff-gated route by construction.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Admin permission tier. Ordered: a higher tier clears every route gated at a
/// lower one. Customers carry no clearance at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearanceLevel {
    Staff,
    Manager,
    Owner,
}

impl fmt::Display for ClearanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClearanceLevel::Staff => write!(f, "staff"),
            ClearanceLevel::Manager => write!(f, "manager"),
            ClearanceLevel::Owner => write!(f, "owner"),
        }
    }
}

impl FromStr for ClearanceLevel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "staff" => Ok(ClearanceLevel::Staff),
            "manager" => Ok(ClearanceLevel::Manager),
            "owner" => Ok(ClearanceLevel::Owner),
            _ => Err(()),
        }
    }
}

/// Claim structure for JWT tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub clearance: Option<ClearanceLevel>,
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
    pub iss: String,
    pub aud: String,
}

/// Authenticated caller extracted from a validated JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub customer_id: Uuid,
    pub name: Option<String>,
    pub email: Option<String>,
    pub clearance: Option<ClearanceLevel>,
    pub token_id: String,
}

impl AuthUser {
    /// True when the caller holds at least the given clearance.
    pub fn has_clearance(&self, required: ClearanceLevel) -> bool {
        self.clearance.map_or(false, |held| held >= required)
    }

    pub fn is_staff(&self) -> bool {
        self.has_clearance(ClearanceLevel::Staff)
    }
}

/// Authentication configuration
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub access_token_expiration: Duration,
}

impl AuthConfig {
    pub fn new(
        jwt_secret: String,
        jwt_issuer: String,
        jwt_audience: String,
        access_token_expiration: Duration,
    ) -> Self {
        Self {
            jwt_secret,
            jwt_issuer,
            jwt_audience,
            access_token_expiration,
        }
    }
}

impl From<&crate::config::AppConfig> for AuthConfig {
    fn from(cfg: &crate::config::AppConfig) -> Self {
        Self {
            jwt_secret: cfg.jwt_secret.clone(),
            jwt_issuer: cfg.auth_issuer.clone(),
            jwt_audience: cfg.auth_audience.clone(),
            access_token_expiration: Duration::from_secs(cfg.jwt_expiration as u64),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication")]
    MissingAuth,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Insufficient clearance")]
    InsufficientClearance,
    #[error("Token creation failed: {0}")]
    TokenCreation(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AuthError::MissingAuth => (StatusCode::UNAUTHORIZED, "AUTH_MISSING"),
            AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "AUTH_INVALID_TOKEN"),
            AuthError::TokenExpired => (StatusCode::UNAUTHORIZED, "AUTH_TOKEN_EXPIRED"),
            AuthError::InsufficientClearance => (StatusCode::FORBIDDEN, "AUTH_FORBIDDEN"),
            AuthError::TokenCreation(_) | AuthError::InternalError(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "AUTH_INTERNAL_ERROR")
            }
        };

        let body = Json(serde_json::json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Authentication service that handles token issuance and validation
#[derive(Debug, Clone)]
pub struct AuthService {
    pub config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Issue a token for a subject. Customers pass `clearance: None`.
    pub fn generate_token(
        &self,
        customer_id: Uuid,
        name: Option<String>,
        email: Option<String>,
        clearance: Option<ClearanceLevel>,
    ) -> Result<String, AuthError> {
        let now = Utc::now();
        let exp = now
            + ChronoDuration::from_std(self.config.access_token_expiration)
                .map_err(|_| AuthError::InternalError("invalid token duration".to_string()))?;

        let claims = Claims {
            sub: customer_id.to_string(),
            name,
            email,
            clearance,
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            nbf: now.timestamp(),
            iss: self.config.jwt_issuer.clone(),
            aud: self.config.jwt_audience.clone(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AuthError::TokenCreation(e.to_string()))
    }

    /// Validate a JWT and extract the claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.jwt_issuer]);
        validation.set_audience(&[&self.config.jwt_audience]);

        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            _ => AuthError::InvalidToken,
        })?
        .claims;

        Ok(claims)
    }
}

fn auth_user_from_claims(claims: Claims) -> Result<AuthUser, AuthError> {
    let customer_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;
    Ok(AuthUser {
        customer_id,
        name: claims.name,
        email: claims.email,
        clearance: claims.clearance,
        token_id: claims.jti,
    })
}

/// Authentication middleware that validates the bearer token and injects the
/// caller into request extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let auth_service = match request.extensions().get::<Arc<AuthService>>() {
        Some(service) => service.clone(),
        None => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication service not available",
            )
                .into_response();
        }
    };

    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .filter(|value| value.starts_with("Bearer "))
        .map(|value| value.trim_start_matches("Bearer ").trim().to_string());

    let token = match token {
        Some(token) => token,
        None => return AuthError::MissingAuth.into_response(),
    };

    match auth_service
        .validate_token(&token)
        .and_then(auth_user_from_claims)
    {
        Ok(user) => {
            request.extensions_mut().insert(user);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

/// Clearance middleware; assumes `auth_middleware` already ran.
pub async fn clearance_middleware(
    State(required): State<ClearanceLevel>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or(AuthError::MissingAuth)?;

    if !user.has_clearance(required) {
        return Err(AuthError::InsufficientClearance);
    }

    Ok(next.run(request).await)
}

/// Extension methods for Router to add auth middleware
pub trait AuthRouterExt {
    fn with_auth(self) -> Self;
    fn with_clearance(self, clearance: ClearanceLevel) -> Self;
}

impl<S> AuthRouterExt for axum::Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_auth(self) -> Self {
        self.layer(axum::middleware::from_fn(auth_middleware))
    }

    fn with_clearance(self, clearance: ClearanceLevel) -> Self {
        self.layer(axum::middleware::from_fn_with_state(
            clearance,
            clearance_middleware,
        ))
        .with_auth()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_service() -> AuthService {
        AuthService::new(AuthConfig::new(
            "test_secret_key_for_testing_purposes_only_32chars".into(),
            "logicbuilders-auth".into(),
            "logicbuilders-api".into(),
            Duration::from_secs(3600),
        ))
    }

    #[test]
    fn clearance_ordering() {
        assert!(ClearanceLevel::Owner > ClearanceLevel::Manager);
        assert!(ClearanceLevel::Manager > ClearanceLevel::Staff);
    }

    #[test]
    fn manager_clears_staff_gate() {
        let user = AuthUser {
            customer_id: Uuid::new_v4(),
            name: None,
            email: None,
            clearance: Some(ClearanceLevel::Manager),
            token_id: "jti".into(),
        };
        assert!(user.has_clearance(ClearanceLevel::Staff));
        assert!(user.has_clearance(ClearanceLevel::Manager));
        assert!(!user.has_clearance(ClearanceLevel::Owner));
    }

    #[test]
    fn customer_has_no_clearance() {
        let user = AuthUser {
            customer_id: Uuid::new_v4(),
            name: None,
            email: None,
            clearance: None,
            token_id: "jti".into(),
        };
        assert!(!user.has_clearance(ClearanceLevel::Staff));
    }

    #[test]
    fn round_trip_token() {
        let service = test_service();
        let customer_id = Uuid::new_v4();
        let token = service
            .generate_token(
                customer_id,
                Some("Ada".into()),
                Some("ada@example.com".into()),
                Some(ClearanceLevel::Staff),
            )
            .expect("token");

        let claims = service.validate_token(&token).expect("valid token");
        assert_eq!(claims.sub, customer_id.to_string());
        assert_eq!(claims.clearance, Some(ClearanceLevel::Staff));
    }

    #[test]
    fn token_from_wrong_secret_is_rejected() {
        let service = test_service();
        let other = AuthService::new(AuthConfig::new(
            "another_secret_key_that_is_also_long_enough_here".into(),
            "logicbuilders-auth".into(),
            "logicbuilders-api".into(),
            Duration::from_secs(3600),
        ));

        let token = other
            .generate_token(Uuid::new_v4(), None, None, None)
            .expect("token");
        assert!(service.validate_token(&token).is_err());
    }

    #[test]
    fn clearance_parse_round_trip() {
        for level in [
            ClearanceLevel::Staff,
            ClearanceLevel::Manager,
            ClearanceLevel::Owner,
        ] {
            assert_eq!(level.to_string().parse::<ClearanceLevel>(), Ok(level));
        }
        assert!("superuser".parse::<ClearanceLevel>().is_err());
    }
}
