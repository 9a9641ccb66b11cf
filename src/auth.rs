//! Token issuance and validation.
//!
//! Tokens are HS256-signed JWTs. Extraction precedence is fixed: a `jwt`
//! query parameter wins over the `Authorization` header, so clients can embed
//! a token in a URL for simple links (file downloads) while defaulting to
//! bearer auth for API calls.

use axum::http::{HeaderMap, Uri, header};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::config::JwtConfig;
use crate::error::AppError;

/// Signed claims embedded in every token.
///
/// `exp` is exactly `iat + minutes * 60` for the configured lifetime.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub authorized: bool,
    #[serde(rename = "userID")]
    pub user_id: i64,
    pub role: String,
    pub permissions: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Identity decoded from a validated token. Immutable, per-request; the
/// permission stage inserts it into request extensions for handlers.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub role: String,
    pub permissions: Vec<String>,
    pub user_id: i64,
}

impl From<Claims> for AuthToken {
    fn from(claims: Claims) -> Self {
        Self {
            role: claims.role,
            permissions: claims.permissions,
            user_id: claims.user_id,
        }
    }
}

/// Issues and validates signed tokens with a symmetric secret fixed at
/// startup.
pub struct TokenAuthority {
    secret: String,
    authorized: bool,
    minutes: i64,
}

impl TokenAuthority {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            secret: config.secret.clone(),
            authorized: config.authorized,
            minutes: config.minutes,
        }
    }

    /// Builds and signs a token for the given identity.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Signing`] when the secret is empty; nothing else
    /// about the identity can fail.
    pub fn issue(
        &self,
        user_id: i64,
        role: &str,
        permissions: Vec<String>,
    ) -> Result<String, AppError> {
        if self.secret.is_empty() {
            return Err(AppError::Signing);
        }

        let now = Utc::now();
        let claims = Claims {
            authorized: self.authorized,
            user_id,
            role: role.to_string(),
            permissions,
            exp: (now + Duration::minutes(self.minutes)).timestamp(),
            iat: now.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
    }

    /// Checks that the request carries a token with a valid signature and
    /// unexpired `exp`.
    pub fn validate(&self, uri: &Uri, headers: &HeaderMap) -> Result<(), AppError> {
        let token = extract_token(uri, headers).ok_or(AppError::MissingToken)?;
        decode::<serde_json::Value>(&token, &self.decoding_key(), &self.validation())
            .map_err(map_jwt_error)?;
        Ok(())
    }

    /// Decodes the request's token into an [`AuthToken`].
    ///
    /// # Errors
    ///
    /// - [`AppError::MissingToken`] when no token is present
    /// - [`AppError::InvalidToken`] on signature or expiry failure
    /// - [`AppError::MalformedClaims`] when a claim is absent or of the
    ///   wrong shape
    pub fn decode(&self, uri: &Uri, headers: &HeaderMap) -> Result<AuthToken, AppError> {
        let token = extract_token(uri, headers).ok_or(AppError::MissingToken)?;
        let data = decode::<Claims>(&token, &self.decoding_key(), &self.validation())
            .map_err(map_jwt_error)?;
        Ok(data.claims.into())
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.as_bytes())
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        // zero leeway: expiry is exact
        validation.leeway = 0;
        validation
    }
}

/// Locates the token: `jwt` query parameter first, then the second segment
/// of the `Authorization` header split on a single space.
fn extract_token(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    if let Some(query) = uri.query() {
        let from_query = url::form_urlencoded::parse(query.as_bytes())
            .find(|(key, _)| key == "jwt")
            .map(|(_, value)| value.into_owned());
        if let Some(token) = from_query
            && !token.is_empty()
        {
            return Some(token);
        }
    }

    let bearer = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let segments: Vec<&str> = bearer.split(' ').collect();
    if segments.len() == 2 {
        return Some(segments[1].to_string());
    }
    None
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AppError {
    match e.kind() {
        ErrorKind::Json(_) | ErrorKind::MissingRequiredClaim(_) => {
            AppError::MalformedClaims(e.to_string())
        }
        _ => AppError::InvalidToken,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn authority() -> TokenAuthority {
        TokenAuthority::new(&JwtConfig {
            secret: "test-jwt-secret".to_string(),
            authorized: true,
            minutes: 60,
        })
    }

    fn bearer_request(token: &str) -> (Uri, HeaderMap) {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        (Uri::from_static("/resource"), headers)
    }

    #[test]
    fn issue_then_decode_round_trips_identity() {
        let authority = authority();
        let token = authority
            .issue(42, "admin", vec!["/a".to_string(), "/b".to_string()])
            .unwrap();

        let (uri, headers) = bearer_request(&token);
        let decoded = authority.decode(&uri, &headers).unwrap();

        assert_eq!(decoded.user_id, 42);
        assert_eq!(decoded.role, "admin");
        assert_eq!(decoded.permissions, vec!["/a", "/b"]);
        assert!(authority.validate(&uri, &headers).is_ok());
    }

    #[test]
    fn expired_token_is_invalid() {
        let expired = TokenAuthority::new(&JwtConfig {
            secret: "test-jwt-secret".to_string(),
            authorized: true,
            minutes: -5,
        });
        let token = expired.issue(1, "user", vec![]).unwrap();

        let (uri, headers) = bearer_request(&token);
        assert!(matches!(
            authority().validate(&uri, &headers).unwrap_err(),
            AppError::InvalidToken
        ));
    }

    #[test]
    fn query_parameter_beats_authorization_header() {
        let authority = authority();
        let query_token = authority.issue(1, "from-query", vec![]).unwrap();
        let header_token = authority.issue(2, "from-header", vec![]).unwrap();

        let uri: Uri = format!("/resource?jwt={query_token}").parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {header_token}")).unwrap(),
        );

        let decoded = authority.decode(&uri, &headers).unwrap();
        assert_eq!(decoded.user_id, 1);
        assert_eq!(decoded.role, "from-query");
    }

    #[test]
    fn absent_token_is_missing() {
        let uri = Uri::from_static("/resource");
        let headers = HeaderMap::new();
        assert!(matches!(
            authority().validate(&uri, &headers).unwrap_err(),
            AppError::MissingToken
        ));
    }

    #[test]
    fn malformed_authorization_header_is_missing() {
        let uri = Uri::from_static("/resource");
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("token"));
        assert!(matches!(
            authority().validate(&uri, &headers).unwrap_err(),
            AppError::MissingToken
        ));
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let other = TokenAuthority::new(&JwtConfig {
            secret: "a-different-secret".to_string(),
            authorized: true,
            minutes: 60,
        });
        let token = other.issue(1, "user", vec![]).unwrap();

        let (uri, headers) = bearer_request(&token);
        assert!(matches!(
            authority().validate(&uri, &headers).unwrap_err(),
            AppError::InvalidToken
        ));
    }

    #[test]
    fn wrong_claim_shape_is_malformed() {
        let claims = serde_json::json!({
            "authorized": true,
            "userID": "not-an-integer",
            "role": "user",
            "permissions": [],
            "exp": (Utc::now() + Duration::minutes(5)).timestamp(),
            "iat": Utc::now().timestamp(),
        });
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-jwt-secret"),
        )
        .unwrap();

        let (uri, headers) = bearer_request(&token);
        assert!(matches!(
            authority().decode(&uri, &headers).unwrap_err(),
            AppError::MalformedClaims(_)
        ));
    }

    #[test]
    fn empty_secret_cannot_sign() {
        let broken = TokenAuthority::new(&JwtConfig {
            secret: String::new(),
            authorized: true,
            minutes: 60,
        });
        assert!(matches!(
            broken.issue(1, "user", vec![]).unwrap_err(),
            AppError::Signing
        ));
    }
}
