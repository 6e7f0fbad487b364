use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};

use crate::auth::{AuthConfig, AuthError, AuthResult};

/// Claims carried by an access token: the owning account's email as the
/// subject, and an absolute expiry.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct SignedAccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Stateless token minting and verification. Tokens are HS256-signed over
/// the configured symmetric secret and are never persisted.
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_token_ttl: Duration,
}

impl JwtService {
    pub fn from_config(config: &AuthConfig) -> Self {
        let secret_bytes = config.jwt_secret.as_bytes();

        // A token is valid strictly while now < exp; no clock leeway.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret_bytes),
            decoding_key: DecodingKey::from_secret(secret_bytes),
            validation,
            access_token_ttl: Duration::minutes(config.access_token_ttl_mins),
        }
    }

    /// Mint a signed token whose subject is the account's email.
    pub fn issue_access_token(&self, email: &str) -> AuthResult<SignedAccessToken> {
        let expires_at = Utc::now() + self.access_token_ttl;
        let claims = AccessTokenClaims {
            sub: email.to_string(),
            exp: expires_at.timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(SignedAccessToken { token, expires_at })
    }

    /// Decode and validate a token, returning its claims.
    ///
    /// Every structural or cryptographic failure collapses to
    /// [`AuthError::TokenInvalid`] except expiry, which is reported
    /// separately; the caller decides whether either is a hard 401 or a
    /// soft absence.
    pub fn decode_access_token(&self, token: &str) -> AuthResult<AccessTokenClaims> {
        match decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::ExpiredSignature => Err(AuthError::TokenExpired),
                _ => Err(AuthError::TokenInvalid),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthConfig, HashingConfig};

    fn make_test_config(ttl_mins: i64) -> AuthConfig {
        AuthConfig {
            jwt_secret: "super-secret-test-key".into(),
            access_token_ttl_mins: ttl_mins,
            session_cookie_name: "carqr_session".into(),
            cookie_domain: None,
            cookie_secure: false,
            hashing: HashingConfig::default(),
        }
    }

    #[test]
    fn issues_and_decodes_access_tokens() {
        let service = JwtService::from_config(&make_test_config(30));

        let signed = service
            .issue_access_token("owner@example.com")
            .expect("issue token");
        let claims = service
            .decode_access_token(&signed.token)
            .expect("decode token");

        assert_eq!(claims.sub, "owner@example.com");
        assert_eq!(claims.exp, signed.expires_at.timestamp());
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = JwtService::from_config(&make_test_config(-5));

        let signed = service
            .issue_access_token("owner@example.com")
            .expect("issue token");

        match service.decode_access_token(&signed.token) {
            Err(AuthError::TokenExpired) => {}
            other => panic!("expected TokenExpired, got {other:?}"),
        }
    }

    #[test]
    fn foreign_signature_is_rejected() {
        let issuer = JwtService::from_config(&make_test_config(30));
        let mut other_config = make_test_config(30);
        other_config.jwt_secret = "a-different-secret".into();
        let verifier = JwtService::from_config(&other_config);

        let signed = issuer
            .issue_access_token("owner@example.com")
            .expect("issue token");

        match verifier.decode_access_token(&signed.token) {
            Err(AuthError::TokenInvalid) => {}
            other => panic!("expected TokenInvalid, got {other:?}"),
        }
    }

    #[test]
    fn structural_garbage_is_rejected() {
        let service = JwtService::from_config(&make_test_config(30));
        match service.decode_access_token("definitely.not.a-jwt") {
            Err(AuthError::TokenInvalid) => {}
            other => panic!("expected TokenInvalid, got {other:?}"),
        }
    }
}
