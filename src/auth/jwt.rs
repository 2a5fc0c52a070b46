use std::time::Duration;

use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use secrecy::ExposeSecret;
use serde_json::{Map, Value};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::config::{JwtConfig, MAX_TTL_MINUTES};

/// Why a token was refused. Callers outside this module only ever see a
/// single "unauthenticated" outcome.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    /// Bad signature, or signed claims that do not belong to this service.
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        match e.kind() {
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidSignature
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidSubject
            | ErrorKind::ImmatureSignature
            | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
            _ => TokenError::Malformed,
        }
    }
}

/// Signs and validates HS256 bearer tokens. Built once from config at startup.
///
/// A token is accepted until `exp + leeway`; with the default leeway of zero
/// that is exactly the configured ttl.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    ttl: Duration,
    leeway: u64,
}

impl TokenIssuer {
    pub fn new(cfg: &JwtConfig) -> Self {
        let secret = cfg.secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: cfg.issuer.clone(),
            audience: cfg.audience.clone(),
            ttl: Duration::from_secs(cfg.ttl_minutes.clamp(0, MAX_TTL_MINUTES) as u64 * 60),
            leeway: cfg.leeway_seconds,
        }
    }

    pub fn issue(&self, user_id: Uuid, extra: Map<String, Value>) -> anyhow::Result<String> {
        self.issue_at(user_id, extra, OffsetDateTime::now_utc())
    }

    pub(crate) fn issue_at(
        &self,
        user_id: Uuid,
        extra: Map<String, Value>,
        now: OffsetDateTime,
    ) -> anyhow::Result<String> {
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            extra,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::default();
        validation.leeway = self.leeway;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        validation.set_required_spec_claims(&["exp", "sub", "iss", "aud"]);
        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            let err = TokenError::from(e);
            debug!(reason = %err, "jwt rejected");
            err
        })?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
pub(crate) fn test_config(secret: &str) -> JwtConfig {
    JwtConfig {
        secret: secret.to_string().into(),
        issuer: "test-issuer".into(),
        audience: "test-aud".into(),
        ttl_minutes: 5,
        leeway_seconds: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_issuer(secret: &str) -> TokenIssuer {
        TokenIssuer::new(&test_config(secret))
    }

    #[test]
    fn issue_and_validate() {
        let tokens = make_issuer("dev-secret");
        let user_id = Uuid::new_v4();
        let token = tokens.issue(user_id, Map::new()).expect("sign");
        let claims = tokens.validate(&token).expect("validate");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 5 * 60);
    }

    #[test]
    fn extra_claims_survive_roundtrip() {
        let tokens = make_issuer("dev-secret");
        let mut extra = Map::new();
        extra.insert("email".into(), json!("u@test.com"));
        let token = tokens.issue(Uuid::new_v4(), extra).unwrap();
        let claims = tokens.validate(&token).unwrap();
        assert_eq!(claims.extra.get("email"), Some(&json!("u@test.com")));
    }

    #[test]
    fn token_past_its_window_is_expired() {
        let tokens = make_issuer("dev-secret");
        let issued = OffsetDateTime::now_utc() - TimeDuration::minutes(10);
        let token = tokens.issue_at(Uuid::new_v4(), Map::new(), issued).unwrap();
        assert_eq!(tokens.validate(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn oversized_ttl_is_clamped() {
        let mut cfg = test_config("dev-secret");
        cfg.ttl_minutes = i64::MAX;
        let tokens = TokenIssuer::new(&cfg);
        let claims = tokens
            .validate(&tokens.issue(Uuid::new_v4(), Map::new()).unwrap())
            .unwrap();
        assert_eq!(claims.exp - claims.iat, (MAX_TTL_MINUTES * 60) as usize);
    }

    #[test]
    fn token_just_past_expiry_fails_without_leeway() {
        let tokens = make_issuer("dev-secret");
        let issued = OffsetDateTime::now_utc() - TimeDuration::seconds(5 * 60 + 10);
        let token = tokens.issue_at(Uuid::new_v4(), Map::new(), issued).unwrap();
        assert_eq!(tokens.validate(&token).unwrap_err(), TokenError::Expired);
    }

    #[test]
    fn leeway_tolerates_small_skew() {
        let mut cfg = test_config("dev-secret");
        cfg.leeway_seconds = 120;
        let tokens = TokenIssuer::new(&cfg);
        let issued = OffsetDateTime::now_utc() - TimeDuration::seconds(5 * 60 + 30);
        let token = tokens.issue_at(Uuid::new_v4(), Map::new(), issued).unwrap();
        assert!(tokens.validate(&token).is_ok());
    }

    #[test]
    fn different_key_is_invalid_signature() {
        let token = make_issuer("key-a").issue(Uuid::new_v4(), Map::new()).unwrap();
        let err = make_issuer("key-b").validate(&token).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let tokens = make_issuer("dev-secret");
        let token = tokens.issue(Uuid::new_v4(), Map::new()).unwrap();
        let other = tokens.issue(Uuid::new_v4(), Map::new()).unwrap();
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);
        assert_eq!(
            tokens.validate(&forged).unwrap_err(),
            TokenError::InvalidSignature
        );
    }

    #[test]
    fn garbage_is_malformed() {
        let tokens = make_issuer("dev-secret");
        assert_eq!(tokens.validate("not-a-jwt").unwrap_err(), TokenError::Malformed);
        assert_eq!(tokens.validate("").unwrap_err(), TokenError::Malformed);
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let token = make_issuer("same").issue(Uuid::new_v4(), Map::new()).unwrap();
        let mut cfg = test_config("same");
        cfg.issuer = "someone-else".into();
        let err = TokenIssuer::new(&cfg).validate(&token).unwrap_err();
        assert_eq!(err, TokenError::InvalidSignature);
    }
}
