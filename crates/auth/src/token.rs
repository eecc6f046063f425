//! Signed token issue/parse.
//!
//! Tokens are HS256 (HMAC-SHA256) JWTs signed with a single process-wide
//! symmetric key derived once at construction from the configured secret.
//! The codec knows nothing about users or permissions beyond what is embedded
//! in the claims.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use authhub_core::{DomainError, RoleId, UserId};

/// Claim set embedded in a token.
///
/// `sub`, `userId` and `roleId` are serde-defaulted so that a structurally
/// valid, correctly-signed token with missing identity claims still decodes;
/// the pipeline rejects those as malformed *claims*, which is a different
/// failure from a malformed *token*.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username).
    #[serde(default)]
    pub sub: String,

    #[serde(rename = "userId", default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<i64>,

    #[serde(rename = "roleId", default, skip_serializing_if = "Option::is_none")]
    pub role_id: Option<i64>,

    /// Issued at (Unix seconds).
    pub iat: i64,

    /// Expiration (Unix seconds). Must be strictly in the future at
    /// verification time.
    pub exp: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,

    #[serde(
        rename = "socialProvider",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub social_provider: Option<String>,

    /// Marks long-lived refresh tokens. Refresh tokens carry no `roleId`,
    /// so the pipeline never accepts them on protected resources.
    #[serde(
        rename = "refreshToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub refresh_token: Option<bool>,
}

impl Claims {
    pub fn is_refresh(&self) -> bool {
        self.refresh_token == Some(true)
    }
}

/// Optional claims merged into an issued token.
#[derive(Debug, Clone, Default)]
pub struct TokenExtras {
    pub avatar: Option<String>,
    pub social_provider: Option<String>,
}

/// Token-layer failure.
///
/// The four parse kinds are distinct on purpose: callers use the kind to
/// decide between silent bypass (no usable token) and hard rejection
/// (tampered token). `Signing` only ever comes out of the issue path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("unsupported token type or algorithm")]
    Unsupported,

    #[error("failed to sign token: {0}")]
    Signing(String),
}

const BEARER_PREFIX: &str = "Bearer ";
const MIN_SECRET_BYTES: usize = 32;

/// Issues and verifies signed tokens.
///
/// Immutable after construction; safe for unsynchronized concurrent reads.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    /// Derive the signing key from `secret`.
    ///
    /// The secret must be at least 32 bytes; anything shorter is a
    /// configuration error, not a runtime condition.
    pub fn new(secret: &str, ttl: Duration, refresh_ttl: Duration) -> Result<Self, DomainError> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(DomainError::config(format!(
                "token secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }

        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
            refresh_ttl,
        })
    }

    /// Issue an access token with the configured ttl.
    pub fn issue(
        &self,
        subject: &str,
        user_id: UserId,
        role_id: RoleId,
        extras: TokenExtras,
    ) -> Result<String, TokenError> {
        self.issue_with_ttl(subject, user_id, role_id, extras, self.ttl)
    }

    /// Issue an access token with an explicit ttl.
    pub fn issue_with_ttl(
        &self,
        subject: &str,
        user_id: UserId,
        role_id: RoleId,
        extras: TokenExtras,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            user_id: Some(user_id.as_i64()),
            role_id: Some(role_id.as_i64()),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            avatar: extras.avatar,
            social_provider: extras.social_provider,
            refresh_token: None,
        };

        self.sign(&claims)
    }

    /// Issue a long-lived refresh token.
    ///
    /// Refresh tokens carry the `refreshToken` flag and no `roleId`.
    pub fn issue_refresh(&self, subject: &str, user_id: UserId) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: subject.to_string(),
            user_id: Some(user_id.as_i64()),
            role_id: None,
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
            avatar: None,
            social_provider: None,
            refresh_token: Some(true),
        };

        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Parse and verify a token string.
    ///
    /// A single `"Bearer "` prefix (case-sensitive, one space) is stripped if
    /// present. Empty or blank input fails fast with [`TokenError::Malformed`]
    /// before any cryptographic work.
    pub fn parse(&self, raw: &str) -> Result<Claims, TokenError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(TokenError::Malformed);
        }

        let token = raw.strip_prefix(BEARER_PREFIX).unwrap_or(raw).trim();
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            use jsonwebtoken::errors::ErrorKind;
            match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    TokenError::Unsupported
                }
                _ => TokenError::Malformed,
            }
        })?;

        // `exp` must be *strictly* after now; the library check is inclusive.
        if data.claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }

        Ok(data.claims)
    }
}
