// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Credential issuance and verification (HS256 JWT).

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::claims::{AuthenticatedUser, CredentialClaims};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Credentials are valid for 7 days.
const DEFAULT_TTL_DAYS: i64 = 7;

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("failed to sign credential: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("credential expired")]
    Expired,

    #[error("credential rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

/// Issues and verifies bearer credentials with a shared secret.
#[derive(Clone)]
pub struct CredentialService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl CredentialService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::days(DEFAULT_TTL_DAYS),
        }
    }

    /// Override the credential lifetime.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Issue a credential for the given user.
    pub fn issue(&self, user_id: &str, username: &str) -> Result<String, CredentialError> {
        let iat = Utc::now().timestamp();
        let claims = CredentialClaims {
            user_id: user_id.to_string(),
            username: username.to_string(),
            iat,
            exp: iat + self.ttl.num_seconds(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(CredentialError::Signing)
    }

    /// Verify signature and expiry, returning the caller identity.
    pub fn verify(&self, token: &str) -> Result<AuthenticatedUser, CredentialError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = CLOCK_SKEW_LEEWAY;

        let token_data = decode::<CredentialClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => CredentialError::Expired,
                _ => CredentialError::Invalid(e),
            })?;

        Ok(token_data.claims.into())
    }
}

impl std::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialService")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}
