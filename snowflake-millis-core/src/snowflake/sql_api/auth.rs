//! Key-pair authentication: RS256 JWTs signed with the user's private key.

use crate::error::Error;
use crate::snowflake::key::Pkcs8Der;
use base64::prelude::{Engine as _, BASE64_STANDARD};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::EncodePublicKey;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

// Snowflake rejects tokens that live longer than an hour.
const TOKEN_LIFETIME_SECS: u64 = 60 * 60;
const TOKEN_RENEW_AFTER_SECS: u64 = 50 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) iss: String,
    pub(crate) sub: String,
    pub(crate) iat: u64,
    pub(crate) exp: u64,
}

/// Issues and caches the bearer token for one account and user.
pub(crate) struct KeyPairAuth {
    encoding_key: EncodingKey,
    // ACCOUNT.USER
    qualified_username: String,
    // SHA256:<base64>
    fingerprint: String,
    cached: Mutex<Option<(String, u64)>>,
}

impl KeyPairAuth {
    pub(crate) fn new(account: &str, username: &str, key: &Pkcs8Der) -> Result<Self, Error> {
        let rsa = key.to_rsa()?;
        let fingerprint = public_key_fingerprint(&rsa)?;
        let pkcs1 = rsa.to_pkcs1_der().map_err(Error::private_key)?;

        Ok(Self {
            encoding_key: EncodingKey::from_rsa_der(pkcs1.as_bytes()),
            qualified_username: format!(
                "{}.{}",
                account_identifier(account),
                username.to_uppercase()
            ),
            fingerprint,
            cached: Mutex::new(None),
        })
    }

    /// Returns a valid token, issuing a new one when the cached one is getting old.
    pub(crate) fn token(&self) -> Result<String, Error> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(Error::config)?
            .as_secs();

        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some((token, issued_at)) = &*cached {
            if now.saturating_sub(*issued_at) < TOKEN_RENEW_AFTER_SECS {
                return Ok(token.clone());
            }
        }

        let token = self.issue(now)?;
        *cached = Some((token.clone(), now));

        Ok(token)
    }

    fn issue(&self, now: u64) -> Result<String, Error> {
        let claims = Claims {
            iss: format!("{}.{}", self.qualified_username, self.fingerprint),
            sub: self.qualified_username.clone(),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };

        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key).map_err(Error::config)
    }
}

/// The account part of the token's subject: upper-cased, without region or cloud suffix.
pub(crate) fn account_identifier(account: &str) -> String {
    account
        .split('.')
        .next()
        .unwrap_or(account)
        .to_uppercase()
}

/// `SHA256:` followed by the base64 SHA-256 digest of the DER public key, the format
/// Snowflake stores as `RSA_PUBLIC_KEY_FP`.
pub(crate) fn public_key_fingerprint(key: &rsa::RsaPrivateKey) -> Result<String, Error> {
    let public_key = key
        .to_public_key()
        .to_public_key_der()
        .map_err(Error::private_key)?;

    Ok(format!(
        "SHA256:{}",
        BASE64_STANDARD.encode(Sha256::digest(public_key.as_bytes()))
    ))
}
