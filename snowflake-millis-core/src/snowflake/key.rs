//! Loading and re-encoding of key-pair authentication keys.
//!
//! Keys arrive as PEM text, optionally encrypted with the connection password, and are handed
//! to the driver as unencrypted PKCS#8 DER.

use crate::error::Error;
use pkcs8::der::SecretDocument;
use pkcs8::{EncryptedPrivateKeyInfo, PrivateKeyInfo};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::EncodePrivateKey;
use std::borrow::Cow;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

const ENCRYPTED_PRIVATE_KEY_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const PRIVATE_KEY_LABEL: &str = "PRIVATE KEY";
const RSA_PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";

/// Private key material as configured, or as handed to the driver.
#[derive(Clone)]
pub enum PrivateKey {
    /// PEM text as supplied by the caller. It may still be encrypted and may carry escaped
    /// newlines.
    Pem(String),

    /// Unencrypted PKCS#8 DER.
    Der(Pkcs8Der),
}

impl PrivateKey {
    /// Returns the DER form, if the key has already been re-encoded.
    pub fn as_der(&self) -> Option<&Pkcs8Der> {
        match self {
            PrivateKey::Der(der) => Some(der),
            PrivateKey::Pem(_) => None,
        }
    }
}

impl Debug for PrivateKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PrivateKey::Pem(_) => f.write_str("PrivateKey::Pem(..)"),
            PrivateKey::Der(der) => f.debug_tuple("PrivateKey::Der").field(der).finish(),
        }
    }
}

/// An unencrypted PKCS#8 `PrivateKeyInfo` document.
///
/// The bytes are wiped from memory when the last clone is dropped.
#[derive(Clone)]
pub struct Pkcs8Der(Arc<SecretDocument>);

impl Pkcs8Der {
    /// Decodes a PEM private key, decrypting it with `password` when it is encrypted.
    ///
    /// Literal `\n` sequences are turned into newlines first, see [`normalize_pem`].
    ///
    /// Accepted encodings:
    ///
    /// * `ENCRYPTED PRIVATE KEY`: PKCS#8 encrypted with PBES2, `password` is required
    /// * `PRIVATE KEY`: unencrypted PKCS#8, `password` must be absent
    /// * `RSA PRIVATE KEY`: unencrypted PKCS#1, `password` must be absent
    pub fn from_pem(pem: &str, password: Option<&str>) -> Result<Self, Error> {
        let pem = normalize_pem(pem);
        let (label, document) = SecretDocument::from_pem(pem.trim()).map_err(Error::private_key)?;

        let document = match (label, password) {
            (ENCRYPTED_PRIVATE_KEY_LABEL, Some(password)) => {
                EncryptedPrivateKeyInfo::try_from(document.as_bytes())
                    .map_err(Error::private_key)?
                    .decrypt(password)
                    .map_err(Error::private_key)?
            }

            (ENCRYPTED_PRIVATE_KEY_LABEL, None) => {
                return Err(Error::PrivateKey(
                    "private key is encrypted but no password was given".into(),
                ));
            }

            (PRIVATE_KEY_LABEL | RSA_PRIVATE_KEY_LABEL, Some(_)) => {
                return Err(Error::PrivateKey(
                    "password was given but private key is not encrypted".into(),
                ));
            }

            (PRIVATE_KEY_LABEL, None) => document,

            (RSA_PRIVATE_KEY_LABEL, None) => rsa::RsaPrivateKey::from_pkcs1_der(document.as_bytes())
                .map_err(Error::private_key)?
                .to_pkcs8_der()
                .map_err(Error::private_key)?,

            (label, _) => {
                return Err(Error::PrivateKey(
                    format!("unsupported PEM label {label:?}, expected a private key").into(),
                ));
            }
        };

        Self::from_document(document)
    }

    /// Wraps unencrypted PKCS#8 DER bytes, checking that they hold a `PrivateKeyInfo`.
    pub fn from_der(der: &[u8]) -> Result<Self, Error> {
        Self::from_document(SecretDocument::try_from(der).map_err(Error::private_key)?)
    }

    fn from_document(document: SecretDocument) -> Result<Self, Error> {
        PrivateKeyInfo::try_from(document.as_bytes()).map_err(Error::private_key)?;

        Ok(Self(Arc::new(document)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Loads the key as an RSA private key.
    pub fn to_rsa(&self) -> Result<rsa::RsaPrivateKey, Error> {
        use rsa::pkcs8::DecodePrivateKey;

        rsa::RsaPrivateKey::from_pkcs8_der(self.as_bytes()).map_err(Error::private_key)
    }
}

impl Debug for Pkcs8Der {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Pkcs8Der({} bytes)", self.as_bytes().len())
    }
}

impl PartialEq for Pkcs8Der {
    fn eq(&self, other: &Self) -> bool {
        self.as_bytes() == other.as_bytes()
    }
}

impl Eq for Pkcs8Der {}

/// Replaces every literal two-character `\n` sequence with a real newline.
///
/// Keys passed through environment variables or JSON often have their newlines escaped.
/// PEM that already uses real newlines comes back unchanged.
pub fn normalize_pem(pem: &str) -> Cow<'_, str> {
    if pem.contains("\\n") {
        Cow::Owned(pem.replace("\\n", "\n"))
    } else {
        Cow::Borrowed(pem)
    }
}
