//! Media-host request signing.
//!
//! The media host recomputes a signature over the request parameters it
//! receives and rejects the request when it does not match. Only parameters
//! with a defined, non-empty value take part, sorted by name and joined as
//! `name=value` pairs with `&`. The API secret is key material only and is
//! never one of the signed parameters.

use std::collections::BTreeMap;
use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use thiserror::Error;

/// Errors raised before a signature can be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SigningError {
    /// The shared secret is absent or blank.
    #[error("Media host API secret is not configured")]
    MissingSecret,
}

/// Scalar value of a signable parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
}

impl ParamValue {
    fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => formatter.write_str(text),
            Self::Integer(value) => write!(formatter, "{value}"),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// The parameter set the media host includes in signature verification.
///
/// A `None` value models a parameter that is present by name but undefined;
/// it is kept so callers can build the set unconditionally and is skipped
/// when the canonical string is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignableRequest {
    params: BTreeMap<String, Option<ParamValue>>,
}

impl SignableRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signable parameters for an upload into `folder`.
    pub fn for_upload(timestamp: i64, folder: &str) -> Self {
        Self::new()
            .with("timestamp", timestamp)
            .with("folder", folder)
    }

    /// Signable parameters for destroying the resource `public_id`.
    pub fn for_destroy(public_id: &str, timestamp: i64) -> Self {
        Self::new()
            .with("public_id", public_id)
            .with("timestamp", timestamp)
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), Some(value.into()));
        self
    }

    #[must_use]
    pub fn with_optional<V: Into<ParamValue>>(
        mut self,
        name: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        self.params.insert(name.into(), value.map(Into::into));
        self
    }

    /// Sorted `name=value` pairs joined with `&`, skipping undefined and empty values.
    pub fn canonical_string(&self) -> String {
        self.params
            .iter()
            .filter_map(|(name, value)| {
                value
                    .as_ref()
                    .filter(|value| !value.is_empty())
                    .map(|value| format!("{name}={value}"))
            })
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Signs the canonical string with HMAC-SHA1 and returns the base64 digest.
    ///
    /// Fails without touching the parameters when `secret` is blank.
    pub fn sign(&self, secret: &str) -> Result<String, SigningError> {
        if secret.trim().is_empty() {
            return Err(SigningError::MissingSecret);
        }
        let digest = hmac_sha1::hmac_sha1(secret.as_bytes(), self.canonical_string().as_bytes());
        Ok(STANDARD.encode(digest))
    }
}
