//! Identifiers and opaque tokens exchanged with the aggregation API.
//!
//! A [`PublicToken`] is the short-lived, single-use token produced by the
//! consent UI. It is exchanged exactly once for an [`AccessToken`], the
//! durable credential that authorises later API calls for one [`ItemId`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

// ---------------------------------------------------------------------------
// ItemId
// ---------------------------------------------------------------------------

/// Identifier of a linked item (one institution login for one user).
///
/// # Examples
///
/// ```
/// use legerdemain_models::ItemId;
///
/// let id = ItemId::new("item_1");
/// assert_eq!(id.to_string(), "item_1");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, Default)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    /// Create a new `ItemId` from a string slice.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// AccessToken
// ---------------------------------------------------------------------------

/// Durable access token for one item.
///
/// `Debug` never prints the secret; use [`AccessToken::expose`] when the raw
/// value has to go on the wire.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw access token.
    pub fn new(token: &str) -> Self {
        Self(token.to_string())
    }

    /// Return the raw token value.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// `true` when no token has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

impl From<String> for AccessToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// PublicToken
// ---------------------------------------------------------------------------

/// Short-lived token handed back by the consent UI.
///
/// Only emptiness is checked locally; everything else is the remote API's
/// business.
///
/// # Examples
///
/// ```
/// use legerdemain_models::PublicToken;
///
/// assert!(PublicToken::parse("public-sandbox-123").is_ok());
/// assert!(PublicToken::parse("").is_err());
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct PublicToken(String);

impl PublicToken {
    /// Validate and wrap a public token.
    pub fn parse(token: &str) -> Result<Self, ModelError> {
        if token.is_empty() {
            return Err(ModelError::EmptyToken {
                kind: "public token",
            });
        }
        Ok(Self(token.to_string()))
    }

    /// Return the inner string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
