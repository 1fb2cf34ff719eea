//! Durable credential issued by a successful token exchange.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{AccessToken, ItemId};

/// Access credential for one institution login.
///
/// A credential is immutable once issued. A re-link produces a brand-new
/// value that replaces the old one wholesale in the configuration store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    /// Institution name as configured by the user (e.g. `"Chase"`).
    pub institution: String,
    /// Item the token authorises.
    pub item_id: ItemId,
    /// Durable access token.
    pub access_token: AccessToken,
    /// When the exchange that produced this credential completed.
    pub issued_at: DateTime<Utc>,
}

impl Credential {
    /// Build a credential stamped with the current time.
    pub fn issue(institution: &str, item_id: ItemId, access_token: AccessToken) -> Self {
        Self {
            institution: institution.to_string(),
            item_id,
            access_token,
            issued_at: Utc::now(),
        }
    }
}
