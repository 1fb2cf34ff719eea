//! On-disk Plaid configuration.
//!
//! The file lists the API client identity, one secret per environment and,
//! per ledger user, the institutions whose credentials the tool maintains.
//!
//! ```json
//! {
//!   "client_id": "abc",
//!   "public_key": "pk_test",
//!   "environments": [{ "name": "sandbox", "secret": "s3cret" }],
//!   "users": [{
//!     "ledger_file_name": "main.ledger",
//!     "institutions": [{ "name": "Chase", "item_id": "item_1", "access_token": "acc_1" }]
//!   }]
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::error::ModelError;
use crate::identity::{AccessToken, ItemId};

/// Secret and endpoint for one API environment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// Environment name (`sandbox`, `development`, `production`).
    pub name: String,
    /// Client secret for this environment.
    pub secret: String,
    /// Overrides the environment's default API base URL (e.g. a local mock).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

/// Stored credential for one institution.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct InstitutionConfig {
    /// Institution name, used to select it from the command line.
    pub name: String,
    /// Item the access token belongs to.
    #[serde(default)]
    pub item_id: ItemId,
    /// Durable access token (empty when never linked).
    #[serde(default)]
    pub access_token: AccessToken,
    /// When the stored token was last issued by a link session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_at: Option<DateTime<Utc>>,
}

impl From<&Credential> for InstitutionConfig {
    fn from(cred: &Credential) -> Self {
        Self {
            name: cred.institution.clone(),
            item_id: cred.item_id.clone(),
            access_token: cred.access_token.clone(),
            linked_at: Some(cred.issued_at),
        }
    }
}

/// A ledger user and the institutions feeding their journal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UserConfig {
    /// Journal file the imported data is destined for.
    pub ledger_file_name: String,
    /// Linked institutions.
    #[serde(default)]
    pub institutions: Vec<InstitutionConfig>,
}

/// Root of the Plaid configuration file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlaidConfig {
    /// API client identifier.
    pub client_id: String,
    /// Public key rendered into the consent page.
    pub public_key: String,
    /// Known environments; the first one is the default.
    pub environments: Vec<EnvironmentConfig>,
    /// Ledger users.
    #[serde(default)]
    pub users: Vec<UserConfig>,
}

impl PlaidConfig {
    /// Look up an environment by name, or the first one when `name` is `None`.
    pub fn environment(&self, name: Option<&str>) -> Result<&EnvironmentConfig, ModelError> {
        match name {
            Some(name) => self.environments.iter().find(|e| e.name == name),
            None => self.environments.first(),
        }
        .ok_or_else(|| ModelError::NotConfigured {
            what: "environment",
            value: name.unwrap_or("<default>").to_string(),
        })
    }

    /// Return the user at `index`.
    pub fn user(&self, index: usize) -> Result<&UserConfig, ModelError> {
        self.users.get(index).ok_or_else(|| ModelError::NotConfigured {
            what: "user",
            value: index.to_string(),
        })
    }

    /// Look up an institution of the user at `user_index`.
    pub fn institution(
        &self,
        user_index: usize,
        name: &str,
    ) -> Result<&InstitutionConfig, ModelError> {
        self.user(user_index)?
            .institutions
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| ModelError::NotConfigured {
                what: "institution",
                value: name.to_string(),
            })
    }

    /// Replace the stored credential of `cred.institution` for the user at
    /// `user_index`.
    ///
    /// The entry is swapped out as a whole; no field of the previous
    /// credential survives.
    pub fn replace_credential(
        &mut self,
        user_index: usize,
        cred: &Credential,
    ) -> Result<(), ModelError> {
        let user = self
            .users
            .get_mut(user_index)
            .ok_or_else(|| ModelError::NotConfigured {
                what: "user",
                value: user_index.to_string(),
            })?;
        let slot = user
            .institutions
            .iter_mut()
            .find(|i| i.name == cred.institution)
            .ok_or_else(|| ModelError::NotConfigured {
                what: "institution",
                value: cred.institution.clone(),
            })?;
        *slot = InstitutionConfig::from(cred);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PlaidConfig {
        serde_json::from_str(
            r#"{
                "client_id": "client",
                "public_key": "pk_test",
                "environments": [
                    { "name": "sandbox", "secret": "s1" },
                    { "name": "development", "secret": "s2", "base_url": "http://127.0.0.1:4010" }
                ],
                "users": [{
                    "ledger_file_name": "main.ledger",
                    "institutions": [
                        { "name": "Chase", "item_id": "item_old", "access_token": "acc_old" },
                        { "name": "Ally" }
                    ]
                }]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn default_environment_is_first() {
        let cfg = sample();
        assert_eq!(cfg.environment(None).unwrap().name, "sandbox");
        assert_eq!(
            cfg.environment(Some("development")).unwrap().base_url.as_deref(),
            Some("http://127.0.0.1:4010")
        );
        assert!(cfg.environment(Some("production")).is_err());
    }

    #[test]
    fn missing_tokens_default_to_empty() {
        let cfg = sample();
        let ally = cfg.institution(0, "Ally").unwrap();
        assert!(ally.access_token.is_empty());
        assert!(ally.linked_at.is_none());
    }

    #[test]
    fn replace_credential_swaps_whole_entry() {
        let mut cfg = sample();
        let cred = Credential::issue("Chase", ItemId::new("item_1"), AccessToken::new("acc_123"));
        cfg.replace_credential(0, &cred).unwrap();

        let chase = cfg.institution(0, "Chase").unwrap();
        assert_eq!(chase.item_id.as_str(), "item_1");
        assert_eq!(chase.access_token.expose(), "acc_123");
        assert_eq!(chase.linked_at, Some(cred.issued_at));
        // Other institutions are untouched.
        assert!(cfg.institution(0, "Ally").unwrap().access_token.is_empty());
    }

    #[test]
    fn replace_credential_unknown_institution_fails() {
        let mut cfg = sample();
        let cred = Credential::issue("Nope", ItemId::new("i"), AccessToken::new("a"));
        assert_eq!(
            cfg.replace_credential(0, &cred),
            Err(ModelError::NotConfigured {
                what: "institution",
                value: "Nope".into()
            })
        );
        assert!(cfg.replace_credential(3, &cred).is_err());
    }
}
