//! Settings rendered into the consent page of a link session.

use serde::{Deserialize, Serialize};

/// Default product scope requested when re-linking.
pub const DEFAULT_PRODUCTS: &str = "transactions";

/// Values the consent page needs to initialise the remote consent UI.
///
/// # Examples
///
/// ```
/// use legerdemain_models::LinkSettings;
///
/// let settings = LinkSettings::new("transactions", "sandbox", "pk_test");
/// assert_eq!(settings.environment, "sandbox");
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    /// Comma-separated product scope (e.g. `"transactions"`).
    pub products: String,
    /// Environment name (`sandbox`, `development`, `production`).
    pub environment: String,
    /// Public identifier of the API client.
    pub public_key: String,
}

impl LinkSettings {
    /// Build settings from string slices.
    pub fn new(products: &str, environment: &str, public_key: &str) -> Self {
        Self {
            products: products.to_string(),
            environment: environment.to_string(),
            public_key: public_key.to_string(),
        }
    }
}
