//! API environments and their base URLs.

use strum::{AsRefStr, Display, EnumString};

/// Remote API environment.
///
/// Parsed case-insensitively from the environment names used in the
/// configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, AsRefStr)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Environment {
    /// Test data, fake institutions.
    Sandbox,
    /// Live credentials, limited number of items.
    Development,
    /// Live credentials, billed.
    Production,
}

impl Environment {
    /// Default base URL of the environment.
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Sandbox => "https://sandbox.plaid.com",
            Self::Development => "https://development.plaid.com",
            Self::Production => "https://production.plaid.com",
        }
    }
}
