#![deny(missing_docs)]

//! # Legerdemain Models
//!
//! Plain data types shared by the `legerdemain` crates. Nothing in here
//! performs I/O; the Plaid client, the link flow and the CLI build on top
//! of these types.
//!
//! ## Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identity`] | Token and item identifiers (`AccessToken`, `PublicToken`, `ItemId`) |
//! | [`credential`] | The durable `Credential` issued by a token exchange |
//! | [`link`] | `LinkSettings` rendered into the consent page |
//! | [`api_error`] | Error payload returned by the aggregation API |
//! | [`config`] | On-disk `PlaidConfig` (users, institutions, environments) |

pub mod api_error;
pub mod config;
pub mod credential;
pub mod error;
pub mod identity;
pub mod link;

// Re-export all public types at crate root for convenience.
pub use api_error::*;
pub use config::*;
pub use credential::*;
pub use error::*;
pub use identity::*;
pub use link::*;
