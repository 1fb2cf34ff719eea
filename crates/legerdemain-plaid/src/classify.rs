//! Failure classification for remote API calls.
//!
//! Exactly one shape asks for user interaction: `error_type == ITEM_ERROR`
//! together with `error_code == ITEM_LOGIN_REQUIRED`. The match is exact;
//! near misses are logged so provider drift shows up instead of silently
//! disabling the re-link flow.

use legerdemain_models::{ApiErrorPayload, ItemId, ITEM_ERROR, ITEM_LOGIN_REQUIRED};
use tracing::{debug, warn};

use crate::error::PlaidError;

/// Which institution login needs to be refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReauthContext {
    /// Institution name as configured.
    pub institution: String,
    /// Item whose login expired.
    pub item_id: ItemId,
}

impl ReauthContext {
    /// Build a context from the institution name and item id.
    pub fn new(institution: &str, item_id: ItemId) -> Self {
        Self {
            institution: institution.to_string(),
            item_id,
        }
    }
}

/// Outcome of classifying a failed remote call.
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    /// The user has to go through the consent flow again.
    #[error("institution \"{}\" (item {}) requires re-authentication", .0.institution, .0.item_id)]
    ReauthRequired(ReauthContext),

    /// Anything else; fatal for the current operation.
    #[error(transparent)]
    Other(PlaidError),
}

/// `true` only for an `ITEM_ERROR` / `ITEM_LOGIN_REQUIRED` payload.
///
/// No payload at all never requires re-authentication.
pub fn requires_reauth(payload: Option<&ApiErrorPayload>) -> bool {
    let Some(payload) = payload else {
        return false;
    };

    let type_matches = payload.error_type == ITEM_ERROR;
    let code_matches = payload.error_code == ITEM_LOGIN_REQUIRED;
    if type_matches && code_matches {
        return true;
    }

    let loosely_type = payload.error_type.eq_ignore_ascii_case(ITEM_ERROR);
    let loosely_code = payload.error_code.eq_ignore_ascii_case(ITEM_LOGIN_REQUIRED);
    if code_matches || (loosely_type && loosely_code) {
        warn!(
            error_type = %payload.error_type,
            error_code = %payload.error_code,
            "error resembles a login-required condition but does not match it exactly; treating as fatal"
        );
    }
    false
}

/// Classify a failed remote call.
pub fn classify(error: PlaidError, context: ReauthContext) -> RemoteError {
    if requires_reauth(error.api_payload()) {
        debug!(
            institution = %context.institution,
            item_id = %context.item_id,
            "remote call requires re-authentication"
        );
        RemoteError::ReauthRequired(context)
    } else {
        RemoteError::Other(error)
    }
}
