//! Error types for the link flow.
//!
//! [`LinkError`] is what [`LinkCoordinator::link`](crate::LinkCoordinator::link)
//! returns. [`CallbackError`] implements [`axum::response::IntoResponse`] so
//! the callback handler can return `Result<…, CallbackError>` directly.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use legerdemain_plaid::ExchangeError;
use serde::Serialize;

/// Why a link session did not produce a credential.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The link configuration is unusable.
    #[error("invalid link configuration: {0}")]
    Config(String),

    /// The listening socket could not be bound (port in use, no permission).
    #[error("failed to bind link listener on {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// The consent page template is missing or malformed.
    #[error("consent page template error: {0}")]
    Template(String),

    /// A static asset could not be loaded.
    #[error("static asset error: {0}")]
    Assets(String),

    /// The callback arrived but the token exchange failed.
    #[error("link failed: {0}")]
    Exchange(#[from] ExchangeError),

    /// Nobody completed the consent flow in time.
    #[error("link abandoned: no callback within {0:?}")]
    Abandoned(Duration),

    /// The listener went away before any outcome was published.
    #[error("link listener stopped before the session resolved")]
    SessionClosed,

    /// The listener failed while serving.
    #[error("link listener failed: {0}")]
    Server(#[source] io::Error),
}

/// Failures of `POST <callback>` reported back to the browser.
#[derive(Debug, thiserror::Error)]
pub enum CallbackError {
    /// The form did not carry a non-empty `public_token`.
    #[error("missing public_token")]
    MissingToken,

    /// An earlier callback already resolved this session.
    #[error("link session already resolved")]
    AlreadyResolved,

    /// The token exchange failed; the session is over.
    #[error("{0}")]
    ExchangeFailed(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MissingToken => StatusCode::BAD_REQUEST,
            Self::AlreadyResolved => StatusCode::CONFLICT,
            Self::ExchangeFailed(_) => StatusCode::BAD_GATEWAY,
        };

        tracing::warn!(%status, error = %self, "callback rejected");
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
