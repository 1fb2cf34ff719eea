//! Ephemeral consent server.
//!
//! Serves three things for the lifetime of one session:
//!
//! * `GET /` — the pre-rendered consent page (idempotent, safe to load
//!   before or after the browser is opened).
//! * `GET /static/{*path}` — read-only assets.
//! * `POST <callback>` — receives the public token, runs the exchange and
//!   resolves the session.
//!
//! Anything else is a 404, so a stray `/favicon.ico` request is harmless.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{Form, Path, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::assets::Assets;
use crate::error::{CallbackError, LinkError};
use crate::session::{LinkOutcome, LinkSession};

const LINKED_HTML: &str = "<!DOCTYPE html><html><body><h1>Linked</h1>\
<p>The institution is linked again. You may close this window.</p></body></html>";

/// Shared state of the handlers.
#[derive(Clone)]
struct AppState {
    session: Arc<LinkSession>,
    assets: Arc<Assets>,
}

/// A bound, not yet serving, consent listener.
#[derive(Debug)]
pub struct LinkServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl LinkServer {
    /// Bind the listening socket.
    pub async fn bind(addr: SocketAddr) -> Result<Self, LinkError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| LinkError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| LinkError::Bind { addr, source })?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address actually bound (resolves port `0`).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// URL of the consent page.
    pub fn url(&self) -> String {
        format!("http://{}/", self.local_addr)
    }

    /// Serve `app` until `shutdown` turns `true` (or its sender goes away).
    ///
    /// In-flight requests are allowed to finish; the socket is released when
    /// the returned future completes.
    pub async fn serve(self, app: Router, mut shutdown: watch::Receiver<bool>) -> Result<(), LinkError> {
        info!(address = %self.local_addr, "link listener serving");
        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.wait_for(|stop| *stop).await;
                debug!("link listener shutdown requested");
            })
            .await
            .map_err(LinkError::Server)?;
        info!(address = %self.local_addr, "link listener stopped");
        Ok(())
    }
}

/// Build the router of one session.
pub fn router(session: Arc<LinkSession>, assets: Arc<Assets>) -> Router {
    let callback_path = session.callback_path().to_string();
    Router::new()
        .route("/", get(index))
        .route("/static/{*path}", get(static_file))
        .route(&callback_path, post(callback))
        .fallback(not_found)
        .with_state(AppState { session, assets })
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /` — consent page.
async fn index(State(state): State<AppState>) -> Html<String> {
    debug!(
        environment = %state.session.settings().environment,
        "consent page requested"
    );
    Html(state.session.page().to_string())
}

/// `GET /static/{*path}` — read-only asset.
async fn static_file(State(state): State<AppState>, Path(path): Path<String>) -> Response {
    match state.assets.get(&path) {
        Some(asset) => (
            [(header::CONTENT_TYPE, asset.content_type)],
            asset.body.clone(),
        )
            .into_response(),
        None => {
            debug!(%path, "unknown static asset");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// `POST <callback>` — exchange the public token and resolve the session.
///
/// Only the first valid callback runs an exchange; later ones get a 409
/// without touching the outcome channel. The exchange and the publish run
/// on their own task so a dropped request cannot lose a spent token.
async fn callback(
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Html<&'static str>, CallbackError> {
    let token = fields
        .into_iter()
        .find(|(key, _)| key == "public_token")
        .map(|(_, value)| value)
        .filter(|value| !value.is_empty())
        .ok_or(CallbackError::MissingToken)?;

    let sender = state
        .session
        .claim()
        .ok_or(CallbackError::AlreadyResolved)?;

    info!(
        institution = %state.session.gateway().institution(),
        "public token received, exchanging"
    );

    let session = Arc::clone(&state.session);
    let exchange = tokio::spawn(async move {
        match session.gateway().exchange(&token).await {
            Ok(credential) => {
                sender.publish(LinkOutcome::Succeeded(credential));
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                sender.publish(LinkOutcome::Failed(e));
                Err(message)
            }
        }
    });

    match exchange.await {
        Ok(Ok(())) => Ok(Html(LINKED_HTML)),
        Ok(Err(message)) => Err(CallbackError::ExchangeFailed(message)),
        Err(e) => Err(CallbackError::ExchangeFailed(format!("exchange task failed: {e}"))),
    }
}

async fn not_found(uri: Uri) -> StatusCode {
    debug!(%uri, "no route");
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::response::IntoResponse;
    use axum::Json;
    use axum_test::TestServer;
    use legerdemain_models::LinkSettings;
    use legerdemain_plaid::{ExchangeGateway, PlaidClient};
    use serde_json::{json, Value};
    use tokio::sync::oneshot;

    /// Mock exchange endpoint: `tok_bad` fails, everything else succeeds.
    async fn spawn_plaid_mock(calls: Arc<AtomicUsize>) -> String {
        let app = Router::new().route(
            "/item/public_token/exchange",
            post(move |Json(body): Json<Value>| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    if body["public_token"] == "tok_bad" {
                        return (
                            StatusCode::BAD_REQUEST,
                            Json(json!({
                                "error_type": "INVALID_INPUT",
                                "error_code": "INVALID_PUBLIC_TOKEN",
                                "error_message": "bad token"
                            })),
                        )
                            .into_response();
                    }
                    Json(json!({ "access_token": "acc_123", "item_id": "item_1" })).into_response()
                }
            }),
        );
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    struct Harness {
        server: TestServer,
        outcome: oneshot::Receiver<LinkOutcome>,
        shutdown: watch::Receiver<bool>,
        calls: Arc<AtomicUsize>,
    }

    async fn harness() -> Harness {
        let calls = Arc::new(AtomicUsize::new(0));
        let base = spawn_plaid_mock(calls.clone()).await;
        let gateway = ExchangeGateway::new(
            PlaidClient::with_base_url(&base, "id", "secret").unwrap(),
            "Chase",
        );
        let settings = LinkSettings::new("transactions", "sandbox", "pk_test");
        let assets = Arc::new(Assets::load(None).unwrap());
        let page = assets.template().render(&settings, "/get_access_token");
        let (shutdown_tx, shutdown) = watch::channel(false);
        let (session, outcome) = LinkSession::new(
            settings,
            page,
            "/get_access_token",
            gateway,
            Arc::new(shutdown_tx),
        );
        let server = TestServer::new(router(Arc::new(session), assets)).unwrap();
        Harness {
            server,
            outcome,
            shutdown,
            calls,
        }
    }

    #[tokio::test]
    async fn index_renders_settings_and_is_idempotent() {
        let h = harness().await;
        let first = h.server.get("/").await;
        first.assert_status_ok();
        let body = first.text();
        assert!(body.contains(r#"data-public-key="pk_test""#));
        assert!(body.contains(r#"data-products="transactions""#));

        let second = h.server.get("/").await;
        assert_eq!(second.text(), body);
    }

    #[tokio::test]
    async fn static_assets_are_served() {
        let h = harness().await;
        let res = h.server.get("/static/link.js").await;
        res.assert_status_ok();
        assert_eq!(
            res.header("content-type"),
            "text/javascript; charset=utf-8"
        );
        assert!(res.text().contains("public_token"));

        h.server
            .get("/static/missing.js")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn stray_requests_are_404() {
        let h = harness().await;
        h.server
            .get("/favicon.ico")
            .await
            .assert_status(StatusCode::NOT_FOUND);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert!(!*h.shutdown.borrow());
    }

    #[tokio::test]
    async fn callback_success_publishes_credential() {
        let h = harness().await;
        let res = h
            .server
            .post("/get_access_token")
            .form(&[("public_token", "tok_abc")])
            .await;
        res.assert_status_ok();
        assert!(res.text().contains("Linked"));

        match h.outcome.await.unwrap() {
            LinkOutcome::Succeeded(c) => {
                assert_eq!(c.access_token.expose(), "acc_123");
                assert_eq!(c.item_id.as_str(), "item_1");
            }
            LinkOutcome::Failed(e) => panic!("unexpected failure: {e}"),
        }
        assert!(*h.shutdown.borrow());
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn callback_failure_publishes_error() {
        let h = harness().await;
        let res = h
            .server
            .post("/get_access_token")
            .form(&[("public_token", "tok_bad")])
            .await;
        res.assert_status(StatusCode::BAD_GATEWAY);
        let body: Value = res.json();
        assert!(body["error"].as_str().unwrap().contains("INVALID_PUBLIC_TOKEN"));

        assert!(matches!(h.outcome.await.unwrap(), LinkOutcome::Failed(_)));
        assert!(*h.shutdown.borrow());
    }

    #[tokio::test]
    async fn first_token_value_wins() {
        let h = harness().await;
        h.server
            .post("/get_access_token")
            .form(&[("public_token", "tok_abc"), ("public_token", "tok_bad")])
            .await
            .assert_status_ok();
        assert!(matches!(h.outcome.await.unwrap(), LinkOutcome::Succeeded(_)));
    }

    #[tokio::test]
    async fn missing_token_keeps_session_open() {
        let h = harness().await;
        h.server
            .post("/get_access_token")
            .form(&[("other", "x")])
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        h.server
            .post("/get_access_token")
            .form(&[("public_token", "")])
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert!(!*h.shutdown.borrow());

        // A proper callback afterwards still resolves the session.
        h.server
            .post("/get_access_token")
            .form(&[("public_token", "tok_abc")])
            .await
            .assert_status_ok();
        assert!(matches!(h.outcome.await.unwrap(), LinkOutcome::Succeeded(_)));
    }

    #[tokio::test]
    async fn second_callback_is_a_no_op() {
        let h = harness().await;
        h.server
            .post("/get_access_token")
            .form(&[("public_token", "tok_abc")])
            .await
            .assert_status_ok();
        h.server
            .post("/get_access_token")
            .form(&[("public_token", "tok_bad")])
            .await
            .assert_status(StatusCode::CONFLICT);

        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
        assert!(matches!(h.outcome.await.unwrap(), LinkOutcome::Succeeded(_)));
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let first = LinkServer::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let err = LinkServer::bind(first.local_addr()).await.unwrap_err();
        assert!(matches!(err, LinkError::Bind { .. }));
    }
}
