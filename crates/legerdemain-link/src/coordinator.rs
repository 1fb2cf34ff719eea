//! Re-linking coordinator.
//!
//! Drives one interactive consent handshake:
//!
//! ```text
//! Idle ──link()──▶ Serving ──outcome──▶ Succeeded ─┐
//!                     │                            ├──▶ Stopped
//!                     └──error/timeout──▶ Failed ──┘
//! ```
//!
//! [`LinkCoordinator::link`] consumes the coordinator, so one coordinator
//! runs at most one session and two sessions can never overlap on it.

use std::sync::Arc;

use legerdemain_models::{Credential, LinkSettings};
use legerdemain_plaid::ExchangeGateway;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::assets::Assets;
use crate::browser::{Launcher, SystemBrowser};
use crate::config::LinkConfig;
use crate::error::LinkError;
use crate::server::{self, LinkServer};
use crate::session::{LinkOutcome, LinkSession};

/// Lifecycle of a link session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Nothing started yet.
    Idle,
    /// Listener up, waiting for the callback.
    Serving,
    /// A credential was issued.
    Succeeded,
    /// Exchange failed, listener died, or the wait timed out.
    Failed,
    /// Listener shut down (or abandoned after the grace period).
    Stopped,
}

impl LinkState {
    /// Whether `self → next` is a legal transition.
    pub fn can_transition_to(self, next: LinkState) -> bool {
        matches!(
            (self, next),
            (Self::Idle, Self::Serving)
                | (Self::Serving, Self::Succeeded | Self::Failed)
                | (Self::Succeeded | Self::Failed, Self::Stopped)
        )
    }
}

/// Owns the consent server for one handshake and hands the resulting
/// credential back to the caller.
pub struct LinkCoordinator {
    config: LinkConfig,
    gateway: ExchangeGateway,
    launcher: Box<dyn Launcher>,
    state: watch::Sender<LinkState>,
}

impl LinkCoordinator {
    /// Create a coordinator that opens the system browser.
    pub fn new(config: LinkConfig, gateway: ExchangeGateway) -> Self {
        let (state, _) = watch::channel(LinkState::Idle);
        Self {
            config,
            gateway,
            launcher: Box::new(SystemBrowser),
            state,
        }
    }

    /// Replace the browser launcher.
    #[must_use]
    pub fn with_launcher(mut self, launcher: impl Launcher + 'static) -> Self {
        self.launcher = Box::new(launcher);
        self
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    /// Run the handshake to completion.
    ///
    /// Bind and template failures are reported before anything is launched.
    /// Whatever the outcome, the listener is stopped (or abandoned after the
    /// configured grace period) before this returns.
    pub async fn link(self, settings: LinkSettings) -> Result<Credential, LinkError> {
        self.config.validate()?;

        let assets = Assets::load(self.config.assets_dir.as_deref())?;
        let page = assets.template().render(&settings, &self.config.callback_path);
        let server = LinkServer::bind(self.config.listen_addr).await?;
        let url = server.url();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown_tx = Arc::new(shutdown_tx);
        let (session, outcome_rx) = LinkSession::new(
            settings,
            page,
            &self.config.callback_path,
            self.gateway.clone(),
            Arc::clone(&shutdown_tx),
        );
        let app = server::router(Arc::new(session), Arc::new(assets));
        let server_task = tokio::spawn(server.serve(app, shutdown_rx));
        self.transition(LinkState::Serving);

        info!(
            institution = %self.gateway.institution(),
            %url,
            "waiting for consent; open the URL if no browser appears"
        );
        if let Err(e) = self.launcher.open(&url) {
            warn!(error = %e, %url, "could not open a browser");
        }

        let result = self.wait(outcome_rx).await;
        self.transition(if result.is_ok() {
            LinkState::Succeeded
        } else {
            LinkState::Failed
        });

        shutdown_tx.send_replace(true);
        let result = self.stop(server_task, result).await;
        self.transition(LinkState::Stopped);
        result
    }

    async fn wait(
        &self,
        outcome_rx: oneshot::Receiver<LinkOutcome>,
    ) -> Result<Credential, LinkError> {
        let timeout = self.config.timeout;
        tokio::select! {
            biased;
            outcome = outcome_rx => match outcome {
                Ok(LinkOutcome::Succeeded(credential)) => {
                    info!(
                        institution = %credential.institution,
                        item_id = %credential.item_id,
                        "link succeeded"
                    );
                    Ok(credential)
                }
                Ok(LinkOutcome::Failed(e)) => Err(LinkError::Exchange(e)),
                Err(_) => Err(LinkError::SessionClosed),
            },
            () = tokio::time::sleep(timeout) => Err(LinkError::Abandoned(timeout)),
        }
    }

    /// Wait for the listener to drain, aborting it after the grace period.
    async fn stop(
        &self,
        mut server_task: JoinHandle<Result<(), LinkError>>,
        result: Result<Credential, LinkError>,
    ) -> Result<Credential, LinkError> {
        match tokio::time::timeout(self.config.shutdown_grace, &mut server_task).await {
            Ok(Ok(Ok(()))) => {
                debug!("link listener drained");
                result
            }
            Ok(Ok(Err(e))) => match result {
                Err(LinkError::SessionClosed) => Err(e),
                other => {
                    warn!(error = %e, "link listener reported an error while stopping");
                    other
                }
            },
            Ok(Err(join_err)) => {
                warn!(error = %join_err, "link listener task failed");
                result
            }
            Err(_) => {
                warn!(
                    grace = ?self.config.shutdown_grace,
                    "link listener did not drain in time; abandoning it"
                );
                server_task.abort();
                let _ = server_task.await;
                result
            }
        }
    }

    fn transition(&self, next: LinkState) {
        let current = *self.state.borrow();
        debug_assert!(
            current.can_transition_to(next),
            "illegal link state transition {current:?} -> {next:?}"
        );
        debug!(from = ?current, to = ?next, "link state");
        self.state.send_replace(next);
    }
}
