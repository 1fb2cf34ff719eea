//! State of one link session.
//!
//! The outcome travels through a single [`oneshot`] channel whose sender
//! sits in a take-once slot: the first callback takes it, later ones find
//! the slot empty. Delivering twice is therefore impossible, and a late
//! publish after the coordinator gave up is dropped instead of panicking.

use std::sync::{Arc, Mutex, PoisonError};

use legerdemain_models::{Credential, LinkSettings};
use legerdemain_plaid::{ExchangeError, ExchangeGateway};
use tokio::sync::{oneshot, watch};
use tracing::warn;

/// Final result of a link session.
#[derive(Debug)]
pub enum LinkOutcome {
    /// The exchange issued a durable credential.
    Succeeded(Credential),
    /// The exchange failed.
    Failed(ExchangeError),
}

/// Everything the HTTP handlers of one session share.
#[derive(Debug)]
pub struct LinkSession {
    settings: LinkSettings,
    page: String,
    callback_path: String,
    gateway: ExchangeGateway,
    outcome: Mutex<Option<oneshot::Sender<LinkOutcome>>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl LinkSession {
    /// Create a session, returning the receiving end of its outcome.
    pub fn new(
        settings: LinkSettings,
        page: String,
        callback_path: &str,
        gateway: ExchangeGateway,
        shutdown: Arc<watch::Sender<bool>>,
    ) -> (Self, oneshot::Receiver<LinkOutcome>) {
        let (tx, rx) = oneshot::channel();
        let session = Self {
            settings,
            page,
            callback_path: callback_path.to_string(),
            gateway,
            outcome: Mutex::new(Some(tx)),
            shutdown,
        };
        (session, rx)
    }

    /// Settings the consent page was rendered with.
    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    /// Pre-rendered consent page.
    pub fn page(&self) -> &str {
        &self.page
    }

    /// Route the consent page posts to.
    pub fn callback_path(&self) -> &str {
        &self.callback_path
    }

    /// Gateway used by the callback.
    pub fn gateway(&self) -> &ExchangeGateway {
        &self.gateway
    }

    /// Claim the right to resolve the session.
    ///
    /// Returns `None` once any caller has claimed it.
    pub fn claim(&self) -> Option<OutcomeSender> {
        self.outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|tx| OutcomeSender {
                tx,
                shutdown: Arc::clone(&self.shutdown),
            })
    }
}

/// Exclusive right to publish a session's outcome.
#[derive(Debug)]
pub struct OutcomeSender {
    tx: oneshot::Sender<LinkOutcome>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl OutcomeSender {
    /// Publish the outcome, then ask the listener to stop.
    pub fn publish(self, outcome: LinkOutcome) {
        if self.tx.send(outcome).is_err() {
            warn!("link outcome produced after the coordinator stopped waiting; dropped");
        }
        self.shutdown.send_replace(true);
    }
}
