//! Account refresh with on-demand re-linking.
//!
//! A failed remote call is classified; only a login-required failure starts
//! the interactive link flow. The new credential is written back to the
//! config file before the original call is retried once with it.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use legerdemain_link::{Launcher, LinkConfig, LinkCoordinator};
use legerdemain_models::{Credential, LinkSettings, PlaidConfig, DEFAULT_PRODUCTS};
use legerdemain_plaid::{
    classify, AccountsResponse, ExchangeGateway, PlaidClient, ReauthContext, RemoteError,
};
use tracing::{info, warn};

use crate::store::ConfigStore;

/// Runs remote calls for the configured institutions of one environment.
pub struct Refresher {
    store: ConfigStore,
    config: PlaidConfig,
    environment: String,
    client: PlaidClient,
    link_config: LinkConfig,
    launcher: Arc<dyn Launcher>,
    relinked: bool,
}

impl Refresher {
    pub fn new(
        store: ConfigStore,
        config: PlaidConfig,
        environment: Option<&str>,
        link_config: LinkConfig,
        launcher: Arc<dyn Launcher>,
    ) -> Result<Self> {
        let environment = config.environment(environment)?.name.clone();
        let client = PlaidClient::from_config(&config, Some(&environment))
            .context("failed to build the Plaid client")?;
        Ok(Self {
            store,
            config,
            environment,
            client,
            link_config,
            launcher,
            relinked: false,
        })
    }

    pub fn config(&self) -> &PlaidConfig {
        &self.config
    }

    /// Names of the institutions of `user`, optionally narrowed to one.
    pub fn institutions(&self, user: usize, only: Option<&str>) -> Result<Vec<String>> {
        if let Some(only) = only {
            return Ok(vec![self.config.institution(user, only)?.name.clone()]);
        }
        Ok(self
            .config
            .user(user)?
            .institutions
            .iter()
            .map(|i| i.name.clone())
            .collect())
    }

    /// Fetch the accounts of one institution, re-linking if its login expired.
    pub async fn accounts(&mut self, user: usize, institution: &str) -> Result<AccountsResponse> {
        let stored = self.config.institution(user, institution)?.clone();
        if stored.access_token.is_empty() {
            info!(institution = %stored.name, "no stored credential; linking");
            let credential = self.relink(user, institution).await?;
            return self.fetch_with(&credential).await;
        }

        match self.client.get_accounts(&stored.access_token).await {
            Ok(accounts) => Ok(accounts),
            Err(e) => match classify(e, ReauthContext::new(&stored.name, stored.item_id.clone())) {
                RemoteError::ReauthRequired(ctx) => {
                    warn!(
                        institution = %ctx.institution,
                        item_id = %ctx.item_id,
                        "institution login expired; re-linking"
                    );
                    let credential = self.relink(user, &ctx.institution).await?;
                    self.fetch_with(&credential).await
                }
                RemoteError::Other(e) => {
                    Err(e).with_context(|| format!("fetching accounts of {institution}"))
                }
            },
        }
    }

    /// Run the consent flow for `institution` and persist the new credential.
    ///
    /// Only one interactive session is supported per run.
    pub async fn relink(&mut self, user: usize, institution: &str) -> Result<Credential> {
        if self.relinked {
            bail!("{institution} also needs re-linking; only one institution can be re-linked per run, run again");
        }
        self.relinked = true;

        let settings = LinkSettings::new(DEFAULT_PRODUCTS, &self.environment, &self.config.public_key);
        let gateway = ExchangeGateway::new(self.client.clone(), institution);
        let credential = LinkCoordinator::new(self.link_config.clone(), gateway)
            .with_launcher(Arc::clone(&self.launcher))
            .link(settings)
            .await
            .with_context(|| format!("re-linking {institution} failed"))?;

        self.config.replace_credential(user, &credential)?;
        self.store
            .save(&self.config)
            .context("re-link succeeded but the new credential could not be saved")?;
        info!(institution = %institution, item_id = %credential.item_id, "credential refreshed");
        Ok(credential)
    }

    async fn fetch_with(&self, credential: &Credential) -> Result<AccountsResponse> {
        self.client
            .get_accounts(&credential.access_token)
            .await
            .with_context(|| format!("fetching accounts of {} after re-link", credential.institution))
    }
}
