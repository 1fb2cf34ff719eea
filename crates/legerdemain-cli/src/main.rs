//! `legerdemain` — refresh bank data for a plain-text accounting journal.
//!
//! Reads the Plaid configuration, fetches accounts for the configured
//! institutions and, when an institution's login has expired, walks the
//! user through re-linking it in the browser.

mod refresh;
mod store;

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use legerdemain_link::{Launcher, LinkConfig, ManualBrowser, SystemBrowser};
use legerdemain_plaid::AccountsResponse;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::refresh::Refresher;
use crate::store::ConfigStore;

#[derive(Parser, Debug)]
#[command(name = "legerdemain")]
#[command(author, version, about = "Refresh bank data for a plain-text accounting journal", long_about = None)]
struct Cli {
    /// Log at debug level.
    #[arg(long, global = true)]
    verbose: bool,

    /// Log at trace level.
    #[arg(long, global = true)]
    debug: bool,

    /// Directory holding plaid.json (default: the user config directory).
    #[arg(long, global = true, value_name = "DIR")]
    config: Option<PathBuf>,

    /// Path of the Plaid config file; overrides --config.
    #[arg(long, global = true, value_name = "FILE")]
    plaidconf: Option<PathBuf>,

    /// Environment entry to use (default: the first one in the file).
    #[arg(long, global = true)]
    environment: Option<String>,

    #[command(flatten)]
    link: LinkArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct LinkArgs {
    /// Loopback port of the consent page (default: $LINK_PORT or 8080).
    #[arg(long, global = true)]
    port: Option<u16>,

    /// Seconds to wait for the consent flow (default: $LINK_TIMEOUT_SECS or 300).
    #[arg(long, global = true, value_name = "SECS")]
    link_timeout: Option<u64>,

    /// Print the consent URL instead of opening a browser.
    #[arg(long, global = true)]
    no_browser: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch and print accounts, re-linking an expired institution if needed.
    Accounts {
        /// Index of the ledger user in the config file.
        #[arg(long, default_value_t = 0)]
        user: usize,

        /// Only this institution.
        #[arg(long)]
        institution: Option<String>,
    },
    /// Re-link an institution and store the new credential.
    Link {
        /// Index of the ledger user in the config file.
        #[arg(long, default_value_t = 0)]
        user: usize,

        /// Institution to re-link.
        #[arg(long)]
        institution: String,
    },
}

impl Cli {
    fn default_log_level(&self) -> &'static str {
        if self.debug {
            "trace"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    fn link_config(&self) -> LinkConfig {
        let mut config = LinkConfig::from_env();
        if let Some(port) = self.link.port {
            config = config.with_port(port);
        }
        if let Some(secs) = self.link.link_timeout {
            config.timeout = Duration::from_secs(secs);
        }
        config
    }

    fn launcher(&self) -> Arc<dyn Launcher> {
        if self.link.no_browser {
            Arc::new(ManualBrowser)
        } else {
            Arc::new(SystemBrowser)
        }
    }
}

fn init_tracing(default_level: &str) {
    // RUST_LOG wins over the command-line flags.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_accounts(institution: &str, res: &AccountsResponse) {
    println!("{institution}");
    for account in &res.accounts {
        let balance = account
            .balances
            .current
            .map(|b| format!("{b:.2}"))
            .unwrap_or_else(|| "-".to_string());
        let currency = account.balances.iso_currency_code.as_deref().unwrap_or("");
        println!(
            "  {:<28} {:>6} {:<12} {:>14} {}",
            account.name,
            account.mask.as_deref().unwrap_or(""),
            account.subtype.as_deref().unwrap_or(&account.account_type),
            balance,
            currency
        );
    }
}

async fn run(cli: Cli) -> Result<()> {
    let path = match &cli.plaidconf {
        Some(path) => path.clone(),
        None => store::default_path(cli.config.as_deref())?,
    };
    let store = ConfigStore::new(path);
    let config = store.load()?;

    let mut refresher = Refresher::new(
        store,
        config,
        cli.environment.as_deref(),
        cli.link_config(),
        cli.launcher(),
    )?;

    match &cli.command {
        Commands::Accounts { user, institution } => {
            for name in refresher.institutions(*user, institution.as_deref())? {
                let accounts = refresher.accounts(*user, &name).await?;
                print_accounts(&name, &accounts);
            }
        }
        Commands::Link { user, institution } => {
            refresher.config().institution(*user, institution)?;
            let credential = refresher.relink(*user, institution).await?;
            println!("{} linked (item {})", credential.institution, credential.item_id);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.default_log_level());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
