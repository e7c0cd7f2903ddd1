//! Browse the dytt movie catalog through a local cache.
//!
//! Every command prints the cached view first, then the view after the
//! remote site has been consulted.

mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use dytt_cache::{Database, Repository};
use dytt_config::{Config, Staleness};
use dytt_extract::models::{CategoryKey, Scope};
use dytt_remote::source::HttpSource;
use dytt_sync::{SearchSession, StalenessPolicy, SyncOptions, Synchronizer};
use exn::ResultExt;
use tracing_subscriber::EnvFilter;

use crate::error::{ErrorKind, Result};
use crate::output::report;

#[derive(Parser, Debug)]
#[command(name = "dytt", version)]
#[command(about = "Browse the dytt movie catalog through a local cache")]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List a category: home, new, china, oumei or rihan
    List {
        category: String,
        /// Load the page after the last one loaded
        #[arg(long)]
        more: bool,
    },
    /// Search titles, then fetch the details of every result
    Search {
        query: String,
        /// Also load the second page of results
        #[arg(long)]
        more: bool,
    },
    /// Show the details of one video
    Detail { id: u64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if *err == ErrorKind::Resolution => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("error: {err:?}");
            ExitCode::FAILURE
        },
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    init_tracing(&config.log.level);
    tracing::debug!(cache = %config.cache.path.display(), site = %config.remote.base_url, "starting");

    let db = open_cache(&config).await?;
    let sync = Synchronizer::new(Arc::new(remote(&config)?), Arc::new(Repository::from(&db)), options(&config));
    let succeeded = match cli.command {
        Command::List { category, more } => {
            let category = category.parse::<CategoryKey>().or_raise(|| ErrorKind::Argument(category.clone()))?;
            if category == CategoryKey::Search {
                exn::bail!(ErrorKind::Argument("use the search command to search".to_string()));
            }
            let scope = Scope::category(category);
            match more {
                true => report(sync.load_more(scope).await).await,
                false => report(sync.listing(scope, false).await).await,
            }
        },
        Command::Search { query, more } => {
            let session = SearchSession::new(sync);
            let stream = session.set_query(&query).await.or_raise(|| ErrorKind::Argument(query.clone()))?;
            let mut succeeded = match stream {
                Some(stream) => report(stream).await,
                None => true,
            };
            if more && let Some(stream) = session.load_more().await {
                succeeded &= report(stream).await;
            }
            succeeded
        },
        Command::Detail { id } => report(sync.detail(id).await).await,
    };
    db.close().await;

    match succeeded {
        true => Ok(()),
        false => exn::bail!(ErrorKind::Resolution),
    }
}

fn init_tracing(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn remote(config: &Config) -> Result<HttpSource> {
    HttpSource::new(&config.remote.base_url)
        .and_then(|source| source.with_timeout(Duration::from_secs(config.remote.timeout_secs)))
        .and_then(|source| source.with_user_agent(&config.remote.user_agent))
        .or_raise(|| ErrorKind::Remote)
}

async fn open_cache(config: &Config) -> Result<Database> {
    if let Some(parent) = config.cache.path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Cache)?;
    }
    Database::connect(&config.cache.path).await.or_raise(|| ErrorKind::Cache)
}

fn options(config: &Config) -> SyncOptions {
    SyncOptions {
        staleness: match config.sync.staleness {
            Staleness::Always => StalenessPolicy::Always,
            Staleness::WhenEmpty => StalenessPolicy::WhenEmpty,
        },
        detail_concurrency: config.sync.detail_concurrency,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_list_category_parses() {
        let cli = Cli::try_parse_from(["dytt", "list", "china", "--more"]).unwrap();
        let Command::List { category, more } = cli.command else {
            panic!("expected the list command");
        };
        assert!(more);
        assert_eq!(category.parse::<CategoryKey>().unwrap(), CategoryKey::China);
    }
}
