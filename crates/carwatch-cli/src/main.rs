//! carwatch binary.
//!
//! Reads `carwatch.toml` (or the path given with `--config`), connects to
//! Postgres or falls back to SQLite, and crawls listings into it.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use carwatch_cli::{
  Error,
  backend::{self, Selected},
  config::Settings,
  http::HttpFetcher,
  pacing::Pacing,
  pipeline::Crawler,
};
use carwatch_core::{gateway::Gateway, identity::IdentityResolver, session};
use carwatch_extract::kavak::Kavak;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Vehicle listing crawler")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "carwatch.toml")]
  config: PathBuf,

  /// Skip Postgres even when it is configured.
  #[arg(long)]
  sqlite_only: bool,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Crawl listing pages into the store, as one scrape session.
  Run {
    /// Stop after this many listing pages.
    #[arg(long)]
    max_pages: Option<u32>,
  },
  /// Print recent scrape sessions as JSON lines, newest first.
  Sessions {
    #[arg(long, default_value_t = 20)]
    limit: usize,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)
    .with_context(|| format!("failed to read config from {:?}", cli.config))?;
  if let Command::Run { max_pages: Some(n) } = cli.command {
    settings.max_pages = Some(n);
  }

  match backend::connect(&settings.database, cli.sqlite_only).await? {
    Selected::Postgres(store) => dispatch(store, &settings, &cli.command).await,
    Selected::Sqlite(store) => dispatch(store, &settings, &cli.command).await,
  }
}

async fn dispatch<G: Gateway + 'static>(
  store: G,
  settings: &Settings,
  command: &Command,
) -> anyhow::Result<()> {
  match command {
    Command::Run { .. } => crawl(store, settings).await,
    Command::Sessions { limit } => {
      for s in session::list_sessions(&store, *limit).await? {
        println!("{}", serde_json::to_string(&s)?);
      }
      Ok(())
    }
  }
}

async fn crawl<G: Gateway + 'static>(store: G, settings: &Settings) -> anyhow::Result<()> {
  let resolver = Arc::new(IdentityResolver::new(Arc::new(store)));
  let fetcher = HttpFetcher::new(&settings.user_agent, settings.request_timeout())
    .context("failed to build http client")?;
  let site = Kavak::new(settings.base_url.clone()).context("invalid site profile")?;

  let crawler = Crawler::new(resolver, fetcher, site)
    .pacing(Pacing::from(&settings.pacing))
    .pages(settings.start_page, settings.max_pages)
    .media_dir(settings.media_dir.clone());

  let shutdown = async {
    if tokio::signal::ctrl_c().await.is_err() {
      std::future::pending::<()>().await;
    }
  };

  match crawler.run(shutdown).await.context("failed to open scrape session")? {
    Ok(summary) => {
      tracing::info!(?summary, "run complete");
      Ok(())
    }
    Err(Error::Cancelled) => {
      tracing::warn!("run cancelled");
      Ok(())
    }
    Err(e) => Err(e).context("crawl failed"),
  }
}
