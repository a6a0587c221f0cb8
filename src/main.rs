use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vod_resolve::{
    config::Config,
    models::{CatalogEntry, ContainerId, ContentKind, PlaybackRequest, QualityTag},
    repositories::InMemoryLibraryStore,
    services::{FailoverManager, Materializer, PlaybackResolver},
    sources::StremioStreamSource,
    utils::{IdentityGenerator, identity::canonical_string},
};

#[derive(Parser)]
#[command(name = "vod-resolve")]
#[command(version)]
#[command(about = "Versioned VOD item materialization and playback resolution")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the content identity of one version
    Identity {
        #[arg(short, long, default_value = "movie")]
        kind: ContentKind,
        /// External catalog id
        #[arg(long)]
        id: i64,
        #[arg(short, long)]
        quality: Option<QualityTag>,
        #[arg(short, long)]
        index: Option<u32>,
    },

    /// Print the version tasks planned for one catalog entry
    Plan,

    /// Materialize a catalog entry into an in-memory library
    Materialize {
        /// JSON file holding the catalog entry
        #[arg(short, long)]
        entry: String,
        /// Library container to insert under
        #[arg(long, default_value = "library")]
        container: String,
    },

    /// Resolve a playback request against the upstream stream source
    Resolve {
        /// Playback path, e.g. vodresolve://movie/tt0133093?quality=1080p&index=0
        #[arg(long, conflicts_with_all = ["kind", "key"])]
        path: Option<String>,
        #[arg(short, long, default_value = "movie")]
        kind: ContentKind,
        /// Routing key (cross-reference id)
        #[arg(long, required_unless_present = "path")]
        key: Option<String>,
        #[arg(long, requires = "episode")]
        season: Option<u32>,
        #[arg(long, requires = "season")]
        episode: Option<u32>,
        #[arg(short, long)]
        quality: Option<String>,
        #[arg(short, long)]
        index: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("vod_resolve={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    match cli.command {
        Command::Identity {
            kind,
            id,
            quality,
            index,
        } => {
            let quality = quality.unwrap_or_default();
            let generator = IdentityGenerator::new(config.identity.namespace.clone());
            let canonical = canonical_string(
                generator.namespace(),
                kind,
                id,
                quality,
                index.unwrap_or(0),
            );
            println!("{}\t{}", generator.identity(kind, id, quality, index), canonical);
        }

        Command::Plan => {
            let store = Arc::new(InMemoryLibraryStore::new());
            let materializer = Materializer::new(store, &config);
            for (position, task) in materializer.batch_tasks().iter().enumerate() {
                let role = if position == 0 { "primary" } else { "version" };
                println!("{role}\t{task}\t{:?}", task.display_suffix());
            }
        }

        Command::Materialize { entry, container } => {
            let raw = std::fs::read_to_string(&entry).with_context(|| format!("reading {entry}"))?;
            let entry: CatalogEntry =
                serde_json::from_str(&raw).with_context(|| format!("parsing {entry}"))?;

            let container = ContainerId::new(container);
            let store = InMemoryLibraryStore::with_container(container.clone());
            let materializer = Materializer::new(Arc::new(store.clone()), &config);

            let outcome = materializer.materialize(&entry, &container).await?;
            info!(
                "Primary {} ({}), {} task(s) created",
                outcome.primary.id,
                if outcome.created { "new" } else { "existing" },
                outcome.created_count()
            );
            println!("{}", serde_json::to_string_pretty(&store.items().await)?);
        }

        Command::Resolve {
            path,
            kind,
            key,
            season,
            episode,
            quality,
            index,
        } => {
            let source =
                StremioStreamSource::new(&config.upstream.base_url, config.upstream.timeout)?;
            let failover = Arc::new(FailoverManager::new(config.failover.clone()));
            let resolver = PlaybackResolver::new(Arc::new(source), failover, &config);

            let resolution = match path {
                Some(path) => resolver.resolve_path(&path).await?,
                None => {
                    let request = PlaybackRequest {
                        kind,
                        routing_key: key.context("--key is required without --path")?,
                        season,
                        episode,
                        quality,
                        index,
                    };
                    resolver.resolve(&request).await?
                }
            };
            info!(
                "Selected candidate {} of {}: {}",
                resolution.index, resolution.pool_size, resolution.description
            );
            println!("{}", resolution.url);
        }
    }

    Ok(())
}
