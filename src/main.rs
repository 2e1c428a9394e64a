use anyhow::{Context, Result, anyhow};
use claim_sweeper::config::DEFAULT_SITE;
use claim_sweeper::dump::DEFAULT_DUMP_FILE;
use claim_sweeper::input::read_entity_ids;
use claim_sweeper::{
    Credentials, EntityId, MatchPredicate, PropertyId, RetryPolicy, SessionRegistry, Sweeper,
    SweeperConfig, value_equals,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "claim-sweeper")]
#[command(about = "Bulk removal of Wikibase statements")]
struct Cli {
    /// Wiki domain
    #[arg(long, global = true, default_value = DEFAULT_SITE)]
    site: String,

    #[arg(long, global = true, default_value_t = 10)]
    retry_attempts: u32,

    #[arg(long, global = true, default_value_t = 15_000)]
    retry_delay_ms: u64,

    /// Log elapsed time of every API call
    #[arg(long, global = true)]
    debug_timing: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct Selection {
    /// Text file with one entity id per line
    #[arg(long)]
    ids: PathBuf,
    #[arg(long)]
    property: String,
    /// Upper bound on concurrently processed chunks
    #[arg(long, default_value_t = 4)]
    chunks: usize,
}

#[derive(Subcommand)]
enum Command {
    /// Remove every value of a property
    RemoveProperty {
        #[command(flatten)]
        selection: Selection,
    },
    /// Remove the values of a property equal to a given value
    RemoveValue {
        #[command(flatten)]
        selection: Selection,
        #[arg(long)]
        value: String,
    },
    /// Save ids of matching statements for a later `remove-ids`
    Select {
        #[command(flatten)]
        selection: Selection,
        #[arg(long)]
        value: Option<String>,
        #[arg(long, default_value = DEFAULT_DUMP_FILE)]
        out: PathBuf,
    },
    /// Remove statements listed by a previous `select`
    RemoveIds {
        #[arg(long, default_value = DEFAULT_DUMP_FILE)]
        input: PathBuf,
    },
    /// Purge the page cache of a title
    Purge {
        #[arg(long)]
        title: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = SweeperConfig::new(&cli.site)
        .retry(RetryPolicy::new(cli.retry_attempts, cli.retry_delay_ms))
        .debug_api_timing(cli.debug_timing);
    if let Some(chunks) = cli.command.chunks() {
        config = config.max_chunks(chunks);
    }
    config.validate().map_err(|err| anyhow!(err))?;

    let registry = SessionRegistry::new(config, credentials_from_env()?);
    let result = run(&registry, cli.command).await;
    registry.close().await;
    result
}

async fn run(registry: &SessionRegistry, command: Command) -> Result<()> {
    match command {
        Command::RemoveProperty { selection } => {
            let (ids, property) = load_selection(&selection).await?;
            let sweeper = connect(registry).await?;
            let summary = sweeper.remove_property_in_batches(&ids, &property).await;
            info!(
                "Removed {} from {} of {} entities.",
                property, summary.tally.succeeded, summary.tally.processed
            );
        }
        Command::RemoveValue { selection, value } => {
            let (ids, property) = load_selection(&selection).await?;
            let sweeper = connect(registry).await?;
            let predicate = value_equals(value);
            let summary = sweeper
                .remove_value_in_batches(&ids, &property, Some(predicate.as_ref()))
                .await;
            info!(
                "Removed {} values from {} of {} entities.",
                summary.tally.units_removed, summary.tally.succeeded, summary.tally.processed
            );
        }
        Command::Select {
            selection,
            value,
            out,
        } => {
            let (ids, property) = load_selection(&selection).await?;
            let sweeper = connect(registry).await?;
            let predicate: Option<Box<MatchPredicate>> = value.map(value_equals);
            sweeper
                .select_to_file(&ids, &property, predicate.as_deref(), &out)
                .await
                .with_context(|| format!("failed to write {}", out.display()))?;
        }
        Command::RemoveIds { input } => {
            let sweeper = connect(registry).await?;
            let removed = sweeper
                .remove_ids_from_file(&input)
                .await
                .with_context(|| format!("failed to read {}", input.display()))?;
            info!("Removed {} statements.", removed);
        }
        Command::Purge { title } => {
            let api = registry
                .default_session()
                .await
                .context("login failed")?;
            let purged = api.purge(&title).await.context("purge request failed")?;
            if !purged {
                return Err(anyhow!("page {} was not purged", title));
            }
        }
    }
    Ok(())
}

impl Command {
    fn chunks(&self) -> Option<usize> {
        match self {
            Command::RemoveProperty { selection }
            | Command::RemoveValue { selection, .. }
            | Command::Select { selection, .. } => Some(selection.chunks),
            Command::RemoveIds { .. } | Command::Purge { .. } => None,
        }
    }
}

async fn connect(registry: &SessionRegistry) -> Result<Sweeper> {
    Sweeper::connect(registry).await.context("login failed")
}

async fn load_selection(selection: &Selection) -> Result<(Vec<EntityId>, PropertyId)> {
    let ids = read_entity_ids(&selection.ids)
        .await
        .with_context(|| format!("failed to read ids from {}", selection.ids.display()))?;
    if ids.is_empty() {
        return Err(anyhow!("no entity ids found in {}", selection.ids.display()));
    }
    Ok((ids, PropertyId::new(selection.property.as_str())))
}

fn credentials_from_env() -> Result<Credentials> {
    let username = std::env::var("SWEEPER_USERNAME").context("SWEEPER_USERNAME is not set")?;
    let password = std::env::var("SWEEPER_PASSWORD").context("SWEEPER_PASSWORD is not set")?;
    Ok(Credentials::new(&username, &password))
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
