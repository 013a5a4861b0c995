use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use forum_search::{
    config::Config,
    indexing::{gather_metrics, ChangeSync, ContentEvent, IndexOptions, Orchestrator, WorkerQueue},
    models::Actor,
    search::{
        ElasticClient, ElasticSettings, RelevanceQueryBuilder, SearchEngine, SearchParams,
        SearchService,
    },
    seeders::SeederRegistry,
    state::{create_checkpoint_store, ForumSnapshot, ForumStore, InMemoryForumStore},
    telemetry,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser)]
#[command(name = "forum-search")]
#[command(about = "Forum search index synchronizer and relevance search", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan forum rows into the search index
    Index(IndexArgs),

    /// Run a relevance search and print the ranked discussions
    Search(SearchArgs),

    /// Apply newline-delimited content events read from stdin
    Sync {
        /// Pending events before reading pauses
        #[arg(short, long, default_value = "256")]
        capacity: usize,
    },
}

#[derive(Args)]
struct IndexArgs {
    /// Ignore rows above this id
    #[arg(long)]
    max_id: Option<i64>,

    /// Seconds to pause between windows
    #[arg(long)]
    throttle: Option<u64>,

    /// Index only this content type
    #[arg(long)]
    only: Option<String>,

    /// Drop and create the index first
    #[arg(long)]
    recreate: bool,

    /// Update the field mapping first
    #[arg(long)]
    mapping: bool,

    /// Resume from the stored checkpoint
    #[arg(long = "continue")]
    continue_run: bool,

    /// Index only rows absent from the index
    #[arg(long)]
    seed_missing: bool,

    /// List rows absent from the index without writing
    #[arg(long)]
    find_missing: bool,

    /// Print indexing metrics in the Prometheus text format when done
    #[arg(long)]
    metrics: bool,
}

#[derive(Args)]
struct SearchArgs {
    /// Search text, `is:private` limits results to private discussions
    #[arg(short, long, default_value = "")]
    q: String,

    /// Tag slug
    #[arg(short, long)]
    tag: Option<String>,

    /// Sort list, e.g. `-lastPostedAt`
    #[arg(short, long)]
    sort: Option<String>,

    #[arg(short, long)]
    limit: Option<usize>,

    #[arg(short, long, default_value = "0")]
    offset: usize,

    /// Relations to attach: firstPost, lastPost, mostRelevantPost
    #[arg(short, long)]
    include: Option<String>,

    /// Searching user id, 0 for a guest
    #[arg(short = 'a', long, default_value = "0")]
    actor: i64,

    /// Comma separated group ids of the searching user
    #[arg(short, long, value_delimiter = ',')]
    groups: Vec<i64>,

    /// The searching user may see hidden discussions
    #[arg(long)]
    can_view_hidden: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("Failed to load configuration")?;
    telemetry::init(&config.observability);

    tracing::info!("Starting forum-search v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Index(args) => index(&config, args).await,
        Commands::Search(args) => search(&config, args).await,
        Commands::Sync { capacity } => sync(&config, capacity).await,
    }
}

fn engine(config: &Config) -> anyhow::Result<Arc<dyn SearchEngine>> {
    let settings = ElasticSettings {
        username: config.engine.username.clone(),
        password: config.engine.password(),
        timeout_secs: config.engine.timeout_secs,
        ..ElasticSettings::new(&config.engine.url, &config.engine.index)
    };
    let client = ElasticClient::new(settings).context("Failed to create search engine client")?;
    Ok(Arc::new(client))
}

async fn forum_store(config: &Config) -> anyhow::Result<Arc<InMemoryForumStore>> {
    match &config.source.snapshot_path {
        Some(path) => {
            let snapshot = ForumSnapshot::load(path)
                .await
                .with_context(|| format!("Failed to load forum snapshot {}", path.display()))?;
            Ok(Arc::new(snapshot.into_store()))
        }
        None => {
            tracing::warn!("No forum snapshot configured, using an empty store");
            Ok(Arc::new(InMemoryForumStore::new()))
        }
    }
}

fn registry(config: &Config, store: Arc<dyn ForumStore>) -> SeederRegistry {
    SeederRegistry::from_config(store, &config.search)
}

async fn index(config: &Config, args: IndexArgs) -> anyhow::Result<()> {
    let engine = engine(config)?;
    let store = forum_store(config).await?;
    let checkpoints = create_checkpoint_store(&config.state).await?;
    let queue = Arc::new(WorkerQueue::new(
        engine.clone(),
        config.indexing.workers,
        config.indexing.queue_capacity,
    ));

    let orchestrator = Orchestrator::new(registry(config, store), engine, checkpoints, queue)
        .with_window_size(config.indexing.window_size)
        .with_tokenizer(config.engine.tokenizer.clone());

    let throttle = args
        .throttle
        .unwrap_or(config.indexing.throttle_secs);
    let options = IndexOptions {
        max_id: args.max_id,
        throttle: (throttle > 0).then(|| Duration::from_secs(throttle)),
        only: args.only,
        recreate: args.recreate,
        mapping: args.mapping,
        continue_run: args.continue_run,
        seed_missing: args.seed_missing,
        find_missing: args.find_missing,
    };

    let result = orchestrator.run(&options).await;
    if args.metrics {
        print!("{}", gather_metrics());
    }
    let report = result?;

    for type_report in &report.types {
        println!(
            "{}: {} rows in {} windows, {} jobs",
            type_report.content_type,
            type_report.rows,
            type_report.windows.len(),
            type_report.jobs_enqueued
        );
        if options.find_missing {
            println!("{}", serde_json::to_string(&type_report.missing_ids)?);
        }
    }
    for failure in &report.queue.failures {
        eprintln!(
            "failed: {} {:?}: {}",
            failure.content_type, failure.id_range, failure.error
        );
    }

    Ok(())
}

async fn search(config: &Config, args: SearchArgs) -> anyhow::Result<()> {
    let engine = engine(config)?;
    let store = forum_store(config).await?;
    let registry = registry(config, store.clone());
    let builder = RelevanceQueryBuilder::new(config.search.clone(), registry.searchers());
    let service = SearchService::new(builder, engine, store);

    let actor = if args.actor > 0 {
        Actor::user(args.actor, args.groups).with_hidden_access(args.can_view_hidden)
    } else {
        Actor::guest()
    };
    let params = SearchParams {
        q: args.q,
        tag: args.tag,
        sort: args.sort,
        limit: args.limit,
        offset: args.offset,
        include: args.include,
    };

    let results = service.search(&actor, &params).await?;
    println!("{}", serde_json::to_string_pretty(&results)?);

    Ok(())
}

async fn sync(config: &Config, capacity: usize) -> anyhow::Result<()> {
    let engine = engine(config)?;
    let store = forum_store(config).await?;
    let sync = Arc::new(ChangeSync::new(registry(config, store), engine));

    let (sender, receiver) = ChangeSync::channel(capacity);
    let consumer = sync.spawn(receiver);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ContentEvent>(&line) {
            Ok(event) => sender.send(event).await?,
            Err(e) => tracing::warn!(error = %e, "Skipping malformed event line"),
        }
    }

    drop(sender);
    consumer.await?;
    Ok(())
}
