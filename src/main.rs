use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use iyp_crawlers::crawlers::{self, HttpFetcher, RunReport};
use iyp_crawlers::graph_store::{GraphStore, MemoryGraphStore, Neo4jConfig, Neo4jGraphStore};
use iyp_crawlers::{BgpkitAs2RelCrawler, CrawlerConfig, PeeringDbIxCrawler, Result, StoreConfig};

#[derive(Parser, Debug)]
#[command(name = "iyp-crawl", version, about = "Push Internet routing datasets into a knowledge graph")]
struct Cli {
    #[command(subcommand)]
    crawler: CrawlerCommand,

    /// Graph store to write into
    #[arg(long, env = "IYP_STORE", value_enum, default_value_t = StoreKind::Neo4j)]
    store: StoreKind,

    #[arg(long, env = "IYP_NEO4J_URL", default_value = "http://localhost:7474")]
    neo4j_url: String,

    #[arg(long, env = "IYP_NEO4J_USER", default_value = "neo4j")]
    neo4j_user: String,

    #[arg(long, env = "IYP_NEO4J_PASSWORD", default_value = "password", hide_env_values = true)]
    neo4j_password: String,

    #[arg(long, env = "IYP_NEO4J_DATABASE", default_value = "neo4j")]
    neo4j_database: String,

    /// Directory for the per-crawler log file
    #[arg(long, env = "IYP_LOG_DIR", default_value = "log")]
    log_dir: PathBuf,

    /// Write the in-memory graph as JSON after the run (memory store only)
    #[arg(long)]
    dump: Option<PathBuf>,

    /// Do not draw a progress bar
    #[arg(long)]
    no_progress: bool,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum CrawlerCommand {
    /// AS relationships from BGPKIT
    BgpkitAs2rel,
    /// Exchange points and peering LANs from PeeringDB
    PeeringdbIx,
}

impl CrawlerCommand {
    fn name(&self) -> &'static str {
        match self {
            CrawlerCommand::BgpkitAs2rel => "bgpkit_as2rel",
            CrawlerCommand::PeeringdbIx => "peeringdb_ix",
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum StoreKind {
    Memory,
    Neo4j,
}

impl Cli {
    fn config(&self) -> CrawlerConfig {
        let store = match self.store {
            StoreKind::Memory => StoreConfig::Memory {
                dump: self.dump.clone(),
            },
            StoreKind::Neo4j => StoreConfig::Neo4j(Neo4jConfig {
                url: self.neo4j_url.clone(),
                user: self.neo4j_user.clone(),
                password: self.neo4j_password.clone(),
                database: self.neo4j_database.clone(),
            }),
        };
        CrawlerConfig::new()
            .with_store(store)
            .with_log_dir(&self.log_dir)
            .with_progress(!self.no_progress)
    }
}

/// Log lines go to `log/<crawler>.log`; stderr is left to the progress bar.
fn init_tracing(log_file: &Path) -> Result<()> {
    if let Some(parent) = log_file.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(log_file)?;
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
    Ok(())
}

fn run_on_store<S: GraphStore>(
    command: CrawlerCommand,
    config: &CrawlerConfig,
    store: S,
) -> Result<(RunReport, S)> {
    let fetcher = HttpFetcher::new()?;
    match command {
        CrawlerCommand::BgpkitAs2rel => {
            let crawler = BgpkitAs2RelCrawler::new(fetcher)
                .with_url(&config.as2rel_url)
                .with_progress(config.show_progress);
            crawlers::run(&crawler, store)
        }
        CrawlerCommand::PeeringdbIx => {
            let crawler = PeeringDbIxCrawler::new(fetcher)
                .with_urls(&config.ix_url, &config.lan_url)
                .with_progress(config.show_progress);
            crawlers::run(&crawler, store)
        }
    }
}

fn try_main(cli: Cli) -> Result<RunReport> {
    let config = cli.config();
    config.validate()?;
    init_tracing(&config.log_file(cli.crawler.name()))?;
    info!("Started: {:?}", std::env::args().collect::<Vec<_>>());

    match &config.store {
        StoreConfig::Memory { dump } => {
            let (report, store) = run_on_store(cli.crawler, &config, MemoryGraphStore::new())?;
            if let Some(path) = dump {
                store.write_snapshot(path)?;
                info!("wrote {} nodes to {}", store.node_count(), path.display());
            }
            Ok(report)
        }
        StoreConfig::Neo4j(neo4j) => {
            let store = Neo4jGraphStore::connect(neo4j.clone())?;
            let (report, _) = run_on_store(cli.crawler, &config, store)?;
            Ok(report)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    match try_main(cli) {
        Ok(report) => eprintln!("\n{}", report),
        Err(err) => {
            error!("fatal: {}", err);
            eprintln!("Error: {}", err);
            std::process::exit(1);
        }
    }
}
