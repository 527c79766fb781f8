use aisle::catalog::{CatalogSeed, MemoryCatalogStore};
use aisle::index::{ProductIndex, TantivyProductIndex};
use aisle::{CatalogService, EngineConfig, Gender, SearchCriteria};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "aisle", about = "Search and browse a storefront catalog")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// JSON seed file with `categories` and `products`.
    #[arg(long, env = "AISLE_SEED")]
    seed: Option<PathBuf>,
    /// Directory for the on-disk index. Uses a RAM index when unset.
    #[arg(long, env = "AISLE_INDEX_DIR")]
    index_dir: Option<PathBuf>,
    /// Engine config file. Falls back to `AISLE_*` environment variables.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Ranked keyword search with optional filters
    Search {
        keyword: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
        #[arg(long, default_value = "0")]
        page: i64,
        #[arg(long, default_value = "20")]
        size: i64,
        #[arg(long)]
        no_fuzzy: bool,
    },
    /// Print the category forest
    Tree {
        /// `men` or `women`; universal roots are always included.
        #[arg(long)]
        gender: Option<String>,
    },
    /// List products under a category and all of its descendants
    Subtree { category_id: String },
    /// Rebuild the index from the catalog
    Reindex,
}

#[tokio::main]
async fn main() {
    aisle::init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::from_env()?,
    };

    let index: Arc<dyn ProductIndex> = match &cli.index_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            Arc::new(TantivyProductIndex::open_or_create(
                dir,
                config.sync.writer_memory_bytes,
            )?)
        }
        None => Arc::new(TantivyProductIndex::create_in_ram(
            config.sync.writer_memory_bytes,
        )?),
    };
    let store = Arc::new(MemoryCatalogStore::new());
    let service = CatalogService::new(store, index, config);

    let cancel = CancellationToken::new();
    let mut seeded = false;
    if let Some(path) = &cli.seed {
        let report = service.load_seed(CatalogSeed::from_path(path)?).await?;
        tracing::info!(
            categories = report.categories,
            products = report.products,
            "Loaded seed from {}",
            path.display()
        );
        seeded = report.products > 0 || report.categories > 0;
    }
    // Loading a seed already reindexed.
    if !seeded && !matches!(cli.command, Command::Reindex) {
        if let Some(report) = service.startup(&cancel).await? {
            tracing::info!(succeeded = report.succeeded, failed = report.failed, "startup resync");
        }
    }

    match cli.command {
        Command::Search {
            keyword,
            category,
            min_price,
            max_price,
            page,
            size,
            no_fuzzy,
        } => {
            let mut criteria = SearchCriteria::keyword(keyword)
                .with_price_range(min_price, max_price)
                .with_page(page, size)
                .with_fuzzy(!no_fuzzy);
            if let Some(category) = category {
                criteria = criteria.with_category(category);
            }
            print_json(&service.advanced_search(&criteria).await?)
        }
        Command::Tree { gender } => {
            let gender = gender.map(|g| g.parse::<Gender>()).transpose()?;
            print_json(&service.category_tree(gender).await?)
        }
        Command::Subtree { category_id } => {
            print_json(&service.products_in_category_subtree(&category_id).await?)
        }
        Command::Reindex => {
            let report = service.reindex_all(&cancel).await?;
            print_json(&report)?;
            report.ensure_complete()?;
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
