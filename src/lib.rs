//! # Aisle
//!
//! Catalog search relevance and category-hierarchy resolution for a storefront,
//! built on [Tantivy](https://github.com/quickwit-oss/tantivy).
//!
//! A keyword search becomes a weighted, multi-clause [`query::SearchQuery`] that
//! favours exact and phrase matches on the product name, then falls back to fuzzy,
//! prefix and substring matches. Queries run against a [`index::ProductIndex`] and
//! hits are hydrated from the [`catalog::CatalogStore`], which stays the source of
//! truth. The index is a projection the [`index::CatalogIndexSync`] can rebuild at
//! any time.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use aisle::catalog::{CatalogSeed, MemoryCatalogStore};
//! use aisle::index::TantivyProductIndex;
//! use aisle::{CatalogService, EngineConfig, SearchCriteria};
//! use std::sync::Arc;
//!
//! # async fn run() -> aisle::Result<()> {
//! let config = EngineConfig::default();
//! let store = Arc::new(MemoryCatalogStore::new());
//! let index = Arc::new(TantivyProductIndex::create_in_ram(config.sync.writer_memory_bytes)?);
//! let service = CatalogService::new(store, index, config);
//!
//! service.load_seed(CatalogSeed::from_path("demos/seed.json")?).await?;
//!
//! let page = service
//!     .advanced_search(&SearchCriteria::keyword("blue jeans").with_price_range(None, Some(100.0)))
//!     .await?;
//! println!("{} of {} hits", page.products.len(), page.total_items);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod query;
pub mod runtime;
pub mod service;
pub mod tokenizer;
pub mod types;

pub use config::{EngineConfig, ExecutionConfig, RelevanceConfig, SyncConfig};
pub use error::{CatalogError, Result};
pub use service::CatalogService;
pub use types::*;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Does nothing if a global subscriber is already set.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
