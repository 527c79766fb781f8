//! The catalog side: category hierarchy resolution and the source-of-truth store.

pub mod hierarchy;
pub mod memory;
pub mod seed;
pub mod store;

pub use hierarchy::{build_tree, collect_descendant_ids, level_violations, LevelViolation};
pub use memory::MemoryCatalogStore;
pub use seed::{CatalogSeed, SeedReport};
pub use store::CatalogStore;
