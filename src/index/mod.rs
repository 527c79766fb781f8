//! The search index: a rebuildable, denormalized projection of the catalog.
//!
//! [`ProductIndex`] is the seam between the relevance engine and the index backend.
//! [`TantivyProductIndex`] is the embedded implementation; [`CatalogIndexSync`] keeps
//! it in step with the catalog store.

pub mod document;
pub mod schema;
pub mod sync;
pub mod tantivy_index;

use crate::error::Result;
use crate::query::model::SearchRequest;
use crate::types::{IndexedProduct, ProductId};

pub use sync::{CatalogIndexSync, ReindexReport};
pub use tantivy_index::TantivyProductIndex;

/// One page of matching product ids in relevance order, plus the total match count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexHits {
    pub ids: Vec<ProductId>,
    pub total: u64,
}

/// A full-text index over [`IndexedProduct`] records.
///
/// Implementations are synchronous and may block; async callers go through
/// [`crate::runtime::blocking`]. A backend that cannot be reached should fail with
/// [`crate::CatalogError::IndexUnavailable`] so callers can retry.
pub trait ProductIndex: Send + Sync {
    fn search(&self, request: &SearchRequest) -> Result<IndexHits>;

    /// Insert or replace the record with `product.id`.
    fn upsert(&self, product: &IndexedProduct) -> Result<()>;

    /// Upsert a batch, returning one result per record in input order.
    ///
    /// A failing record does not fail its neighbours. Backends that can should make the
    /// whole batch visible with a single commit.
    fn upsert_many(&self, products: &[IndexedProduct]) -> Vec<Result<()>> {
        products.iter().map(|p| self.upsert(p)).collect()
    }

    /// Remove the record with `id`. Removing an absent id succeeds.
    fn delete(&self, id: &str) -> Result<()>;

    fn delete_many(&self, ids: &[ProductId]) -> Result<()> {
        ids.iter().try_for_each(|id| self.delete(id))
    }

    fn get(&self, id: &str) -> Result<Option<IndexedProduct>>;

    /// Every product id currently in the index, in no particular order.
    fn ids(&self) -> Result<Vec<ProductId>>;

    fn count(&self) -> Result<u64>;
}
