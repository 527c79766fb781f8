use crate::catalog::CatalogStore;
use crate::config::ExecutionConfig;
use crate::error::{CatalogError, Result};
use crate::index::{IndexHits, ProductIndex};
use crate::query::model::SearchRequest;
use crate::runtime::{blocking, with_retry};
use crate::types::{Product, ProductId, SearchResult};
use std::sync::Arc;
use std::time::Instant;

/// Ranked ids for one page plus totals, before hydration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedSearch {
    pub ids: Vec<ProductId>,
    pub total_hits: u64,
    pub total_pages: u64,
}

pub fn total_pages(total_hits: u64, size: usize) -> u64 {
    if size == 0 {
        return 0;
    }
    total_hits.div_ceil(size as u64)
}

/// Runs built queries against the index and hydrates hits from the catalog store.
pub struct SearchExecutor {
    index: Arc<dyn ProductIndex>,
    store: Arc<dyn CatalogStore>,
    execution: ExecutionConfig,
}

impl SearchExecutor {
    pub fn new(
        index: Arc<dyn ProductIndex>,
        store: Arc<dyn CatalogStore>,
        execution: ExecutionConfig,
    ) -> Self {
        SearchExecutor {
            index,
            store,
            execution,
        }
    }

    pub async fn execute(&self, request: &SearchRequest) -> Result<ExecutedSearch> {
        if tracing::enabled!(tracing::Level::DEBUG) {
            if let Ok(json) = serde_json::to_string(&request.query) {
                tracing::debug!(query = %json, page = request.page, size = request.size, "executing search");
            }
        }

        let start = Instant::now();
        let policy = &self.execution;
        let hits: IndexHits = with_retry(policy, "index search", || {
            let index = Arc::clone(&self.index);
            let request = request.clone();
            blocking(
                policy.index_timeout(),
                "index search",
                CatalogError::IndexUnavailable,
                move || index.search(&request),
            )
        })
        .await?;

        tracing::debug!(
            total_hits = hits.total,
            returned = hits.ids.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "search executed"
        );

        Ok(ExecutedSearch {
            total_pages: total_pages(hits.total, request.size),
            total_hits: hits.total,
            ids: hits.ids,
        })
    }

    /// Load full products for `ids`, keeping their order.
    ///
    /// Ids the store no longer knows are dropped; index drift is not an error.
    pub async fn hydrate(&self, ids: Vec<ProductId>) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let requested = ids.len();
        let store = Arc::clone(&self.store);
        let products = blocking(
            self.execution.store_timeout(),
            "hydrate products",
            CatalogError::StoreUnavailable,
            move || store.products_by_ids(&ids),
        )
        .await?;
        if products.len() < requested {
            tracing::warn!(
                requested = requested,
                found = products.len(),
                "dropped index hits missing from the catalog"
            );
        }
        Ok(products)
    }

    /// Execute then hydrate one page.
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResult> {
        let executed = self.execute(request).await?;
        let products = self.hydrate(executed.ids).await?;
        Ok(SearchResult {
            products,
            total_items: executed.total_hits,
            total_pages: executed.total_pages,
            current_page: request.page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(45, 20), 3);
        assert_eq!(total_pages(40, 20), 2);
        assert_eq!(total_pages(0, 20), 0);
        assert_eq!(total_pages(1, 1), 1);
        assert_eq!(total_pages(5, 0), 0);
    }
}
