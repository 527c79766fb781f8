use crate::catalog::CatalogStore;
use crate::config::{ExecutionConfig, SyncConfig};
use crate::error::{CatalogError, Result};
use crate::index::ProductIndex;
use crate::runtime::{blocking, with_retry};
use crate::types::{IndexedProduct, Product, ProductId};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Outcome of a full reindex. Per-record failures are counted, never raised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Index entries deleted because their product left the catalog.
    pub removed: usize,
    /// The run stopped early on cancellation; unvisited records count as neither.
    pub cancelled: bool,
}

impl ReindexReport {
    /// `Err(PartialFailure)` if any record failed.
    pub fn ensure_complete(&self) -> Result<()> {
        if self.failed > 0 {
            return Err(CatalogError::PartialFailure {
                succeeded: self.succeeded,
                failed: self.failed,
            });
        }
        Ok(())
    }
}

/// Keeps the index a projection of the catalog store.
pub struct CatalogIndexSync {
    store: Arc<dyn CatalogStore>,
    index: Arc<dyn ProductIndex>,
    execution: ExecutionConfig,
    config: SyncConfig,
}

impl CatalogIndexSync {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        index: Arc<dyn ProductIndex>,
        execution: ExecutionConfig,
        config: SyncConfig,
    ) -> Self {
        CatalogIndexSync {
            store,
            index,
            execution,
            config,
        }
    }

    /// Project `product` with its current category name and upsert it.
    pub async fn index_one(&self, product: &Product) -> Result<()> {
        let category_name = match product.category_id.clone() {
            Some(category_id) => {
                let store = Arc::clone(&self.store);
                let lookup_id = category_id.clone();
                let category = blocking(
                    self.execution.store_timeout(),
                    "category lookup",
                    CatalogError::StoreUnavailable,
                    move || store.category(&lookup_id),
                )
                .await?;
                match category {
                    Some(c) => c.name,
                    None => {
                        tracing::warn!(
                            product_id = %product.id,
                            category_id = %category_id,
                            "product references unknown category, indexing without a category name"
                        );
                        String::new()
                    }
                }
            }
            None => String::new(),
        };
        let doc = IndexedProduct::project(product, &category_name);
        upsert(&self.index, doc, &self.execution).await
    }

    pub async fn remove_one(&self, id: &str) -> Result<()> {
        let policy = &self.execution;
        with_retry(policy, "index delete", || {
            let index = Arc::clone(&self.index);
            let id = id.to_string();
            blocking(
                policy.index_timeout(),
                "index delete",
                CatalogError::IndexUnavailable,
                move || index.delete(&id),
            )
        })
        .await
    }

    /// Re-project every catalog record into the index.
    ///
    /// Records are spread over `SyncConfig::workers` tasks that claim `SyncConfig::batch_size`
    /// records at a time from a shared cursor and commit each batch once. A failing record
    /// is logged and counted without stopping the run; `cancel` stops workers from claiming
    /// further batches. A run that was not cancelled finishes by deleting index entries
    /// whose product is gone from the catalog.
    pub async fn reindex_all(&self, cancel: &CancellationToken) -> Result<ReindexReport> {
        let started = Instant::now();
        let store = Arc::clone(&self.store);
        let products = blocking(
            self.execution.store_timeout(),
            "list products",
            CatalogError::StoreUnavailable,
            move || store.products(),
        )
        .await?;
        let store = Arc::clone(&self.store);
        let categories = blocking(
            self.execution.store_timeout(),
            "list categories",
            CatalogError::StoreUnavailable,
            move || store.categories(),
        )
        .await?;

        let names: Arc<HashMap<String, String>> = Arc::new(
            categories
                .into_iter()
                .map(|c| (c.id, c.name))
                .collect(),
        );
        let total = products.len();
        let products = Arc::new(products);
        let cursor = Arc::new(AtomicUsize::new(0));
        let succeeded = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicUsize::new(0));
        let batch_size = self.config.batch_size.max(1);
        let workers = self
            .config
            .workers
            .clamp(1, total.div_ceil(batch_size).max(1));

        tracing::info!(
            products = total,
            workers = workers,
            batch_size = batch_size,
            "reindex started"
        );

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let products = Arc::clone(&products);
            let names = Arc::clone(&names);
            let cursor = Arc::clone(&cursor);
            let succeeded = Arc::clone(&succeeded);
            let failed = Arc::clone(&failed);
            let index = Arc::clone(&self.index);
            let policy = self.execution.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    let start = cursor.fetch_add(batch_size, Ordering::SeqCst);
                    if start >= products.len() {
                        break;
                    }
                    let end = (start + batch_size).min(products.len());
                    let docs: Vec<IndexedProduct> = products[start..end]
                        .iter()
                        .map(|product| {
                            let category_name = product
                                .category_id
                                .as_ref()
                                .and_then(|id| names.get(id))
                                .map(String::as_str)
                                .unwrap_or("");
                            IndexedProduct::project(product, category_name)
                        })
                        .collect();
                    let (ok, err) = index_batch(&index, docs, &policy).await;
                    succeeded.fetch_add(ok, Ordering::SeqCst);
                    failed.fetch_add(err, Ordering::SeqCst);
                }
            }));
        }

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "reindex worker panicked");
            }
        }

        let succeeded = succeeded.load(Ordering::SeqCst);
        let failed = failed.load(Ordering::SeqCst);
        let cancelled = cancel.is_cancelled() && succeeded + failed < total;
        let removed = if cancelled {
            0
        } else {
            self.purge_stale(&products).await
        };
        let report = ReindexReport {
            total,
            succeeded,
            failed,
            removed,
            cancelled,
        };
        tracing::info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            removed = report.removed,
            cancelled = report.cancelled,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "reindex finished"
        );
        Ok(report)
    }

    /// Delete index entries whose product is no longer in the catalog. Returns how many
    /// were removed; failures are logged and leave the entries for the next run.
    async fn purge_stale(&self, products: &[Product]) -> usize {
        let policy = &self.execution;
        let indexed = with_retry(policy, "index ids", || {
            let index = Arc::clone(&self.index);
            blocking(
                policy.index_timeout(),
                "index ids",
                CatalogError::IndexUnavailable,
                move || index.ids(),
            )
        })
        .await;
        let indexed = match indexed {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!(error = %e, "failed to list index ids, stale entries kept");
                return 0;
            }
        };

        let live: HashSet<&str> = products.iter().map(|p| p.id.as_str()).collect();
        let stale: Vec<ProductId> = indexed
            .into_iter()
            .filter(|id| !live.contains(id.as_str()))
            .collect();
        if stale.is_empty() {
            return 0;
        }

        let removed = stale.len();
        let result = with_retry(policy, "index delete stale", || {
            let index = Arc::clone(&self.index);
            let stale = stale.clone();
            blocking(
                policy.index_timeout(),
                "index delete stale",
                CatalogError::IndexUnavailable,
                move || index.delete_many(&stale),
            )
        })
        .await;
        match result {
            Ok(()) => {
                tracing::info!(removed = removed, "removed stale index entries");
                removed
            }
            Err(e) => {
                tracing::error!(error = %e, stale = removed, "failed to remove stale index entries");
                0
            }
        }
    }
}

/// Upsert one reindex batch with a single commit. Records that fail with a retryable
/// error get another chance on their own. Returns `(succeeded, failed)`.
async fn index_batch(
    index: &Arc<dyn ProductIndex>,
    docs: Vec<IndexedProduct>,
    policy: &ExecutionConfig,
) -> (usize, usize) {
    let batch = Arc::new(docs);
    let results = with_retry(policy, "index batch upsert", || {
        let index = Arc::clone(index);
        let batch = Arc::clone(&batch);
        blocking(
            policy.index_timeout(),
            "index batch upsert",
            CatalogError::IndexUnavailable,
            move || Ok(index.upsert_many(&batch)),
        )
    })
    .await;

    let results = match results {
        Ok(results) => results,
        Err(e) => {
            for doc in batch.iter() {
                tracing::error!(product_id = %doc.id, error = %e, "failed to index product");
            }
            return (0, batch.len());
        }
    };

    let mut ok = 0;
    let mut err = 0;
    for (doc, result) in batch.iter().zip(results) {
        let outcome = match result {
            Err(e) if e.is_retryable() => upsert(index, doc.clone(), policy).await,
            other => other,
        };
        match outcome {
            Ok(()) => ok += 1,
            Err(e) => {
                err += 1;
                tracing::error!(product_id = %doc.id, error = %e, "failed to index product");
            }
        }
    }
    (ok, err)
}

async fn upsert(
    index: &Arc<dyn ProductIndex>,
    doc: IndexedProduct,
    policy: &ExecutionConfig,
) -> Result<()> {
    with_retry(policy, "index upsert", || {
        let index = Arc::clone(index);
        let doc = doc.clone();
        blocking(
            policy.index_timeout(),
            "index upsert",
            CatalogError::IndexUnavailable,
            move || index.upsert(&doc),
        )
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_failure_only_when_records_failed() {
        let clean = ReindexReport {
            total: 3,
            succeeded: 3,
            failed: 0,
            removed: 0,
            cancelled: false,
        };
        assert!(clean.ensure_complete().is_ok());

        let partial = ReindexReport {
            total: 3,
            succeeded: 2,
            failed: 1,
            removed: 0,
            cancelled: false,
        };
        assert!(matches!(
            partial.ensure_complete(),
            Err(CatalogError::PartialFailure {
                succeeded: 2,
                failed: 1
            })
        ));
    }
}
