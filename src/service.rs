use crate::catalog::{
    build_tree, collect_descendant_ids, level_violations, CatalogSeed, CatalogStore, SeedReport,
};
use crate::config::EngineConfig;
use crate::error::{CatalogError, Result};
use crate::index::{CatalogIndexSync, ProductIndex, ReindexReport};
use crate::query::{SearchExecutor, SearchQueryBuilder};
use crate::runtime::blocking;
use crate::types::{
    Category, CategoryNode, Gender, Product, Review, ReviewAuthor, SearchCriteria, SearchResult,
};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The catalog facade: search, hierarchy browsing and index-synchronized writes.
///
/// Cheap to share behind an `Arc`; every method takes `&self`.
pub struct CatalogService {
    store: Arc<dyn CatalogStore>,
    index: Arc<dyn ProductIndex>,
    builder: SearchQueryBuilder,
    executor: SearchExecutor,
    sync: CatalogIndexSync,
    config: EngineConfig,
    review_locks: DashMap<String, Arc<tokio::sync::Mutex<()>>>,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        index: Arc<dyn ProductIndex>,
        config: EngineConfig,
    ) -> Self {
        let builder = SearchQueryBuilder::new(Arc::new(config.relevance.clone()));
        let executor = SearchExecutor::new(
            Arc::clone(&index),
            Arc::clone(&store),
            config.execution.clone(),
        );
        let sync = CatalogIndexSync::new(
            Arc::clone(&store),
            Arc::clone(&index),
            config.execution.clone(),
            config.sync.clone(),
        );
        CatalogService {
            store,
            index,
            builder,
            executor,
            sync,
            config,
            review_locks: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn index(&self) -> &Arc<dyn ProductIndex> {
        &self.index
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Full resync when `sync.resync_on_startup` is set. Returns the report if one ran.
    pub async fn startup(&self, cancel: &CancellationToken) -> Result<Option<ReindexReport>> {
        if !self.config.sync.resync_on_startup {
            tracing::info!("startup resync disabled");
            return Ok(None);
        }
        self.reindex_all(cancel).await.map(Some)
    }

    async fn store_call<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&dyn CatalogStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        blocking(
            self.config.execution.store_timeout(),
            op,
            CatalogError::StoreUnavailable,
            move || f(store.as_ref()),
        )
        .await
    }

    // --- search ---

    /// Unpaginated keyword search over name and description, capped at
    /// `execution.keyword_result_limit`. A blank keyword finds nothing.
    pub async fn search_by_keyword(&self, keyword: &str) -> Result<Vec<Product>> {
        let limit = self.config.execution.keyword_result_limit;
        match self.builder.build_keyword_search(keyword, limit) {
            Some(request) => Ok(self.executor.search(&request).await?.products),
            None => Ok(Vec::new()),
        }
    }

    pub async fn advanced_search(&self, criteria: &SearchCriteria) -> Result<SearchResult> {
        let request = self.builder.build(criteria)?;
        self.executor.search(&request).await
    }

    /// Store-native substring search, usable while the index is unavailable.
    pub async fn fallback_text_search(&self, keyword: &str) -> Result<Vec<Product>> {
        let keyword = keyword.to_string();
        self.store_call("text search", move |s| s.search_text(&keyword))
            .await
    }

    // --- hierarchy ---

    pub async fn category_tree(&self, gender: Option<Gender>) -> Result<Vec<CategoryNode>> {
        let categories = self.store_call("list categories", |s| s.categories()).await?;
        for v in level_violations(&categories) {
            tracing::warn!(
                category_id = %v.id,
                level = v.level,
                expected = ?v.expected,
                "category level disagrees with hierarchy"
            );
        }
        Ok(build_tree(&categories, gender))
    }

    /// Products of `category_id` and every descendant category, grouped by category in
    /// breadth-first order. An unknown id lists only its own products.
    pub async fn products_in_category_subtree(&self, category_id: &str) -> Result<Vec<Product>> {
        let category_id = category_id.to_string();
        self.store_call("subtree listing", move |s| {
            let categories = s.categories()?;
            let ids = collect_descendant_ids(&categories, &category_id);
            let mut products = Vec::new();
            for id in &ids {
                products.extend(s.products_by_category(id)?);
            }
            Ok(products)
        })
        .await
    }

    pub async fn category(&self, id: &str) -> Result<Category> {
        let id = id.to_string();
        self.store_call("get category", move |s| {
            s.category(&id)?
                .ok_or_else(|| CatalogError::not_found("Category", id))
        })
        .await
    }

    pub async fn category_by_name(&self, name: &str) -> Result<Category> {
        let name = name.to_string();
        self.store_call("get category by name", move |s| {
            s.category_by_name(&name)?
                .ok_or_else(|| CatalogError::not_found("Category", name))
        })
        .await
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        self.store_call("list categories", |s| s.categories()).await
    }

    pub async fn subcategories(&self, parent_id: &str) -> Result<Vec<Category>> {
        let parent_id = parent_id.to_string();
        self.store_call("list subcategories", move |s| s.subcategories(&parent_id))
            .await
    }

    pub async fn categories_by_gender(&self, gender: Gender) -> Result<Vec<Category>> {
        self.store_call("list categories by gender", move |s| {
            s.categories_by_gender(gender)
        })
        .await
    }

    // --- products ---

    pub async fn product(&self, id: &str) -> Result<Product> {
        let id = id.to_string();
        self.store_call("get product", move |s| {
            s.product(&id)?
                .ok_or_else(|| CatalogError::not_found("Product", id))
        })
        .await
    }

    pub async fn products_in_category(&self, category_id: &str) -> Result<Vec<Product>> {
        let category_id = category_id.to_string();
        self.store_call("list products by category", move |s| {
            s.products_by_category(&category_id)
        })
        .await
    }

    pub async fn products_by_brand(&self, brand: &str) -> Result<Vec<Product>> {
        let brand = brand.to_string();
        self.store_call("list products by brand", move |s| s.products_by_brand(&brand))
            .await
    }

    pub async fn products_by_color(&self, color: &str) -> Result<Vec<Product>> {
        let color = color.to_string();
        self.store_call("list products by color", move |s| s.products_by_color(&color))
            .await
    }

    pub async fn products_on_sale(&self) -> Result<Vec<Product>> {
        self.store_call("list products on sale", |s| s.products_on_sale())
            .await
    }

    /// Write `product` to the store and re-project it into the index.
    ///
    /// The store write is authoritative: an index failure afterwards is logged and
    /// left for the next reindex to repair.
    pub async fn save_product(&self, product: Product) -> Result<Product> {
        validate_product(&product)?;
        let saved = self
            .store_call("save product", move |s| s.save_product(product))
            .await?;
        self.reproject(&saved).await;
        Ok(saved)
    }

    pub async fn delete_product(&self, id: &str) -> Result<()> {
        let owned = id.to_string();
        let removed = self
            .store_call("delete product", move |s| s.delete_product(&owned))
            .await?;
        if !removed {
            return Err(CatalogError::not_found("Product", id));
        }
        if let Err(e) = self.sync.remove_one(id).await {
            tracing::error!(product_id = %id, error = %e, "failed to remove product from index");
        }
        Ok(())
    }

    /// Append a review and refresh the product's rating aggregates.
    ///
    /// Reviews on the same product are applied one at a time.
    pub async fn add_review(
        &self,
        product_id: &str,
        author: &ReviewAuthor,
        rating: u8,
        comment: &str,
    ) -> Result<Product> {
        if !(1..=5).contains(&rating) {
            return Err(CatalogError::InvalidArgument(format!(
                "rating must be between 1 and 5, got {}",
                rating
            )));
        }

        let lock = self
            .review_locks
            .entry(product_id.to_string())
            .or_default()
            .clone();
        let result = {
            let _guard = lock.lock().await;
            self.apply_review(product_id, author, rating, comment).await
        };
        drop(lock);
        self.review_locks
            .remove_if(product_id, |_, l| Arc::strong_count(l) == 1);
        result
    }

    async fn apply_review(
        &self,
        product_id: &str,
        author: &ReviewAuthor,
        rating: u8,
        comment: &str,
    ) -> Result<Product> {
        let mut product = self.product(product_id).await?;
        product.reviews.push(Review {
            user_id: author.user_id.clone(),
            user_name: author.display_name.clone(),
            rating,
            comment: comment.to_string(),
            created_at: Utc::now(),
        });
        product.recompute_rating();
        let saved = self
            .store_call("save review", move |s| s.save_product(product))
            .await?;
        self.reproject(&saved).await;
        Ok(saved)
    }

    async fn reproject(&self, product: &Product) {
        if let Err(e) = self.sync.index_one(product).await {
            tracing::error!(
                product_id = %product.id,
                error = %e,
                "failed to re-index product after write"
            );
        }
    }

    // --- sync ---

    pub async fn reindex_all(&self, cancel: &CancellationToken) -> Result<ReindexReport> {
        self.sync.reindex_all(cancel).await
    }

    /// Load a seed into the store, then reindex if anything was written.
    pub async fn load_seed(&self, seed: CatalogSeed) -> Result<SeedReport> {
        let report = self
            .store_call("load seed", move |s| seed.load_into(s))
            .await?;
        if report.products > 0 || report.categories > 0 {
            self.reindex_all(&CancellationToken::new()).await?;
        }
        Ok(report)
    }
}

fn validate_product(product: &Product) -> Result<()> {
    if product.name.trim().is_empty() {
        return Err(CatalogError::InvalidArgument(
            "product name must not be blank".to_string(),
        ));
    }
    if !product.price.is_finite() || product.price < 0.0 {
        return Err(CatalogError::InvalidArgument(format!(
            "product price must be a non-negative number, got {}",
            product.price
        )));
    }
    if let Some(d) = product.discount_percentage {
        if !(0.0..=100.0).contains(&d) {
            return Err(CatalogError::InvalidArgument(format!(
                "discount percentage must be within 0..=100, got {}",
                d
            )));
        }
    }
    Ok(())
}
