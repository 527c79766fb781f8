#![allow(dead_code)]

use aisle::catalog::{CatalogSeed, MemoryCatalogStore};
use aisle::index::{IndexHits, ProductIndex, TantivyProductIndex};
use aisle::query::SearchRequest;
use aisle::{
    CatalogError, CatalogService, Category, EngineConfig, Gender, IndexedProduct, Product,
    ProductId,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Wraps a real index and injects `IndexUnavailable` failures on demand.
pub struct FlakyIndex {
    inner: TantivyProductIndex,
    failing_upserts: Mutex<HashSet<String>>,
    search_failures: AtomicUsize,
    cancel_after: Mutex<Option<(usize, CancellationToken)>>,
    pub search_calls: AtomicUsize,
    pub upserted: AtomicUsize,
    pub batch_calls: AtomicUsize,
}

impl FlakyIndex {
    pub fn new() -> Self {
        FlakyIndex {
            inner: TantivyProductIndex::create_in_ram(20_000_000).unwrap(),
            failing_upserts: Mutex::new(HashSet::new()),
            search_failures: AtomicUsize::new(0),
            cancel_after: Mutex::new(None),
            search_calls: AtomicUsize::new(0),
            upserted: AtomicUsize::new(0),
            batch_calls: AtomicUsize::new(0),
        }
    }

    /// Cancel `token` once `n` more records have been written.
    pub fn cancel_after_upserts(&self, n: usize, token: CancellationToken) {
        let limit = self.upserted.load(Ordering::SeqCst) + n;
        *self.cancel_after.lock().unwrap() = Some((limit, token));
    }

    fn record_upserts(&self, n: usize) {
        let total = self.upserted.fetch_add(n, Ordering::SeqCst) + n;
        if let Some((limit, token)) = self.cancel_after.lock().unwrap().as_ref() {
            if total >= *limit {
                token.cancel();
            }
        }
    }

    fn injected(&self, id: &str) -> Option<CatalogError> {
        self.failing_upserts
            .lock()
            .unwrap()
            .contains(id)
            .then(|| CatalogError::IndexUnavailable(format!("injected failure for {}", id)))
    }

    pub fn fail_upsert_for(&self, id: &str) {
        self.failing_upserts.lock().unwrap().insert(id.to_string());
    }

    /// The next `n` searches fail.
    pub fn fail_next_searches(&self, n: usize) {
        self.search_failures.store(n, Ordering::SeqCst);
    }
}

impl ProductIndex for FlakyIndex {
    fn search(&self, request: &SearchRequest) -> aisle::Result<IndexHits> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.search_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.search_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(CatalogError::IndexUnavailable("injected".into()));
        }
        self.inner.search(request)
    }

    fn upsert(&self, product: &IndexedProduct) -> aisle::Result<()> {
        if let Some(e) = self.injected(&product.id) {
            return Err(e);
        }
        self.inner.upsert(product)?;
        self.record_upserts(1);
        Ok(())
    }

    fn upsert_many(&self, products: &[IndexedProduct]) -> Vec<aisle::Result<()>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        let (passing, failing): (Vec<_>, Vec<_>) = products
            .iter()
            .enumerate()
            .partition(|(_, p)| self.injected(&p.id).is_none());
        let written: Vec<IndexedProduct> = passing.iter().map(|(_, p)| (*p).clone()).collect();
        let mut results: Vec<Option<aisle::Result<()>>> = products.iter().map(|_| None).collect();
        for ((i, _), result) in passing.iter().zip(self.inner.upsert_many(&written)) {
            results[*i] = Some(result);
        }
        for (i, p) in failing {
            results[i] = self.injected(&p.id).map(Err);
        }
        self.record_upserts(written.len());
        results.into_iter().map(|r| r.unwrap_or(Ok(()))).collect()
    }

    fn delete(&self, id: &str) -> aisle::Result<()> {
        self.inner.delete(id)
    }

    fn delete_many(&self, ids: &[ProductId]) -> aisle::Result<()> {
        self.inner.delete_many(ids)
    }

    fn ids(&self) -> aisle::Result<Vec<ProductId>> {
        self.inner.ids()
    }

    fn get(&self, id: &str) -> aisle::Result<Option<IndexedProduct>> {
        self.inner.get(id)
    }

    fn count(&self) -> aisle::Result<u64> {
        self.inner.count()
    }
}

pub struct Fixture {
    pub store: Arc<MemoryCatalogStore>,
    pub index: Arc<FlakyIndex>,
    pub service: CatalogService,
}

pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.execution.retry_base_delay_ms = 1;
    config.sync.workers = 3;
    config
}

pub fn category(
    id: &str,
    name: &str,
    parent: Option<&str>,
    level: u32,
    gender: Option<Gender>,
) -> Category {
    Category {
        id: id.to_string(),
        name: name.to_string(),
        description: format!("{} collection", name),
        parent_id: parent.map(str::to_string),
        level,
        gender,
    }
}

pub fn product(
    id: &str,
    name: &str,
    description: &str,
    brand: &str,
    color: &str,
    price: f64,
    category_id: &str,
) -> Product {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "name": name,
        "description": description,
        "price": price,
        "brand": brand,
        "color": color,
        "sizes": ["S", "M", "L"],
        "categoryId": category_id,
        "stockQuantity": 10,
        "inStock": true,
    }))
    .unwrap()
}

pub fn categories() -> Vec<Category> {
    vec![
        category("men", "Men", None, 0, Some(Gender::Men)),
        category("women", "Women", None, 0, Some(Gender::Women)),
        category("accessories", "Accessories", None, 0, None),
        category("men-clothing", "Clothing", Some("men"), 1, Some(Gender::Men)),
        category("men-footwear", "Footwear", Some("men"), 1, Some(Gender::Men)),
        category("men-jeans", "Jeans", Some("men-clothing"), 2, Some(Gender::Men)),
        category("men-tshirts", "T-Shirts", Some("men-clothing"), 2, Some(Gender::Men)),
        category("women-western", "Western Wear", Some("women"), 1, Some(Gender::Women)),
        category("women-jeans", "Jeans & Jeggings", Some("women-western"), 2, Some(Gender::Women)),
        category("bags", "Bags", Some("accessories"), 1, None),
    ]
}

pub fn products() -> Vec<Product> {
    let mut tote = product(
        "p-tote",
        "Leather Tote Bag",
        "Roomy leather tote for work",
        "Fossil",
        "Brown",
        150.0,
        "bags",
    );
    tote.on_sale = true;
    tote.discount_percentage = Some(20.0);

    vec![
        product(
            "p-slim",
            "Slim Fit Jeans",
            "Stretch denim with a tapered leg",
            "Levis",
            "Blue",
            79.99,
            "men-jeans",
        ),
        product(
            "p-straight",
            "Straight Leg Jeans",
            "Classic five pocket denim",
            "Wrangler",
            "Black",
            50.0,
            "men-jeans",
        ),
        product(
            "p-skinny",
            "Skinny Jeggings",
            "High rise jeggings",
            "Zara",
            "Blue",
            35.5,
            "women-jeans",
        ),
        product(
            "p-tee",
            "Classic Cotton T-Shirt",
            "A comfortable cotton t-shirt for everyday wear",
            "Brand X",
            "Black",
            29.99,
            "men-tshirts",
        ),
        product(
            "p-graphic",
            "Graphic Print T-Shirt",
            "A stylish graphic print tee",
            "Brand X",
            "White",
            34.99,
            "men-tshirts",
        ),
        product(
            "p-sneaker",
            "Running Sneakers",
            "Lightweight mesh sneakers",
            "Nike",
            "White",
            120.0,
            "men-footwear",
        ),
        tote,
        product(
            "p-jacket",
            "Denim Jacket",
            "Sturdy denim jacket that pairs with jeans",
            "Levis",
            "Blue",
            50.0,
            "men-clothing",
        ),
    ]
}

pub fn seed() -> CatalogSeed {
    CatalogSeed {
        categories: categories(),
        products: products(),
    }
}

/// A service over a seeded memory store and a fully indexed RAM index.
pub async fn seeded() -> Fixture {
    seeded_with(test_config()).await
}

pub async fn seeded_with(config: EngineConfig) -> Fixture {
    let store = Arc::new(MemoryCatalogStore::new());
    let index = Arc::new(FlakyIndex::new());
    let service = CatalogService::new(store.clone(), index.clone(), config);
    service.load_seed(seed()).await.unwrap();
    Fixture {
        store,
        index,
        service,
    }
}

pub fn ids(products: &[Product]) -> Vec<&str> {
    products.iter().map(|p| p.id.as_str()).collect()
}
