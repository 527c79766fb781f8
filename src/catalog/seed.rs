use crate::catalog::store::CatalogStore;
use crate::error::Result;
use crate::types::{Category, Product};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Bootstrap catalog data: `{ "categories": [...], "products": [...] }`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub categories: usize,
    pub products: usize,
}

impl CatalogSeed {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write every category, then every product, into `store`.
    ///
    /// Each collection is only loaded when the store has none of that kind yet, so
    /// reloading a seed into a populated store is a no-op.
    pub fn load_into(&self, store: &dyn CatalogStore) -> Result<SeedReport> {
        let mut report = SeedReport::default();

        if store.categories()?.is_empty() {
            for category in &self.categories {
                store.save_category(category.clone())?;
                report.categories += 1;
            }
        }

        if store.products()?.is_empty() {
            for product in &self.products {
                let mut product = product.clone();
                product.recompute_rating();
                store.save_product(product)?;
                report.products += 1;
            }
        }

        tracing::info!(
            categories = report.categories,
            products = report.products,
            "catalog seed loaded"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::memory::MemoryCatalogStore;

    const SEED: &str = r#"{
        "categories": [
            {"id": "men", "name": "Men", "level": 0, "gender": "men"},
            {"id": "jeans", "name": "Jeans", "parentId": "men", "level": 1, "gender": "men"}
        ],
        "products": [
            {"id": "p1", "name": "Slim Fit Jeans", "price": 79.99, "categoryId": "jeans",
             "reviews": [
                {"userId": "u1", "userName": "a@example.com", "rating": 4, "createdAt": "2024-01-01T00:00:00Z"},
                {"userId": "u2", "userName": "b@example.com", "rating": 2, "createdAt": "2024-01-02T00:00:00Z"}
             ]}
        ]
    }"#;

    #[test]
    fn loads_once_and_derives_ratings() {
        let seed: CatalogSeed = serde_json::from_str(SEED).unwrap();
        let store = MemoryCatalogStore::new();
        let report = seed.load_into(&store).unwrap();
        assert_eq!(
            report,
            SeedReport {
                categories: 2,
                products: 1
            }
        );
        let p = store.product("p1").unwrap().unwrap();
        assert_eq!(p.review_count, 2);
        assert!((p.average_rating - 3.0).abs() < f64::EPSILON);

        let again = seed.load_into(&store).unwrap();
        assert_eq!(again, SeedReport::default());
    }

    #[test]
    fn reads_seed_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("seed.json");
        std::fs::write(&path, SEED).unwrap();
        let seed = CatalogSeed::from_path(&path).unwrap();
        assert_eq!(seed.categories.len(), 2);
        assert_eq!(seed.products[0].category_id.as_deref(), Some("jeans"));
    }
}
