use crate::catalog::store::CatalogStore;
use crate::error::{CatalogError, Result};
use crate::types::{Category, Gender, Product};
use chrono::Utc;
use indexmap::IndexMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-process [`CatalogStore`] with insertion-ordered listings and version-checked writes.
#[derive(Default)]
pub struct MemoryCatalogStore {
    products: RwLock<IndexMap<String, Product>>,
    categories: RwLock<IndexMap<String, Category>>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn filter_products(&self, pred: impl Fn(&Product) -> bool) -> Vec<Product> {
        read(&self.products)
            .values()
            .filter(|p| pred(p))
            .cloned()
            .collect()
    }

    fn filter_categories(&self, pred: impl Fn(&Category) -> bool) -> Vec<Category> {
        read(&self.categories)
            .values()
            .filter(|c| pred(c))
            .cloned()
            .collect()
    }
}

impl CatalogStore for MemoryCatalogStore {
    fn product(&self, id: &str) -> Result<Option<Product>> {
        Ok(read(&self.products).get(id).cloned())
    }

    fn products(&self) -> Result<Vec<Product>> {
        Ok(read(&self.products).values().cloned().collect())
    }

    fn products_by_category(&self, category_id: &str) -> Result<Vec<Product>> {
        Ok(self.filter_products(|p| p.category_id.as_deref() == Some(category_id)))
    }

    fn products_by_brand(&self, brand: &str) -> Result<Vec<Product>> {
        Ok(self.filter_products(|p| p.brand == brand))
    }

    fn products_by_color(&self, color: &str) -> Result<Vec<Product>> {
        Ok(self.filter_products(|p| p.color == color))
    }

    fn products_on_sale(&self) -> Result<Vec<Product>> {
        Ok(self.filter_products(|p| p.on_sale))
    }

    fn search_text(&self, keyword: &str) -> Result<Vec<Product>> {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.filter_products(|p| {
            p.name.to_lowercase().contains(&needle)
                || p.description.to_lowercase().contains(&needle)
        }))
    }

    fn save_product(&self, mut product: Product) -> Result<Product> {
        if product.id.trim().is_empty() {
            product.id = uuid::Uuid::new_v4().to_string();
        }
        let now = Utc::now();
        let mut products = write(&self.products);
        match products.get(&product.id) {
            Some(existing) => {
                if existing.version != product.version {
                    return Err(CatalogError::Conflict {
                        id: product.id,
                        expected: product.version,
                        actual: existing.version,
                    });
                }
                product.created_at = existing.created_at.or(product.created_at);
            }
            None => {
                product.created_at = product.created_at.or(Some(now));
            }
        }
        product.version += 1;
        product.updated_at = Some(now);
        products.insert(product.id.clone(), product.clone());
        Ok(product)
    }

    fn delete_product(&self, id: &str) -> Result<bool> {
        Ok(write(&self.products).shift_remove(id).is_some())
    }

    fn categories(&self) -> Result<Vec<Category>> {
        Ok(read(&self.categories).values().cloned().collect())
    }

    fn category(&self, id: &str) -> Result<Option<Category>> {
        Ok(read(&self.categories).get(id).cloned())
    }

    fn category_by_name(&self, name: &str) -> Result<Option<Category>> {
        Ok(read(&self.categories)
            .values()
            .find(|c| c.name == name)
            .cloned())
    }

    fn subcategories(&self, parent_id: &str) -> Result<Vec<Category>> {
        Ok(self.filter_categories(|c| c.parent_id.as_deref() == Some(parent_id)))
    }

    fn categories_by_gender(&self, gender: Gender) -> Result<Vec<Category>> {
        Ok(self.filter_categories(|c| c.gender == Some(gender)))
    }

    fn save_category(&self, mut category: Category) -> Result<Category> {
        if category.id.trim().is_empty() {
            category.id = uuid::Uuid::new_v4().to_string();
        }
        write(&self.categories).insert(category.id.clone(), category.clone());
        Ok(category)
    }
}
