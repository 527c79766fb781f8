use crate::error::Result;
use crate::types::{Category, Gender, Product, ProductId};

/// The catalog's source of truth for products and categories.
///
/// Implementations are synchronous and may block; the service calls them from the
/// blocking pool under a deadline. A backend that cannot be reached should fail with
/// [`crate::CatalogError::StoreUnavailable`].
pub trait CatalogStore: Send + Sync {
    fn product(&self, id: &str) -> Result<Option<Product>>;

    /// Every product, in a stable order.
    fn products(&self) -> Result<Vec<Product>>;

    /// Products for `ids` in the given order. Unknown ids are skipped.
    fn products_by_ids(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(p) = self.product(id)? {
                out.push(p);
            }
        }
        Ok(out)
    }

    fn products_by_category(&self, category_id: &str) -> Result<Vec<Product>>;

    fn products_by_brand(&self, brand: &str) -> Result<Vec<Product>>;

    fn products_by_color(&self, color: &str) -> Result<Vec<Product>>;

    fn products_on_sale(&self) -> Result<Vec<Product>>;

    /// Case-insensitive substring match on name or description.
    fn search_text(&self, keyword: &str) -> Result<Vec<Product>>;

    /// Insert or update, returning the stored record.
    ///
    /// An update must carry the stored `version`; a stale one fails with
    /// [`crate::CatalogError::Conflict`]. Successful writes bump the version.
    fn save_product(&self, product: Product) -> Result<Product>;

    /// Returns whether a product was removed.
    fn delete_product(&self, id: &str) -> Result<bool>;

    fn categories(&self) -> Result<Vec<Category>>;

    fn category(&self, id: &str) -> Result<Option<Category>>;

    fn category_by_name(&self, name: &str) -> Result<Option<Category>>;

    fn subcategories(&self, parent_id: &str) -> Result<Vec<Category>>;

    /// Categories tagged with exactly `gender`; untagged ones are not included.
    fn categories_by_gender(&self, gender: Gender) -> Result<Vec<Category>>;

    fn save_category(&self, category: Category) -> Result<Category>;
}
