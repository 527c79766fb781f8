use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category identifier, opaque to the engine.
pub type CategoryId = String;
/// Product identifier, shared by the catalog record and its index projection.
pub type ProductId = String;

/// Audience tag on a category. `None` on a [`Category`] means universal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Men,
    Women,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Men => "men",
            Gender::Women => "women",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = crate::error::CatalogError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "men" => Ok(Gender::Men),
            "women" => Ok(Gender::Women),
            other => Err(crate::error::CatalogError::InvalidArgument(format!(
                "unknown gender '{}', expected 'men' or 'women'",
                other
            ))),
        }
    }
}

/// A node of the flat, parent-pointer category set.
///
/// Children are never stored; see [`crate::catalog::hierarchy::build_tree`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent_id: Option<CategoryId>,
    #[serde(default)]
    pub level: u32,
    #[serde(default)]
    pub gender: Option<Gender>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// A category with its derived children populated.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub children: Vec<CategoryNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub user_id: String,
    pub user_name: String,
    /// 1 to 5 stars.
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Caller identity for review authorship, established outside this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewAuthor {
    pub user_id: String,
    pub display_name: String,
}

impl ReviewAuthor {
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        ReviewAuthor {
            user_id: user_id.into(),
            display_name: display_name.into(),
        }
    }
}

/// The catalog's source-of-truth product record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default)]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub on_sale: bool,
    #[serde(default)]
    pub discount_percentage: Option<f64>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Bumped by the store on every successful write.
    #[serde(default)]
    pub version: u64,
}

impl Product {
    /// Recompute `average_rating` and `review_count` from the review list.
    pub fn recompute_rating(&mut self) {
        self.review_count = self.reviews.len() as u32;
        self.average_rating = if self.reviews.is_empty() {
            0.0
        } else {
            let total: u32 = self.reviews.iter().map(|r| r.rating as u32).sum();
            total as f64 / self.reviews.len() as f64
        };
    }

    /// Price after the sale discount, rounded half-up to cents.
    pub fn final_price(&self) -> f64 {
        match (self.on_sale, self.discount_percentage) {
            (true, Some(discount)) => {
                let multiplier = 1.0 - round_cents(discount / 100.0);
                round_cents(self.price * multiplier)
            }
            _ => self.price,
        }
    }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Denormalized, read-optimized projection of a [`Product`] stored in the search index.
///
/// Always rebuildable from the product plus its category; the `*_exact` fields duplicate
/// their text counterpart for whole-value matching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexedProduct {
    pub id: ProductId,
    pub name: String,
    pub name_exact: String,
    pub description: String,
    pub brand: String,
    pub brand_exact: String,
    pub color: String,
    pub color_exact: String,
    pub sizes: Vec<String>,
    pub category_id: Option<CategoryId>,
    pub category_name: String,
    pub category_name_exact: String,
    pub price: f64,
    pub in_stock: bool,
    pub on_sale: bool,
    pub discount_percentage: Option<f64>,
    pub average_rating: f64,
    pub review_count: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl IndexedProduct {
    /// Build the projection, snapshotting `category_name` as given.
    pub fn project(product: &Product, category_name: &str) -> Self {
        IndexedProduct {
            id: product.id.clone(),
            name: product.name.clone(),
            name_exact: product.name.clone(),
            description: product.description.clone(),
            brand: product.brand.clone(),
            brand_exact: product.brand.clone(),
            color: product.color.clone(),
            color_exact: product.color.clone(),
            sizes: product.sizes.clone(),
            category_id: product.category_id.clone(),
            category_name: category_name.to_string(),
            category_name_exact: category_name.to_string(),
            price: product.price,
            in_stock: product.in_stock,
            on_sale: product.on_sale,
            discount_percentage: product.discount_percentage,
            average_rating: product.average_rating,
            review_count: product.review_count,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

fn default_size() -> i64 {
    20
}

fn default_fuzzy() -> bool {
    true
}

/// Advanced search request. Page is zero-based.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(default)]
    pub keyword: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_size")]
    pub size: i64,
    #[serde(default = "default_fuzzy", rename = "fuzzySearch")]
    pub fuzzy: bool,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        SearchCriteria {
            keyword: None,
            category_id: None,
            min_price: None,
            max_price: None,
            page: 0,
            size: default_size(),
            fuzzy: default_fuzzy(),
        }
    }
}

impl SearchCriteria {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        SearchCriteria {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }

    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    pub fn with_page(mut self, page: i64, size: i64) -> Self {
        self.page = page;
        self.size = size;
        self
    }

    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    /// The trimmed keyword, or `None` when absent or blank.
    pub fn effective_keyword(&self) -> Option<&str> {
        self.keyword
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// One page of hydrated search results.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub products: Vec<Product>,
    pub total_items: u64,
    pub total_pages: u64,
    pub current_page: usize,
}
