pub mod builder;
pub mod compiler;
pub mod executor;
pub mod fuzzy;
pub mod model;

pub use builder::SearchQueryBuilder;
pub use compiler::QueryCompiler;
pub use executor::{total_pages, ExecutedSearch, SearchExecutor};
pub use model::{
    BoolQuery, FieldBoost, Fuzziness, MinimumShouldMatch, SearchField, SearchQuery, SearchRequest,
};
