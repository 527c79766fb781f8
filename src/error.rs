use http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CatalogError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Search index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Catalog store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Reindex finished with {failed} failures ({succeeded} succeeded)")]
    PartialFailure { succeeded: usize, failed: usize },

    #[error("Version conflict on product {id}: expected {expected}, found {actual}")]
    Conflict {
        id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Query compile error: {0}")]
    QueryCompile(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),
}

pub type Result<T> = std::result::Result<T, CatalogError>;

impl CatalogError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        CatalogError::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Only transient index failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::IndexUnavailable(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            CatalogError::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CatalogError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CatalogError::PartialFailure { .. } => StatusCode::MULTI_STATUS,
            CatalogError::Conflict { .. } => StatusCode::CONFLICT,
            CatalogError::QueryCompile(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CatalogError::Cancelled => StatusCode::SERVICE_UNAVAILABLE,
            CatalogError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CatalogError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CatalogError::Json(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<std::io::Error> for CatalogError {
    fn from(e: std::io::Error) -> Self {
        CatalogError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(e: serde_json::Error) -> Self {
        CatalogError::Json(e.to_string())
    }
}

impl From<tantivy::TantivyError> for CatalogError {
    fn from(e: tantivy::TantivyError) -> Self {
        CatalogError::IndexUnavailable(e.to_string())
    }
}

impl From<tantivy::query::QueryParserError> for CatalogError {
    fn from(e: tantivy::query::QueryParserError) -> Self {
        CatalogError::QueryCompile(e.to_string())
    }
}
