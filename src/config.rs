use crate::error::{CatalogError, Result};
use crate::query::model::{FieldBoost, Fuzziness, MinimumShouldMatch, SearchField};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Relevance-tuning constants for [`crate::query::SearchQueryBuilder`].
///
/// Loaded from JSON so weights can be tuned without a rebuild. Missing keys fall back to
/// the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RelevanceConfig {
    pub phrase_name_boost: f32,
    pub exact_name_boost: f32,
    pub multi_match_fields: Vec<FieldBoost>,
    pub minimum_should_match: MinimumShouldMatch,
    pub fuzzy_fields: Vec<FieldBoost>,
    pub prefix_fields: Vec<FieldBoost>,
    pub substring_name_boost: f32,
    pub token_fields: Vec<FieldBoost>,
    /// Per-token clauses are only added for tokens longer than this many characters.
    pub min_token_chars: usize,
    pub one_edit_from: usize,
    pub two_edits_from: usize,
    /// Fields searched by the plain keyword search.
    pub keyword_fields: Vec<FieldBoost>,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        RelevanceConfig {
            phrase_name_boost: 3.0,
            exact_name_boost: 3.0,
            multi_match_fields: vec![
                FieldBoost::new(SearchField::Name, 2.5),
                FieldBoost::new(SearchField::Description, 1.5),
                FieldBoost::new(SearchField::Brand, 1.2),
                FieldBoost::new(SearchField::CategoryName, 1.0),
                FieldBoost::new(SearchField::Color, 0.8),
            ],
            minimum_should_match: MinimumShouldMatch {
                floor: 2,
                percent: 75,
            },
            fuzzy_fields: vec![
                FieldBoost::new(SearchField::Name, 1.0),
                FieldBoost::new(SearchField::Brand, 0.8),
                FieldBoost::new(SearchField::Description, 0.7),
            ],
            prefix_fields: vec![
                FieldBoost::new(SearchField::Name, 1.5),
                FieldBoost::new(SearchField::Brand, 1.0),
            ],
            substring_name_boost: 1.0,
            token_fields: vec![
                FieldBoost::new(SearchField::Name, 1.0),
                FieldBoost::new(SearchField::Description, 0.8),
                FieldBoost::new(SearchField::Brand, 0.7),
            ],
            min_token_chars: 2,
            one_edit_from: 3,
            two_edits_from: 6,
            keyword_fields: vec![
                FieldBoost::new(SearchField::Name, 1.0),
                FieldBoost::new(SearchField::Description, 1.0),
            ],
        }
    }
}

impl RelevanceConfig {
    pub fn auto_fuzziness(&self) -> Fuzziness {
        Fuzziness::Auto {
            one_edit_from: self.one_edit_from,
            two_edits_from: self.two_edits_from,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let all_boosts = self
            .multi_match_fields
            .iter()
            .chain(&self.fuzzy_fields)
            .chain(&self.prefix_fields)
            .chain(&self.token_fields)
            .chain(&self.keyword_fields)
            .map(|fb| fb.boost)
            .chain([
                self.phrase_name_boost,
                self.exact_name_boost,
                self.substring_name_boost,
            ]);
        for boost in all_boosts {
            if !boost.is_finite() || boost < 0.0 {
                return Err(CatalogError::Config(format!(
                    "boost must be a finite non-negative number, got {}",
                    boost
                )));
            }
        }
        if self.minimum_should_match.percent > 100 {
            return Err(CatalogError::Config(format!(
                "minimumShouldMatch.percent must be <= 100, got {}",
                self.minimum_should_match.percent
            )));
        }
        if self.one_edit_from > self.two_edits_from {
            return Err(CatalogError::Config(
                "oneEditFrom must not exceed twoEditsFrom".to_string(),
            ));
        }
        Ok(())
    }
}

/// Timeouts and retry policy for calls to the index and the catalog store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExecutionConfig {
    pub index_timeout_ms: u64,
    pub store_timeout_ms: u64,
    /// Total attempts for an index call, including the first.
    pub retry_attempts: u32,
    pub retry_base_delay_ms: u64,
    /// Result cap for the plain keyword search, which is not paginated.
    pub keyword_result_limit: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            index_timeout_ms: 5_000,
            store_timeout_ms: 5_000,
            retry_attempts: 3,
            retry_base_delay_ms: 50,
            keyword_result_limit: 100,
        }
    }
}

impl ExecutionConfig {
    pub fn index_timeout(&self) -> Duration {
        Duration::from_millis(self.index_timeout_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

/// Settings for keeping the index in step with the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncConfig {
    /// Concurrent index writes during a full reindex.
    pub workers: usize,
    /// Records each reindex worker commits together.
    pub batch_size: usize,
    /// Run a full reindex when the service starts.
    pub resync_on_startup: bool,
    /// Memory budget for the index writer, in bytes.
    pub writer_memory_bytes: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            workers: 4,
            batch_size: 256,
            resync_on_startup: true,
            writer_memory_bytes: 50_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub relevance: RelevanceConfig,
    pub execution: ExecutionConfig,
    pub sync: SyncConfig,
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load config from `AISLE_*` environment variables with defaults.
    ///
    /// `AISLE_CONFIG` names a JSON file used as the base; individual variables override it.
    pub fn from_env() -> Result<Self> {
        let mut config = match std::env::var("AISLE_CONFIG") {
            Ok(path) => Self::load(path)?,
            Err(_) => EngineConfig::default(),
        };

        if let Some(v) = env_parse("AISLE_INDEX_TIMEOUT_MS")? {
            config.execution.index_timeout_ms = v;
        }
        if let Some(v) = env_parse("AISLE_STORE_TIMEOUT_MS")? {
            config.execution.store_timeout_ms = v;
        }
        if let Some(v) = env_parse("AISLE_RETRY_ATTEMPTS")? {
            config.execution.retry_attempts = v;
        }
        if let Some(v) = env_parse("AISLE_RETRY_BASE_DELAY_MS")? {
            config.execution.retry_base_delay_ms = v;
        }
        if let Some(v) = env_parse("AISLE_KEYWORD_RESULT_LIMIT")? {
            config.execution.keyword_result_limit = v;
        }
        if let Some(v) = env_parse("AISLE_REINDEX_WORKERS")? {
            config.sync.workers = v;
        }
        if let Some(v) = env_parse("AISLE_REINDEX_BATCH_SIZE")? {
            config.sync.batch_size = v;
        }
        if let Some(v) = env_parse::<usize>("AISLE_WRITER_MEMORY_MB")? {
            config.sync.writer_memory_bytes = v * 1024 * 1024;
        }
        if let Ok(v) = std::env::var("AISLE_RESYNC_ON_STARTUP") {
            config.sync.resync_on_startup = v != "false" && v != "0";
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.relevance.validate()?;
        if self.sync.workers == 0 {
            return Err(CatalogError::Config(
                "sync.workers must be at least 1".to_string(),
            ));
        }
        if self.sync.batch_size == 0 {
            return Err(CatalogError::Config(
                "sync.batchSize must be at least 1".to_string(),
            ));
        }
        if self.execution.retry_attempts == 0 {
            return Err(CatalogError::Config(
                "execution.retryAttempts must be at least 1".to_string(),
            ));
        }
        if self.execution.keyword_result_limit == 0 {
            return Err(CatalogError::Config(
                "execution.keywordResultLimit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| CatalogError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        for key in [
            "AISLE_CONFIG",
            "AISLE_INDEX_TIMEOUT_MS",
            "AISLE_STORE_TIMEOUT_MS",
            "AISLE_RETRY_ATTEMPTS",
            "AISLE_RETRY_BASE_DELAY_MS",
            "AISLE_KEYWORD_RESULT_LIMIT",
            "AISLE_REINDEX_WORKERS",
            "AISLE_REINDEX_BATCH_SIZE",
            "AISLE_WRITER_MEMORY_MB",
            "AISLE_RESYNC_ON_STARTUP",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn defaults_carry_the_tuned_weights() {
        let config = RelevanceConfig::default();
        assert_eq!(config.phrase_name_boost, 3.0);
        assert_eq!(config.multi_match_fields.len(), 5);
        assert_eq!(config.multi_match_fields[0].field, SearchField::Name);
        assert_eq!(config.multi_match_fields[0].boost, 2.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"relevance": {"phraseNameBoost": 5.0}}"#).unwrap();
        assert_eq!(config.relevance.phrase_name_boost, 5.0);
        assert_eq!(config.relevance.exact_name_boost, 3.0);
        assert_eq!(config.sync.workers, 4);
    }

    #[test]
    fn rejects_zero_batch_size() {
        let mut config = EngineConfig::default();
        config.sync.batch_size = 0;
        assert!(matches!(config.validate(), Err(CatalogError::Config(_))));
    }

    #[test]
    fn rejects_negative_boost() {
        let mut config = EngineConfig::default();
        config.relevance.prefix_fields[0].boost = -1.0;
        assert!(matches!(config.validate(), Err(CatalogError::Config(_))));
    }

    #[test]
    fn load_round_trips_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("aisle.json");
        let mut config = EngineConfig::default();
        config.sync.workers = 8;
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    #[serial]
    fn env_overrides_defaults() {
        clear_env();
        std::env::set_var("AISLE_REINDEX_WORKERS", "2");
        std::env::set_var("AISLE_INDEX_TIMEOUT_MS", "250");
        std::env::set_var("AISLE_RESYNC_ON_STARTUP", "false");
        std::env::set_var("AISLE_REINDEX_BATCH_SIZE", "64");
        let config = EngineConfig::from_env().unwrap();
        assert_eq!(config.sync.workers, 2);
        assert_eq!(config.sync.batch_size, 64);
        assert_eq!(config.execution.index_timeout(), Duration::from_millis(250));
        assert!(!config.sync.resync_on_startup);
        clear_env();
    }

    #[test]
    #[serial]
    fn env_rejects_garbage() {
        clear_env();
        std::env::set_var("AISLE_REINDEX_WORKERS", "lots");
        assert!(matches!(
            EngineConfig::from_env(),
            Err(CatalogError::Config(_))
        ));
        clear_env();
    }
}
