use crate::config::RelevanceConfig;
use crate::error::{CatalogError, Result};
use crate::query::model::{BoolQuery, Fuzziness, SearchField, SearchQuery, SearchRequest};
use crate::tokenizer::normalize_exact;
use crate::types::SearchCriteria;
use std::sync::Arc;

/// Translates [`SearchCriteria`] into a weighted [`SearchQuery`].
///
/// The keyword becomes a required disjunction of clauses that trade precision for recall:
/// exact and phrase matches on the name score highest, then a fuzzy multi-field match,
/// single-field fuzzy and prefix matches, a substring match on the name, and for
/// multi-word keywords one fuzzy multi-field clause per significant token. Category and
/// price constraints are non-scoring filters.
#[derive(Debug, Clone)]
pub struct SearchQueryBuilder {
    config: Arc<RelevanceConfig>,
}

impl SearchQueryBuilder {
    pub fn new(config: Arc<RelevanceConfig>) -> Self {
        SearchQueryBuilder { config }
    }

    pub fn config(&self) -> &RelevanceConfig {
        &self.config
    }

    pub fn build(&self, criteria: &SearchCriteria) -> Result<SearchRequest> {
        let (page, size) = validate_pagination(criteria.page, criteria.size)?;
        validate_price_bounds(criteria.min_price, criteria.max_price)?;

        let mut root = BoolQuery::default();

        if let Some(keyword) = criteria.effective_keyword() {
            root.must.push(self.keyword_disjunction(keyword, criteria.fuzzy));
        }

        if let Some(category_id) = criteria
            .category_id
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        {
            root.filter.push(SearchQuery::Term {
                field: SearchField::CategoryId,
                value: category_id.to_string(),
                boost: 1.0,
            });
        }

        if criteria.min_price.is_some() || criteria.max_price.is_some() {
            root.filter.push(SearchQuery::Range {
                field: SearchField::Price,
                gte: criteria.min_price,
                lte: criteria.max_price,
            });
        }

        let query = if root.must.is_empty() && root.filter.is_empty() {
            SearchQuery::MatchAll
        } else {
            SearchQuery::Bool(root)
        };

        Ok(SearchRequest { query, page, size })
    }

    /// Plain keyword search over name and description. `None` for a blank keyword.
    pub fn build_keyword_search(&self, keyword: &str, limit: usize) -> Option<SearchRequest> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return None;
        }
        let should = self
            .config
            .keyword_fields
            .iter()
            .map(|fb| SearchQuery::Match {
                field: fb.field,
                text: keyword.to_string(),
                boost: fb.boost,
            })
            .collect();
        Some(SearchRequest {
            query: SearchQuery::Bool(BoolQuery {
                should,
                minimum_should_match: Some(1),
                ..Default::default()
            }),
            page: 0,
            size: limit.max(1),
        })
    }

    /// The required keyword disjunction. `keyword` must already be trimmed and non-blank.
    pub fn keyword_disjunction(&self, keyword: &str, fuzzy: bool) -> SearchQuery {
        let cfg = &self.config;
        let fuzziness = if fuzzy {
            cfg.auto_fuzziness()
        } else {
            Fuzziness::Off
        };
        let lowered = normalize_exact(keyword);
        let mut should = Vec::new();

        should.push(SearchQuery::Phrase {
            field: SearchField::Name,
            text: keyword.to_string(),
            boost: cfg.phrase_name_boost,
        });
        should.push(SearchQuery::Term {
            field: SearchField::NameExact,
            value: lowered.clone(),
            boost: cfg.exact_name_boost,
        });

        should.push(SearchQuery::MultiMatch {
            text: keyword.to_string(),
            fields: cfg.multi_match_fields.clone(),
            fuzziness,
            minimum_should_match: Some(cfg.minimum_should_match),
            boost: 1.0,
        });

        if fuzzy {
            for fb in &cfg.fuzzy_fields {
                should.push(SearchQuery::Fuzzy {
                    field: fb.field,
                    value: lowered.clone(),
                    fuzziness,
                    boost: fb.boost,
                });
            }
        }

        for fb in &cfg.prefix_fields {
            should.push(SearchQuery::Prefix {
                field: fb.field,
                value: lowered.clone(),
                boost: fb.boost,
            });
        }

        should.push(SearchQuery::Wildcard {
            field: SearchField::NameExact,
            pattern: format!("*{}*", escape_wildcard(&lowered)),
            boost: cfg.substring_name_boost,
        });

        if keyword.contains(char::is_whitespace) {
            for token in keyword.split_whitespace() {
                if token.chars().count() > cfg.min_token_chars {
                    should.push(SearchQuery::MultiMatch {
                        text: token.to_string(),
                        fields: cfg.token_fields.clone(),
                        fuzziness,
                        minimum_should_match: None,
                        boost: 1.0,
                    });
                }
            }
        }

        SearchQuery::Bool(BoolQuery {
            should,
            minimum_should_match: Some(1),
            ..Default::default()
        })
    }
}

fn validate_pagination(page: i64, size: i64) -> Result<(usize, usize)> {
    if page < 0 {
        return Err(CatalogError::InvalidArgument(format!(
            "page must not be negative, got {}",
            page
        )));
    }
    if size < 1 {
        return Err(CatalogError::InvalidArgument(format!(
            "size must be at least 1, got {}",
            size
        )));
    }
    let page = usize::try_from(page)
        .map_err(|_| CatalogError::InvalidArgument(format!("page {} out of range", page)))?;
    let size = usize::try_from(size)
        .map_err(|_| CatalogError::InvalidArgument(format!("size {} out of range", size)))?;
    Ok((page, size))
}

fn validate_price_bounds(min: Option<f64>, max: Option<f64>) -> Result<()> {
    for (label, bound) in [("minPrice", min), ("maxPrice", max)] {
        if let Some(v) = bound {
            if !v.is_finite() || v < 0.0 {
                return Err(CatalogError::InvalidArgument(format!(
                    "{} must be a non-negative number, got {}",
                    label, v
                )));
            }
        }
    }
    if let (Some(lo), Some(hi)) = (min, max) {
        if lo > hi {
            return Err(CatalogError::InvalidArgument(format!(
                "minPrice {} exceeds maxPrice {}",
                lo, hi
            )));
        }
    }
    Ok(())
}

/// Escape wildcard metacharacters so user text matches literally.
fn escape_wildcard(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '*' | '?' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
