//! Structured relevance query.
//!
//! Queries are assembled as plain values, unit-tested as values, and only lowered into the
//! index's own query language at the index boundary (see [`crate::query::compiler`]).

use serde::{Deserialize, Serialize};

/// Fields of the product index addressable by a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchField {
    Name,
    NameExact,
    Description,
    Brand,
    BrandExact,
    Color,
    ColorExact,
    CategoryName,
    CategoryNameExact,
    CategoryId,
    Price,
}

impl SearchField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchField::Name => "name",
            SearchField::NameExact => "name_exact",
            SearchField::Description => "description",
            SearchField::Brand => "brand",
            SearchField::BrandExact => "brand_exact",
            SearchField::Color => "color",
            SearchField::ColorExact => "color_exact",
            SearchField::CategoryName => "category_name",
            SearchField::CategoryNameExact => "category_name_exact",
            SearchField::CategoryId => "category_id",
            SearchField::Price => "price",
        }
    }

    /// Analyzed (tokenized) text fields, as opposed to whole-value keyword fields.
    pub fn is_analyzed(&self) -> bool {
        matches!(
            self,
            SearchField::Name
                | SearchField::Description
                | SearchField::Brand
                | SearchField::Color
                | SearchField::CategoryName
        )
    }
}

/// A field paired with its relevance weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldBoost {
    pub field: SearchField,
    pub boost: f32,
}

impl FieldBoost {
    pub const fn new(field: SearchField, boost: f32) -> Self {
        FieldBoost { field, boost }
    }
}

/// Allowed edit distance for fuzzy term matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Fuzziness {
    Off,
    Edits { distance: u8 },
    /// Length-dependent: 0 edits below `one_edit_from` chars, 1 edit below
    /// `two_edits_from`, 2 edits otherwise.
    Auto {
        one_edit_from: usize,
        two_edits_from: usize,
    },
}

/// "At least `floor` sub-clauses, or `percent`% of them rounded up, whichever is larger",
/// never more than the number of clauses available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinimumShouldMatch {
    pub floor: usize,
    pub percent: u8,
}

impl MinimumShouldMatch {
    pub fn resolve(&self, clause_count: usize) -> usize {
        let by_percent = (clause_count * self.percent as usize).div_ceil(100);
        by_percent.max(self.floor).min(clause_count)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoolQuery {
    /// Scoring clauses that must all match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub must: Vec<SearchQuery>,
    /// Scoring clauses; at least `minimum_should_match` must match when set.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub should: Vec<SearchQuery>,
    /// Non-scoring clauses that must all match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter: Vec<SearchQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SearchQuery {
    MatchAll,
    /// Analyzed text, any token may match.
    Match {
        field: SearchField,
        text: String,
        boost: f32,
    },
    /// Analyzed text, tokens must appear adjacent and in order.
    Phrase {
        field: SearchField,
        text: String,
        boost: f32,
    },
    /// Whole normalized value equality.
    Term {
        field: SearchField,
        value: String,
        boost: f32,
    },
    /// Best-scoring field wins; each field must match `minimum_should_match` of the tokens.
    MultiMatch {
        text: String,
        fields: Vec<FieldBoost>,
        fuzziness: Fuzziness,
        minimum_should_match: Option<MinimumShouldMatch>,
        boost: f32,
    },
    Fuzzy {
        field: SearchField,
        value: String,
        fuzziness: Fuzziness,
        boost: f32,
    },
    Prefix {
        field: SearchField,
        value: String,
        boost: f32,
    },
    /// `*` matches any run of characters, `?` exactly one.
    Wildcard {
        field: SearchField,
        pattern: String,
        boost: f32,
    },
    /// Inclusive numeric range; `None` leaves that side open.
    Range {
        field: SearchField,
        gte: Option<f64>,
        lte: Option<f64>,
    },
    Bool(BoolQuery),
}

impl SearchQuery {
    /// Number of leaf clauses in the tree.
    pub fn clause_count(&self) -> usize {
        match self {
            SearchQuery::Bool(b) => b
                .must
                .iter()
                .chain(&b.should)
                .chain(&b.filter)
                .map(SearchQuery::clause_count)
                .sum(),
            _ => 1,
        }
    }
}

/// A built query plus pagination, ready for a [`crate::index::ProductIndex`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: SearchQuery,
    pub page: usize,
    pub size: usize,
}

impl SearchRequest {
    pub fn offset(&self) -> usize {
        self.page.saturating_mul(self.size)
    }
}
