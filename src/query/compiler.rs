use crate::error::{CatalogError, Result};
use crate::index::schema::ProductSchema;
use crate::query::fuzzy::FuzzyQueryBuilder;
use crate::query::model::{BoolQuery, FieldBoost, SearchField, SearchQuery};
use crate::tokenizer::{analyze, normalize_exact, text_analyzer};
use tantivy::query::{
    AllQuery, BooleanQuery, BoostQuery, ConstScoreQuery, DisjunctionMaxQuery, EmptyQuery,
    FuzzyTermQuery, Occur, PhraseQuery, Query, QueryParser, RegexQuery, TermQuery,
};
use tantivy::schema::IndexRecordOption;
use tantivy::tokenizer::TokenizerManager;
use tantivy::Term;

/// Lowers a [`SearchQuery`] into tantivy queries against a [`ProductSchema`].
pub struct QueryCompiler {
    schema: ProductSchema,
    range_parser: QueryParser,
}

impl QueryCompiler {
    const MAX_DEPTH: usize = 10;
    const MAX_CLAUSES: usize = 1000;

    pub fn new(schema: ProductSchema) -> Self {
        let range_parser = QueryParser::new(
            schema.schema().clone(),
            vec![schema.price],
            TokenizerManager::default(),
        );
        QueryCompiler {
            schema,
            range_parser,
        }
    }

    pub fn compile(&self, query: &SearchQuery) -> Result<Box<dyn Query>> {
        let clauses = query.clause_count();
        if clauses > Self::MAX_CLAUSES {
            return Err(CatalogError::QueryCompile(format!(
                "query has {} clauses, exceeds maximum {}",
                clauses,
                Self::MAX_CLAUSES
            )));
        }
        self.compile_at(query, 0)
    }

    fn compile_at(&self, query: &SearchQuery, depth: usize) -> Result<Box<dyn Query>> {
        if depth > Self::MAX_DEPTH {
            return Err(CatalogError::QueryCompile(format!(
                "query nesting exceeds maximum depth {}",
                Self::MAX_DEPTH
            )));
        }

        match query {
            SearchQuery::MatchAll => Ok(Box::new(AllQuery)),
            SearchQuery::Match { field, text, boost } => {
                let q = if field.is_analyzed() {
                    let tokens = tokens(text);
                    any_of(
                        tokens
                            .iter()
                            .map(|t| self.term_query(*field, t))
                            .collect(),
                    )
                } else {
                    self.term_query(*field, &self.normalize(*field, text))
                };
                Ok(boosted(q, *boost))
            }
            SearchQuery::Phrase { field, text, boost } => {
                let q = if field.is_analyzed() {
                    let tokens = tokens(text);
                    match tokens.len() {
                        0 => Box::new(EmptyQuery) as Box<dyn Query>,
                        1 => self.term_query(*field, &tokens[0]),
                        _ => {
                            let f = self.schema.field(*field);
                            let terms = tokens
                                .iter()
                                .map(|t| Term::from_field_text(f, t))
                                .collect();
                            Box::new(PhraseQuery::new(terms))
                        }
                    }
                } else {
                    self.term_query(*field, &self.normalize(*field, text))
                };
                Ok(boosted(q, *boost))
            }
            SearchQuery::Term {
                field,
                value,
                boost,
            } => {
                self.require_text(*field, "term")?;
                let q = self.term_query(*field, &self.normalize(*field, value));
                Ok(boosted(q, *boost))
            }
            SearchQuery::MultiMatch {
                text,
                fields,
                fuzziness,
                minimum_should_match,
                boost,
            } => {
                let tokens = tokens(text);
                if tokens.is_empty() {
                    return Ok(Box::new(EmptyQuery));
                }
                let required = minimum_should_match
                    .map(|m| m.resolve(tokens.len()))
                    .unwrap_or(1)
                    .max(1);
                let mut per_field: Vec<Box<dyn Query>> = Vec::with_capacity(fields.len());
                for FieldBoost { field, boost } in fields {
                    self.require_text(*field, "multi_match")?;
                    let q: Box<dyn Query> = if field.is_analyzed() {
                        let f = self.schema.field(*field);
                        let clauses = tokens
                            .iter()
                            .map(|t| {
                                (
                                    Occur::Should,
                                    FuzzyQueryBuilder::new(f, t.as_str(), *fuzziness).build(),
                                )
                            })
                            .collect();
                        Box::new(BooleanQuery::with_minimum_required_clauses(
                            clauses, required,
                        ))
                    } else {
                        self.term_query(*field, &self.normalize(*field, text))
                    };
                    per_field.push(boosted(q, *boost));
                }
                Ok(boosted(Box::new(DisjunctionMaxQuery::new(per_field)), *boost))
            }
            SearchQuery::Fuzzy {
                field,
                value,
                fuzziness,
                boost,
            } => {
                self.require_text(*field, "fuzzy")?;
                let normalized = self.normalize(*field, value);
                if normalized.is_empty() {
                    return Ok(Box::new(EmptyQuery));
                }
                let q =
                    FuzzyQueryBuilder::new(self.schema.field(*field), normalized, *fuzziness)
                        .build();
                Ok(boosted(q, *boost))
            }
            SearchQuery::Prefix {
                field,
                value,
                boost,
            } => {
                self.require_text(*field, "prefix")?;
                let normalized = self.normalize(*field, value);
                if normalized.is_empty() {
                    return Ok(Box::new(EmptyQuery));
                }
                let term = Term::from_field_text(self.schema.field(*field), &normalized);
                Ok(boosted(
                    Box::new(FuzzyTermQuery::new_prefix(term, 0, false)),
                    *boost,
                ))
            }
            SearchQuery::Wildcard {
                field,
                pattern,
                boost,
            } => {
                self.require_text(*field, "wildcard")?;
                let regex = wildcard_to_regex(&self.normalize(*field, pattern));
                let q = RegexQuery::from_pattern(&regex, self.schema.field(*field))
                    .map_err(|e| CatalogError::QueryCompile(e.to_string()))?;
                Ok(boosted(Box::new(q), *boost))
            }
            SearchQuery::Range { field, gte, lte } => {
                if *field != SearchField::Price {
                    return Err(CatalogError::QueryCompile(format!(
                        "range queries are only supported on price, not {}",
                        field.as_str()
                    )));
                }
                if gte.is_none() && lte.is_none() {
                    return Ok(Box::new(AllQuery));
                }
                let bound = |b: &Option<f64>| b.map_or_else(|| "*".to_string(), |v| v.to_string());
                let query_string = format!(
                    "{}:[{} TO {}]",
                    field.as_str(),
                    bound(gte),
                    bound(lte)
                );
                Ok(self.range_parser.parse_query(&query_string)?)
            }
            SearchQuery::Bool(b) => self.compile_bool(b, depth),
        }
    }

    fn compile_bool(&self, b: &BoolQuery, depth: usize) -> Result<Box<dyn Query>> {
        if b.must.is_empty() && b.should.is_empty() && b.filter.is_empty() {
            return Ok(Box::new(AllQuery));
        }

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for q in &b.must {
            clauses.push((Occur::Must, self.compile_at(q, depth + 1)?));
        }
        for q in &b.filter {
            let inner = self.compile_at(q, depth + 1)?;
            clauses.push((Occur::Must, Box::new(ConstScoreQuery::new(inner, 0.0))));
        }
        for q in &b.should {
            clauses.push((Occur::Should, self.compile_at(q, depth + 1)?));
        }

        match b.minimum_should_match {
            Some(n) if n > 0 && !b.should.is_empty() => Ok(Box::new(
                BooleanQuery::with_minimum_required_clauses(clauses, n.min(b.should.len())),
            )),
            _ => Ok(Box::new(BooleanQuery::new(clauses))),
        }
    }

    fn require_text(&self, field: SearchField, kind: &str) -> Result<()> {
        if field == SearchField::Price {
            return Err(CatalogError::QueryCompile(format!(
                "{} queries are not supported on numeric field price",
                kind
            )));
        }
        Ok(())
    }

    /// Normalize a whole value the way the field's indexed terms were normalized.
    fn normalize(&self, field: SearchField, value: &str) -> String {
        match field {
            SearchField::CategoryId => value.to_string(),
            _ => normalize_exact(value),
        }
    }

    fn term_query(&self, field: SearchField, value: &str) -> Box<dyn Query> {
        let term = Term::from_field_text(self.schema.field(field), value);
        Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs))
    }
}

fn tokens(text: &str) -> Vec<String> {
    analyze(&mut text_analyzer(), text)
}

fn any_of(queries: Vec<Box<dyn Query>>) -> Box<dyn Query> {
    match queries.len() {
        0 => Box::new(EmptyQuery),
        _ => Box::new(BooleanQuery::new(
            queries.into_iter().map(|q| (Occur::Should, q)).collect(),
        )),
    }
}

fn boosted(query: Box<dyn Query>, boost: f32) -> Box<dyn Query> {
    if (boost - 1.0).abs() < f32::EPSILON {
        query
    } else {
        Box::new(BoostQuery::new(query, boost))
    }
}

/// Translate a wildcard pattern into an anchored regex. `\` escapes the next character.
pub fn wildcard_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push_str(&regex::escape(&next.to_string()));
                }
            }
            other => out.push_str(&regex::escape(&other.to_string())),
        }
    }
    out
}
