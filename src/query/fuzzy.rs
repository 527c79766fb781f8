use crate::query::model::Fuzziness;
use tantivy::query::{FuzzyTermQuery, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::Term;

/// Longest edit distance the term automaton supports cheaply.
pub const MAX_DISTANCE: u8 = 2;

impl Fuzziness {
    /// Edit distance allowed for `term`, clamped to [`MAX_DISTANCE`].
    pub fn distance_for(&self, term: &str) -> u8 {
        match *self {
            Fuzziness::Off => 0,
            Fuzziness::Edits { distance } => distance.min(MAX_DISTANCE),
            Fuzziness::Auto {
                one_edit_from,
                two_edits_from,
            } => {
                let len = term.chars().count();
                if len < one_edit_from {
                    0
                } else if len < two_edits_from {
                    1
                } else {
                    2
                }
            }
        }
    }
}

pub struct FuzzyQueryBuilder {
    field: Field,
    term: String,
    distance: u8,
}

impl FuzzyQueryBuilder {
    pub fn new(field: Field, term: impl Into<String>, fuzziness: Fuzziness) -> Self {
        let term = term.into();
        let distance = fuzziness.distance_for(&term);
        FuzzyQueryBuilder {
            field,
            term,
            distance,
        }
    }

    pub fn distance(&self) -> u8 {
        self.distance
    }

    /// A plain term lookup at distance 0, otherwise a Levenshtein automaton query
    /// counting transpositions as one edit.
    pub fn build(self) -> Box<dyn Query> {
        let term = Term::from_field_text(self.field, &self.term);
        if self.distance == 0 {
            return Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
        }
        Box::new(FuzzyTermQuery::new(term, self.distance, true))
    }
}
