//! Text analysis shared by indexing and query compilation.
//!
//! Both sides must run the same analyzer or phrase and term lookups silently miss.

pub mod product_tokenizer;
pub use product_tokenizer::ProductTokenizer;

use tantivy::tokenizer::{LowerCaser, RawTokenizer, TextAnalyzer, TokenStream};

/// Analyzer for tokenized product text fields.
pub const PRODUCT_TEXT: &str = "product_text";
/// Analyzer for whole-value keyword fields.
pub const PRODUCT_EXACT: &str = "product_exact";

pub fn text_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(ProductTokenizer)
        .filter(LowerCaser)
        .build()
}

pub fn exact_analyzer() -> TextAnalyzer {
    TextAnalyzer::builder(RawTokenizer::default())
        .filter(LowerCaser)
        .build()
}

pub fn register_analyzers(index: &tantivy::Index) {
    index.tokenizers().register(PRODUCT_TEXT, text_analyzer());
    index.tokenizers().register(PRODUCT_EXACT, exact_analyzer());
}

/// Run `analyzer` over `text` and collect the token texts in order.
pub fn analyze(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
    let mut stream = analyzer.token_stream(text);
    let mut out = Vec::new();
    while stream.advance() {
        out.push(stream.token().text.clone());
    }
    out
}

/// Whole-value normalization applied to `*_exact` fields, via the exact analyzer itself.
pub fn normalize_exact(value: &str) -> String {
    analyze(&mut exact_analyzer(), value)
        .into_iter()
        .next()
        .unwrap_or_default()
}
