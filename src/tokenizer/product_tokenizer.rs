use tantivy::tokenizer::{Token, TokenStream, Tokenizer};

/// Splits product text into alphanumeric words, emitting each CJK ideograph or kana
/// as a token of its own so that unsegmented scripts still match per character.
#[derive(Clone, Default)]
pub struct ProductTokenizer;

fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' |
        '\u{3400}'..='\u{4DBF}' |
        '\u{F900}'..='\u{FAFF}' |
        '\u{2E80}'..='\u{2EFF}' |
        '\u{3040}'..='\u{309F}' |
        '\u{30A0}'..='\u{30FF}' |
        '\u{31F0}'..='\u{31FF}' |
        '\u{AC00}'..='\u{D7AF}' |
        '\u{1100}'..='\u{11FF}' |
        '\u{20000}'..='\u{2A6DF}' |
        '\u{2A700}'..='\u{2CEAF}'
    )
}

pub struct ProductTokenStream {
    tokens: Vec<Token>,
    index: usize,
}

impl TokenStream for ProductTokenStream {
    fn advance(&mut self) -> bool {
        if self.index < self.tokens.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }

    fn token(&self) -> &Token {
        &self.tokens[self.index - 1]
    }

    fn token_mut(&mut self) -> &mut Token {
        &mut self.tokens[self.index - 1]
    }
}

impl Tokenizer for ProductTokenizer {
    type TokenStream<'a> = ProductTokenStream;

    fn token_stream<'a>(&'a mut self, text: &'a str) -> Self::TokenStream<'a> {
        let mut tokens = Vec::new();
        let mut position = 0;
        let mut chars = text.char_indices().peekable();

        while let Some(&(start, c)) = chars.peek() {
            if is_cjk(c) {
                tokens.push(Token {
                    offset_from: start,
                    offset_to: start + c.len_utf8(),
                    position,
                    text: c.to_string(),
                    ..Default::default()
                });
                position += 1;
                chars.next();
            } else if c.is_alphanumeric() {
                let mut end = start;
                while let Some(&(bi, ci)) = chars.peek() {
                    if ci.is_alphanumeric() && !is_cjk(ci) {
                        end = bi + ci.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token {
                    offset_from: start,
                    offset_to: end,
                    position,
                    text: text[start..end].to_string(),
                    ..Default::default()
                });
                position += 1;
            } else {
                chars.next();
            }
        }

        ProductTokenStream { tokens, index: 0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<(String, usize)> {
        let mut tokenizer = ProductTokenizer;
        let mut stream = tokenizer.token_stream(text);
        let mut out = Vec::new();
        while stream.advance() {
            let t = stream.token();
            out.push((t.text.clone(), t.position));
        }
        out
    }

    #[test]
    fn splits_on_punctuation_and_whitespace() {
        assert_eq!(
            tokens("Slim-Fit  Jeans, 32\""),
            vec![
                ("Slim".to_string(), 0),
                ("Fit".to_string(), 1),
                ("Jeans".to_string(), 2),
                ("32".to_string(), 3),
            ]
        );
    }

    #[test]
    fn cjk_characters_are_single_tokens() {
        let toks: Vec<String> = tokens("牛仔裤 jeans").into_iter().map(|t| t.0).collect();
        assert_eq!(toks, vec!["牛", "仔", "裤", "jeans"]);
    }

    #[test]
    fn empty_and_symbol_only_text_yields_nothing() {
        assert!(tokens("").is_empty());
        assert!(tokens(" -- !! ").is_empty());
    }

    #[test]
    fn offsets_point_into_source() {
        let text = "Café Noir";
        let mut tokenizer = ProductTokenizer;
        let mut stream = tokenizer.token_stream(text);
        assert!(stream.advance());
        let t = stream.token();
        assert_eq!(&text[t.offset_from..t.offset_to], "Café");
    }
}
