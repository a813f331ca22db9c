//! Natural-language tokenizer for BM25, grounded on the teacher's `CodeTokenizer`
//! (`ploke-db::bm25_index::CodeTokenizer`) but simplified for prose rather than source
//! code: split on non-alphanumeric boundaries, lowercase, keep digits attached to
//! surrounding currency/percent punctuation so `$20,000` and `20%` survive as one token.

use bm25::Tokenizer;

#[derive(Default, Clone)]
pub struct WordTokenizer;

impl WordTokenizer {
    pub fn tokens(text: &str) -> Vec<String> {
        let mut out = Vec::new();
        let mut cur = String::new();
        let mut chars = text.chars().peekable();
        while let Some(ch) = chars.next() {
            if ch.is_alphanumeric() {
                cur.push(ch.to_ascii_lowercase());
            } else if (ch == '$' || ch == '%' || ch == '.' || ch == ',')
                && !cur.is_empty()
                && chars.peek().is_some_and(|n| n.is_ascii_digit())
            {
                // keep currency/percent/decimal markers glued to a following digit run
                cur.push(ch);
            } else {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
        }
        if !cur.is_empty() {
            out.push(cur);
        }
        out
    }
}

impl Tokenizer for WordTokenizer {
    fn tokenize(&self, input_text: &str) -> Vec<String> {
        Self::tokens(input_text)
    }
}
