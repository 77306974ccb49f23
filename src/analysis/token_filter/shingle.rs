//! Word n-gram (shingle) filter.
//!
//! For an n-gram range `(min_n, max_n)` the filter emits every run of
//! `min_n..=max_n` consecutive tokens joined by a single space. With `(1, 2)`
//! the stream `free entry now` becomes `free`, `entry`, `now`,
//! `free entry`, `entry now`.

use crate::analysis::token::{Token, TokenStream};
use crate::analysis::token_filter::Filter;
use crate::error::{Result, SpamError};

/// A filter that expands a token stream into word n-grams.
#[derive(Clone, Debug)]
pub struct ShingleFilter {
    min_n: usize,
    max_n: usize,
}

impl ShingleFilter {
    /// Create a shingle filter for the inclusive n-gram range.
    pub fn new(min_n: usize, max_n: usize) -> Result<Self> {
        if min_n == 0 || min_n > max_n {
            return Err(SpamError::configuration(format!(
                "invalid n-gram range [{min_n}, {max_n}]"
            )));
        }
        Ok(ShingleFilter { min_n, max_n })
    }

    pub fn range(&self) -> (usize, usize) {
        (self.min_n, self.max_n)
    }
}

impl Filter for ShingleFilter {
    fn filter(&self, tokens: TokenStream) -> Result<TokenStream> {
        let words: Vec<String> = tokens
            .filter(|token| !token.is_stopped())
            .map(|token| token.text)
            .collect();

        let mut out = Vec::new();
        let mut position = 0;
        for n in self.min_n..=self.max_n {
            if n > words.len() {
                break;
            }
            for window in words.windows(n) {
                out.push(Token::new(window.join(" "), position));
                position += 1;
            }
        }

        Ok(Box::new(out.into_iter()))
    }

    fn name(&self) -> &'static str {
        "shingle"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shingles(filter: &ShingleFilter, words: &[&str]) -> Vec<String> {
        let tokens: Vec<Token> = words
            .iter()
            .enumerate()
            .map(|(i, w)| Token::new(*w, i))
            .collect();
        filter
            .filter(Box::new(tokens.into_iter()))
            .unwrap()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn test_unigrams_and_bigrams() {
        let filter = ShingleFilter::new(1, 2).unwrap();
        assert_eq!(
            shingles(&filter, &["free", "entry", "now"]),
            vec!["free", "entry", "now", "free entry", "entry now"]
        );
    }

    #[test]
    fn test_bigrams_only() {
        let filter = ShingleFilter::new(2, 2).unwrap();
        assert_eq!(shingles(&filter, &["a", "b", "c"]), vec!["a b", "b c"]);
        assert!(shingles(&filter, &["alone"]).is_empty());
    }

    #[test]
    fn test_invalid_range() {
        assert!(ShingleFilter::new(0, 1).is_err());
        assert!(ShingleFilter::new(3, 2).is_err());
    }
}
