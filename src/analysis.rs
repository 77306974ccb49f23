//! Text analysis for SMS messages.
//!
//! Messages flow through a pipeline of char filters, a tokenizer and token
//! filters, producing the terms that the classifiers vectorize:
//!
//! 1. [`char_filter::normalize::NormalizeCharFilter`] lowercases and strips
//!    everything but ASCII letters, digits and single spaces.
//! 2. [`tokenizer::whitespace::WhitespaceTokenizer`] splits on spaces.
//! 3. [`token_filter::stop::StopFilter`] drops common English words.
//! 4. [`token_filter::shingle::ShingleFilter`] emits word n-grams.

pub mod analyzer;
pub mod char_filter;
pub mod token;
pub mod token_filter;
pub mod tokenizer;

pub use char_filter::normalize::normalize;
