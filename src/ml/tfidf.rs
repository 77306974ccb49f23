//! TF-IDF vectorizer for message feature extraction.
//!
//! Term weights are raw counts scaled by the smoothed inverse document
//! frequency `ln((1 + n) / (1 + df)) + 1`, and each row is L2-normalized.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use ahash::AHashMap;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::analysis::analyzer::Analyzer;
use crate::config::DocFrequency;
use crate::error::{Result, SpamError};

/// Sparse feature vector as `(feature index, value)` pairs sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

/// Vocabulary pruning parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TfIdfParams {
    pub max_features: usize,
    pub min_df: DocFrequency,
    pub max_df: DocFrequency,
}

/// The fitted, serializable part of a vectorizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TfIdfState {
    /// Terms in feature-index order.
    pub terms: Vec<String>,
    pub idf: Vec<f64>,
    pub n_documents: usize,
}

/// TF-IDF vectorizer for text feature extraction.
pub struct TfIdfVectorizer {
    /// Vocabulary: term -> feature index.
    vocabulary: AHashMap<String, usize>,
    state: TfIdfState,
    params: TfIdfParams,
    analyzer: Arc<dyn Analyzer>,
}

impl std::fmt::Debug for TfIdfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfIdfVectorizer")
            .field("vocabulary_size", &self.vocabulary.len())
            .field("n_documents", &self.state.n_documents)
            .field("params", &self.params)
            .field("analyzer", &self.analyzer.name())
            .finish()
    }
}

impl TfIdfVectorizer {
    /// Create an unfitted vectorizer.
    pub fn new(analyzer: Arc<dyn Analyzer>, params: TfIdfParams) -> Self {
        Self {
            vocabulary: AHashMap::new(),
            state: TfIdfState {
                terms: Vec::new(),
                idf: Vec::new(),
                n_documents: 0,
            },
            params,
            analyzer,
        }
    }

    /// Restore a fitted vectorizer.
    pub fn from_state(
        analyzer: Arc<dyn Analyzer>,
        params: TfIdfParams,
        state: TfIdfState,
    ) -> Result<Self> {
        if state.terms.len() != state.idf.len() {
            return Err(SpamError::corrupt(format!(
                "vectorizer has {} terms but {} idf weights",
                state.terms.len(),
                state.idf.len()
            )));
        }

        let vocabulary = state
            .terms
            .iter()
            .enumerate()
            .map(|(i, term)| (term.clone(), i))
            .collect();

        Ok(Self {
            vocabulary,
            state,
            params,
            analyzer,
        })
    }

    pub fn state(&self) -> &TfIdfState {
        &self.state
    }

    /// Fit the vocabulary and idf weights on training documents.
    pub fn fit(&mut self, documents: &[&str]) -> Result<()> {
        let n_documents = documents.len();
        if n_documents == 0 {
            return Err(SpamError::data("cannot fit TF-IDF on zero documents"));
        }

        let mut document_frequency: AHashMap<String, usize> = AHashMap::new();
        let mut term_frequency: AHashMap<String, usize> = AHashMap::new();

        for doc in documents {
            let terms = self.analyzer.terms(doc)?;
            let unique: HashSet<&String> = terms.iter().collect();
            for term in unique {
                *document_frequency.entry(term.clone()).or_insert(0) += 1;
            }
            for term in terms {
                *term_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let min_df = self.params.min_df.resolve(n_documents);
        let max_df = self.params.max_df.resolve(n_documents);
        if max_df < min_df {
            return Err(SpamError::configuration(format!(
                "max_df ({max_df}) corresponds to fewer documents than min_df ({min_df})"
            )));
        }

        let mut kept: Vec<(String, usize)> = document_frequency
            .iter()
            .filter(|&(_, &df)| df as f64 >= min_df && df as f64 <= max_df)
            .map(|(term, _)| {
                let tf = term_frequency.get(term).copied().unwrap_or(0);
                (term.clone(), tf)
            })
            .collect();

        if kept.is_empty() {
            return Err(SpamError::data(
                "empty vocabulary after document-frequency pruning",
            ));
        }

        // Most frequent terms first, ties alphabetical.
        kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        kept.truncate(self.params.max_features);

        let mut terms: Vec<String> = kept.into_iter().map(|(term, _)| term).collect();
        terms.sort();

        let idf = terms
            .iter()
            .map(|term| {
                let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
                ((n_documents as f64 + 1.0) / (df + 1.0)).ln() + 1.0
            })
            .collect();

        debug!(
            "Fitted TF-IDF on {n_documents} documents: {} of {} terms kept",
            terms.len(),
            document_frequency.len()
        );

        *self = Self::from_state(
            Arc::clone(&self.analyzer),
            self.params,
            TfIdfState {
                terms,
                idf,
                n_documents,
            },
        )?;
        Ok(())
    }

    /// Transform a document into an L2-normalized TF-IDF vector.
    pub fn transform(&self, document: &str) -> Result<SparseVector> {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
        for term in self.analyzer.terms(document)? {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .map(|(idx, count)| (idx, count * self.state.idf[idx]))
            .collect();

        let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in &mut vector {
                *v /= norm;
            }
        }

        Ok(vector)
    }

    /// Fit on `documents` and return their vectors.
    pub fn fit_transform(&mut self, documents: &[&str]) -> Result<Vec<SparseVector>> {
        self.fit(documents)?;
        documents.iter().map(|doc| self.transform(doc)).collect()
    }

    /// Get the size of the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn feature_index(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }
}
