//! TF-IDF n-gram vectorizer for text feature extraction.

use std::collections::{BTreeMap, HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ChatbotError;
use crate::Result;

lazy_static! {
    /// Tokens are runs of two or more word characters.
    static ref TOKEN_PATTERN: Regex =
        Regex::new(r"\b\w\w+\b").expect("token pattern is a valid regex");
}

/// Sparse feature vector: (feature index, weight), sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

/// TF-IDF vectorizer over word n-grams.
pub struct TfIdfVectorizer {
    /// Smallest n-gram length.
    min_n: usize,
    /// Largest n-gram length.
    max_n: usize,
    /// Vocabulary: n-gram -> index mapping, indices in sorted term order.
    vocabulary: HashMap<String, usize>,
    /// Inverse document frequency for each feature.
    idf: Vec<f64>,
    /// Total number of documents seen during fitting.
    n_documents: usize,
}

impl std::fmt::Debug for TfIdfVectorizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TfIdfVectorizer")
            .field("ngram_range", &(self.min_n, self.max_n))
            .field("vocabulary_size", &self.vocabulary.len())
            .field("n_documents", &self.n_documents)
            .finish()
    }
}

impl TfIdfVectorizer {
    /// Create an unfitted vectorizer for n-grams of length `min_n..=max_n`.
    pub fn new(min_n: usize, max_n: usize) -> Self {
        let min_n = min_n.max(1);
        Self {
            min_n,
            max_n: max_n.max(min_n),
            vocabulary: HashMap::new(),
            idf: Vec::new(),
            n_documents: 0,
        }
    }

    /// Fit the vocabulary and idf weights on training documents.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) -> Result<()> {
        let mut document_frequency: BTreeMap<String, usize> = BTreeMap::new();

        for doc in documents {
            let unique: HashSet<String> = self.ngrams(doc.as_ref()).into_iter().collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        if document_frequency.is_empty() {
            return Err(ChatbotError::TrainingError(
                "Empty vocabulary: training patterns contain no usable tokens".to_string(),
            ));
        }

        let n = documents.len() as f64;
        let mut vocabulary = HashMap::with_capacity(document_frequency.len());
        let mut idf = Vec::with_capacity(document_frequency.len());

        // BTreeMap iteration gives indices in sorted term order
        for (idx, (term, df)) in document_frequency.into_iter().enumerate() {
            // IDF = ln((N + 1) / (df + 1)) + 1
            idf.push(((n + 1.0) / (df as f64 + 1.0)).ln() + 1.0);
            vocabulary.insert(term, idx);
        }

        self.vocabulary = vocabulary;
        self.idf = idf;
        self.n_documents = documents.len();

        Ok(())
    }

    /// Transform a document into an L2-normalised TF-IDF vector.
    ///
    /// N-grams outside the fitted vocabulary are ignored.
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: BTreeMap<usize, f64> = BTreeMap::new();

        for term in self.ngrams(document) {
            if let Some(&idx) = self.vocabulary.get(&term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut features: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();

        let norm = features.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, w) in &mut features {
                *w /= norm;
            }
        }

        features
    }

    /// Lowercased word n-grams of `text`, joined by single spaces.
    fn ngrams(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = TOKEN_PATTERN
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        let mut grams = Vec::new();
        for n in self.min_n..=self.max_n {
            if n > tokens.len() {
                break;
            }
            grams.extend(tokens.windows(n).map(|w| w.join(" ")));
        }
        grams
    }

    /// Get the size of the vocabulary.
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn ngram_range(&self) -> (usize, usize) {
        (self.min_n, self.max_n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tfidf_vectorizer() {
        let documents = vec![
            "what is machine learning",
            "how to install python",
            "buy laptop online",
        ];

        let mut vectorizer = TfIdfVectorizer::new(1, 4);
        vectorizer.fit(&documents).unwrap();

        // 4 + 3 + 2 + 1, 4 + 3 + 2 + 1, 3 + 2 + 1
        assert_eq!(vectorizer.vocabulary_size(), 26);

        let features = vectorizer.transform("what is python");
        // "what", "is", "python" and "what is"
        assert_eq!(features.len(), 4);

        let norm: f64 = features.iter().map(|(_, w)| w * w).sum();
        assert!((norm - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_short_tokens_and_case() {
        let mut vectorizer = TfIdfVectorizer::new(1, 2);
        vectorizer.fit(&["I am Here"]).unwrap();

        // "i" is a single character and dropped
        assert_eq!(vectorizer.vocabulary_size(), 3);
        assert_eq!(
            vectorizer.transform("AM here"),
            vectorizer.transform("am HERE")
        );
    }

    #[test]
    fn test_out_of_vocabulary_is_ignored() {
        let mut vectorizer = TfIdfVectorizer::new(1, 4);
        vectorizer.fit(&["hello there", "goodbye friend"]).unwrap();

        assert!(vectorizer.transform("completely unrelated words").is_empty());
        assert!(vectorizer.transform("").is_empty());
    }

    #[test]
    fn test_empty_vocabulary() {
        let mut vectorizer = TfIdfVectorizer::new(1, 4);
        let err = vectorizer.fit(&["a", "?", ""]).unwrap_err();
        assert!(matches!(err, ChatbotError::TrainingError(_)));
    }

    #[test]
    fn test_rare_terms_weigh_more() {
        let mut vectorizer = TfIdfVectorizer::new(1, 1);
        vectorizer
            .fit(&["hello world", "hello there", "hello friend"])
            .unwrap();

        let features = vectorizer.transform("hello world");
        let hello = vectorizer.vocabulary["hello"];
        let world = vectorizer.vocabulary["world"];
        let weight = |idx| features.iter().find(|(i, _)| *i == idx).unwrap().1;

        assert!(weight(world) > weight(hello));
    }
}
