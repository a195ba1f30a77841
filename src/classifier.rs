//! Intent Classifier
//!
//! Maps free-text utterances to intent tags:
//! - TF-IDF over word n-grams (1–4) fitted on the catalog's patterns
//! - One-vs-rest logistic regression, one binary model per tag
//!
//! Fitted once at startup and read-only afterwards.

use std::collections::BTreeSet;

use tracing::{debug, info, warn};

use crate::error::ChatbotError;
use crate::intents::IntentCatalog;
use crate::vectorizer::{SparseVector, TfIdfVectorizer};
use crate::Result;

/// Fitting parameters
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// Inclusive n-gram length range
    pub ngram_range: (usize, usize),
    /// Inverse L2 regularisation strength
    pub c: f64,
    /// Gradient descent iteration cap per binary model
    pub max_iter: usize,
    /// Stop once every gradient component is below this
    pub tol: f64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ngram_range: (1, 4),
            c: 1.0,
            max_iter: 10_000,
            tol: 1e-4,
        }
    }
}

/// One binary "this tag vs. the rest" model
#[derive(Debug, Clone)]
struct BinaryModel {
    weights: Vec<f64>,
    intercept: f64,
}

impl BinaryModel {
    fn decision(&self, features: &SparseVector) -> f64 {
        self.intercept
            + features
                .iter()
                .map(|&(idx, value)| self.weights[idx] * value)
                .sum::<f64>()
    }
}

/// Fitted intent classifier
#[derive(Debug)]
pub struct IntentClassifier {
    vectorizer: TfIdfVectorizer,
    /// Tags in sorted order; `models[i]` scores `classes[i]`
    classes: Vec<String>,
    models: Vec<BinaryModel>,
}

impl IntentClassifier {
    /// Fit with default parameters
    pub fn fit(catalog: &IntentCatalog) -> Result<Self> {
        Self::fit_with_config(catalog, &ClassifierConfig::default())
    }

    /// Fit the vectorizer and one binary model per tag
    pub fn fit_with_config(catalog: &IntentCatalog, config: &ClassifierConfig) -> Result<Self> {
        let training = catalog.training_set();

        if training.len() < 2 {
            return Err(ChatbotError::TrainingError(format!(
                "Need at least 2 training patterns, got {}",
                training.len()
            )));
        }

        let classes: Vec<String> = training
            .iter()
            .map(|e| e.tag)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        if classes.len() < 2 {
            return Err(ChatbotError::TrainingError(format!(
                "Need at least 2 distinct intents, got {}",
                classes.len()
            )));
        }

        if config.max_iter == 0 {
            return Err(ChatbotError::TrainingError(
                "Iteration cap must be at least 1".to_string(),
            ));
        }

        if config.c <= 0.0 || !config.c.is_finite() {
            return Err(ChatbotError::TrainingError(format!(
                "Regularisation strength must be positive, got {}",
                config.c
            )));
        }

        let patterns: Vec<&str> = training.iter().map(|e| e.pattern).collect();
        let (min_n, max_n) = config.ngram_range;
        let mut vectorizer = TfIdfVectorizer::new(min_n, max_n);
        vectorizer.fit(&patterns)?;

        let features: Vec<SparseVector> = patterns
            .iter()
            .map(|p| vectorizer.transform(p))
            .collect();

        // Lipschitz bound of the loss gradient; 1/L is the descent step
        let lipschitz = 1.0
            + 0.25
                * config.c
                * features
                    .iter()
                    .map(|x| 1.0 + x.iter().map(|(_, v)| v * v).sum::<f64>())
                    .sum::<f64>();
        let step = 1.0 / lipschitz;

        let models = classes
            .iter()
            .map(|class| {
                let labels: Vec<f64> = training
                    .iter()
                    .map(|e| if e.tag == class { 1.0 } else { -1.0 })
                    .collect();

                let (model, iterations, converged) = train_binary(
                    &features,
                    &labels,
                    vectorizer.vocabulary_size(),
                    step,
                    config,
                );

                if converged {
                    debug!(tag = %class, iterations, "Binary model converged");
                } else {
                    warn!(
                        tag = %class,
                        max_iter = config.max_iter,
                        "Binary model hit the iteration cap before converging"
                    );
                }

                model
            })
            .collect();

        info!(
            samples = training.len(),
            intents = classes.len(),
            vocabulary = vectorizer.vocabulary_size(),
            "Intent classifier fitted"
        );

        Ok(Self {
            vectorizer,
            classes,
            models,
        })
    }

    /// Highest-scoring tag for `text`; ties go to the first tag in sorted order
    pub fn predict(&self, text: &str) -> &str {
        let features = self.vectorizer.transform(text);

        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (idx, model) in self.models.iter().enumerate() {
            let score = model.decision(&features);
            if score > best_score {
                best = idx;
                best_score = score;
            }
        }

        &self.classes[best]
    }

    /// Decision value per tag, in sorted tag order
    pub fn scores(&self, text: &str) -> Vec<(&str, f64)> {
        let features = self.vectorizer.transform(text);
        self.classes
            .iter()
            .zip(&self.models)
            .map(|(class, model)| (class.as_str(), model.decision(&features)))
            .collect()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    pub fn ngram_range(&self) -> (usize, usize) {
        self.vectorizer.ngram_range()
    }
}

/// Accelerated full-batch gradient descent on the L2-regularised logistic loss
/// `0.5 * |w|^2 + C * sum(ln(1 + exp(-y * (w.x + b))))`.
/// The intercept is not penalised. Momentum restarts whenever the gradient
/// points against the last step.
fn train_binary(
    features: &[SparseVector],
    labels: &[f64],
    dimensions: usize,
    step: f64,
    config: &ClassifierConfig,
) -> (BinaryModel, usize, bool) {
    let zero = BinaryModel {
        weights: vec![0.0; dimensions],
        intercept: 0.0,
    };
    let mut current = zero.clone();
    let mut previous = zero.clone();
    let mut lookahead = zero;
    let mut grad_w = vec![0.0; dimensions];
    let mut since_restart = 0usize;

    for iteration in 0..config.max_iter {
        grad_w.copy_from_slice(&lookahead.weights);
        let mut grad_b = 0.0;

        for (x, &y) in features.iter().zip(labels) {
            let margin = y * lookahead.decision(x);
            let g = -config.c * y * sigmoid(-margin);
            for &(idx, value) in x {
                grad_w[idx] += g * value;
            }
            grad_b += g;
        }

        let largest = grad_w
            .iter()
            .fold(grad_b.abs(), |acc, g| acc.max(g.abs()));
        if largest < config.tol {
            return (lookahead, iteration, true);
        }

        std::mem::swap(&mut previous, &mut current);
        for ((w, y), g) in current
            .weights
            .iter_mut()
            .zip(&lookahead.weights)
            .zip(&grad_w)
        {
            *w = y - step * g;
        }
        current.intercept = lookahead.intercept - step * grad_b;

        let against_momentum = grad_w
            .iter()
            .zip(current.weights.iter().zip(&previous.weights))
            .map(|(g, (c, p))| g * (c - p))
            .sum::<f64>()
            + grad_b * (current.intercept - previous.intercept);
        since_restart = if against_momentum > 0.0 { 0 } else { since_restart + 1 };
        let beta = since_restart as f64 / (since_restart as f64 + 3.0);

        for ((l, c), p) in lookahead
            .weights
            .iter_mut()
            .zip(&current.weights)
            .zip(&previous.weights)
        {
            *l = c + beta * (c - p);
        }
        lookahead.intercept = current.intercept + beta * (current.intercept - previous.intercept);
    }

    (lookahead, config.max_iter, false)
}

fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
