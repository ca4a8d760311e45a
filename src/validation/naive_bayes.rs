//! Naive Bayes plausibility score for a single hazard report.
//!
//! Features are the hazard type and a bucketed description length, assumed
//! independent given the label.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::dataset::TrainingSource;
use crate::types::{BayesExample, HazardReport};

/// Score returned when the model has nothing to say.
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

/// Additive (Laplace) smoothing applied to every feature count.
const SMOOTHING: f64 = 0.5;
/// Added to the class total in the likelihood denominator.
const SMOOTHING_DENOMINATOR: f64 = 2.0;

const SHORT_DESCRIPTION: usize = 20;
const LONG_DESCRIPTION: usize = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptionBucket {
    Short,
    Medium,
    Long,
}

impl DescriptionBucket {
    pub fn from_len(length: usize) -> Self {
        if length < SHORT_DESCRIPTION {
            DescriptionBucket::Short
        } else if length < LONG_DESCRIPTION {
            DescriptionBucket::Medium
        } else {
            DescriptionBucket::Long
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ReportFeatures<'a> {
    pub hazard_type: &'a str,
    pub description_length: usize,
}

impl<'a> ReportFeatures<'a> {
    pub fn new(hazard_type: &'a str, description: &str) -> Self {
        Self {
            hazard_type,
            description_length: description.chars().count(),
        }
    }

    pub fn of_report(report: &'a HazardReport) -> Self {
        Self::new(&report.hazard_type, &report.description)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ClassCounts {
    total: usize,
    hazard_types: HashMap<String, usize>,
    buckets: HashMap<DescriptionBucket, usize>,
}

impl ClassCounts {
    fn add(&mut self, example: &BayesExample) {
        self.total += 1;
        *self
            .hazard_types
            .entry(example.hazard_type.clone())
            .or_default() += 1;
        *self
            .buckets
            .entry(DescriptionBucket::from_len(example.description_length))
            .or_default() += 1;
    }

    fn likelihood(&self, count: usize) -> f64 {
        (count as f64 + SMOOTHING) / (self.total as f64 + SMOOTHING_DENOMINATOR)
    }

    fn joint_likelihood(&self, features: &ReportFeatures<'_>) -> f64 {
        let ht = self.hazard_types.get(features.hazard_type).copied().unwrap_or(0);
        let bucket = DescriptionBucket::from_len(features.description_length);
        let b = self.buckets.get(&bucket).copied().unwrap_or(0);
        self.likelihood(ht) * self.likelihood(b)
    }
}

/// Trained classifier. Immutable once built, so it can be shared freely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BayesModel {
    prior_valid: f64,
    prior_invalid: f64,
    valid: ClassCounts,
    invalid: ClassCounts,
}

impl BayesModel {
    /// `None` when there are no examples.
    pub fn train(examples: &[BayesExample]) -> Option<Self> {
        if examples.is_empty() {
            return None;
        }

        let mut valid = ClassCounts::default();
        let mut invalid = ClassCounts::default();
        for example in examples {
            if example.is_valid {
                valid.add(example);
            } else {
                invalid.add(example);
            }
        }

        let prior_valid = valid.total as f64 / examples.len() as f64;
        Some(Self {
            prior_valid,
            prior_invalid: 1.0 - prior_valid,
            valid,
            invalid,
        })
    }

    pub fn prior_valid(&self) -> f64 {
        self.prior_valid
    }

    pub fn prior_invalid(&self) -> f64 {
        self.prior_invalid
    }

    /// P(valid | features), in [0, 1].
    pub fn score(&self, features: &ReportFeatures<'_>) -> f64 {
        let post_valid = self.prior_valid * self.valid.joint_likelihood(features);
        let post_invalid = self.prior_invalid * self.invalid.joint_likelihood(features);
        let total = post_valid + post_invalid;
        if total > 0.0 {
            post_valid / total
        } else {
            NEUTRAL_PROBABILITY
        }
    }
}

/// Report validator that trains itself from its [`TrainingSource`] the first
/// time it is asked to score without a model.
///
/// Training takes `&mut self`; share one validator across threads behind a
/// lock, or hand out the [`BayesModel`] snapshot from [`model`](Self::model).
#[derive(Default)]
pub struct ReportValidator {
    model: Option<Arc<BayesModel>>,
    source: Option<Arc<dyn TrainingSource>>,
    source_attempted: bool,
}

impl ReportValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(source: Arc<dyn TrainingSource>) -> Self {
        Self {
            model: None,
            source: Some(source),
            source_attempted: false,
        }
    }

    /// Replace the model. Returns whether a model was produced.
    pub fn train(&mut self, examples: &[BayesExample]) -> bool {
        self.model = BayesModel::train(examples).map(Arc::new);
        if let Some(model) = &self.model {
            debug!(
                examples = examples.len(),
                prior_valid = model.prior_valid,
                "Report validator trained"
            );
        }
        self.model.is_some()
    }

    /// Load examples from the default source and train on them.
    pub fn train_from_source(&mut self) -> bool {
        self.source_attempted = true;
        let Some(source) = self.source.clone() else {
            return false;
        };
        match source.bayes_examples() {
            Ok(examples) => {
                let trained = self.train(&examples);
                if !trained {
                    info!("No report training data available; scoring stays neutral");
                }
                trained
            }
            Err(err) => {
                warn!(error = %err, "Report training data unavailable");
                false
            }
        }
    }

    /// Train from the default source once if no model exists yet.
    pub fn ensure_trained(&mut self) {
        if self.model.is_none() && !self.source_attempted {
            self.train_from_source();
        }
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<Arc<BayesModel>> {
        self.model.clone()
    }

    pub fn validate_report(&mut self, features: &ReportFeatures<'_>) -> f64 {
        self.ensure_trained();
        self.score(features)
    }

    /// Score with the current model, without training.
    pub fn score(&self, features: &ReportFeatures<'_>) -> f64 {
        self.model
            .as_ref()
            .map_or(NEUTRAL_PROBABILITY, |model| model.score(features))
    }
}
