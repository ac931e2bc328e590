// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Furniture classification
//!
//! A rule stage proposes a label from dimensional thresholds; a statistical
//! stage scores every category. The model only overrides a rule when it is
//! clearly more confident, and anything below the acceptance threshold ends
//! up unclassified.

mod model;
mod rules;

pub use model::{FeatureStat, FeatureWeight, ModelMatch, ModelParams, Prototype};
pub use rules::{RuleKind, RuleMatch, RuleThresholds};

#[cfg(test)]
pub(crate) use rules::fixtures;

use joinery_core::Category;
use joinery_geometry::{Component, FeatureVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Classifier thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Below this, a component is unclassified
    pub min_confidence: f64,
    /// Lead the model needs over a rule to replace its label
    pub override_margin: f64,
    pub rules: RuleThresholds,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
            override_margin: 0.15,
            rules: RuleThresholds::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, value: f64| {
            if (0.0..=1.0).contains(&value) {
                Ok(())
            } else {
                Err(Error::InvalidConfig(format!(
                    "{} must be within [0, 1], got {}",
                    name, value
                )))
            }
        };
        unit("min_confidence", self.min_confidence)?;
        unit("override_margin", self.override_margin)?;
        for (name, value) in self.rules.confidences() {
            unit(name, value)?;
        }
        Ok(())
    }
}

/// How a label was reached
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Decision {
    Rule(RuleMatch),
    Model(ModelMatch),
    Unclassified { best_score: f64 },
}

/// Category assignment for one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Component id within its segmentation
    pub component: usize,
    pub label: String,
    pub category: Category,
    /// In [0, 1]
    pub confidence: f64,
    pub features: FeatureVector,
    pub decision: Decision,
}

impl Classification {
    /// Tie this result to a component
    pub fn for_component(mut self, component: &Component) -> Self {
        self.component = component.id;
        self.label = component.label();
        self
    }

    #[inline]
    pub fn is_unclassified(&self) -> bool {
        self.category.is_unclassified()
    }
}

/// Two-stage classifier
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
    model: ModelParams,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            config: ClassifierConfig::default(),
            model: ModelParams::default(),
        }
    }
}

impl Classifier {
    pub fn new(config: ClassifierConfig, model: ModelParams) -> Result<Self> {
        config.validate()?;
        model.validate()?;
        Ok(Self { config, model })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn model(&self) -> &ModelParams {
        &self.model
    }

    /// Classify one feature vector. The result is not yet tied to a
    /// component (id 0, empty label); see [`Classification::for_component`].
    pub fn classify(&self, features: &FeatureVector) -> Classification {
        let rule = self.config.rules.evaluate(features);
        let model = self.model.predict(features);
        let min = self.config.min_confidence;

        let proposed = match rule {
            Some(r) if model.confidence <= r.confidence + self.config.override_margin => {
                Some((r.category, r.confidence, Decision::Rule(r)))
            }
            _ if model.confidence >= min => {
                Some((model.category, model.confidence, Decision::Model(model)))
            }
            _ => None,
        };

        let (category, confidence, decision) = match proposed {
            Some(hit) if hit.1 >= min => hit,
            // A rule below the bar can still be rescued by a model above it
            Some(_) if model.confidence >= min => {
                (model.category, model.confidence, Decision::Model(model))
            }
            _ => {
                let best_score = rule
                    .map_or(model.confidence, |r| r.confidence.max(model.confidence));
                (
                    Category::Unclassified,
                    best_score,
                    Decision::Unclassified { best_score },
                )
            }
        };

        Classification {
            component: 0,
            label: String::new(),
            category,
            confidence,
            features: features.clone(),
            decision,
        }
    }

    /// Classify every component in parallel, preserving order
    pub fn classify_all(
        &self,
        components: &[Component],
        features: &[FeatureVector],
    ) -> Vec<Classification> {
        let start = std::time::Instant::now();
        let results: Vec<Classification> = components
            .par_iter()
            .zip(features.par_iter())
            .map(|(component, f)| self.classify(f).for_component(component))
            .collect();

        let unclassified = results.iter().filter(|c| c.is_unclassified()).count();
        tracing::info!(
            components = results.len(),
            unclassified = unclassified,
            classify_time_ms = start.elapsed().as_millis(),
            "Classification complete"
        );
        results
    }
}
