// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Prototype score model
//!
//! Each category is a diagonal Gaussian prototype over a few features. Its
//! score is a bias minus half the squared standardized distance, plus
//! optional linear evidence terms (a drawer touching its carcass). A
//! background logit stands for "none of these", and a tempered softmax over
//! all scores gives calibrated probabilities.

use joinery_core::Category;
use joinery_geometry::{Feature, FeatureVector};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// One feature's expected value and spread for a category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureStat {
    pub feature: Feature,
    pub mean: f64,
    pub std: f64,
}

/// Linear evidence: `weight * min(value, cap)` is added to the score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature: Feature,
    pub weight: f64,
    #[serde(default = "uncapped")]
    pub cap: f64,
}

fn uncapped() -> f64 {
    f64::INFINITY
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prototype {
    pub category: Category,
    /// Log-prior added to the score
    #[serde(default)]
    pub bias: f64,
    pub features: Vec<FeatureStat>,
    #[serde(default)]
    pub weights: Vec<FeatureWeight>,
}

/// Statistical stage parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Softmax temperature; larger flattens probabilities
    pub temperature: f64,
    /// Score of the reject class
    pub background_logit: f64,
    pub prototypes: Vec<Prototype>,
}

/// Best category and its probability
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMatch {
    pub category: Category,
    pub confidence: f64,
}

fn stat(feature: Feature, mean: f64, std: f64) -> FeatureStat {
    FeatureStat { feature, mean, std }
}

fn prototype(category: Category, stats: [(f64, f64); 4]) -> Prototype {
    let [height, width, depth, flatness] = stats;
    Prototype {
        category,
        bias: 0.0,
        features: vec![
            stat(Feature::Height, height.0, height.1),
            stat(Feature::Width, width.0, width.1),
            stat(Feature::Depth, depth.0, depth.1),
            stat(Feature::Flatness, flatness.0, flatness.1),
        ],
        weights: Vec::new(),
    }
}

impl Prototype {
    fn with_stat(mut self, feature: Feature, mean: f64, std: f64) -> Self {
        self.features.push(stat(feature, mean, std));
        self
    }

    fn with_weight(mut self, feature: Feature, weight: f64, cap: f64) -> Self {
        self.weights.push(FeatureWeight {
            feature,
            weight,
            cap,
        });
        self
    }
}

impl Default for ModelParams {
    /// Typical joinery dimensions in metres: (mean, std) for height, width,
    /// depth and flatness. Boxed units also expect board-built, filled
    /// shapes; sheets expect a thin volume-to-surface ratio.
    fn default() -> Self {
        Self {
            temperature: 1.0,
            background_logit: -3.0,
            prototypes: vec![
                prototype(
                    Category::Cabinet,
                    [(1.8, 0.6), (0.9, 0.4), (0.5, 0.15), (0.35, 0.2)],
                )
                .with_stat(Feature::PanelCount, 8.0, 6.0)
                .with_stat(Feature::FillRatio, 1.0, 0.3),
                prototype(
                    Category::DrawerUnit,
                    [(0.6, 0.2), (0.55, 0.2), (0.5, 0.12), (0.8, 0.25)],
                )
                .with_stat(Feature::PanelCount, 6.0, 4.0)
                .with_stat(Feature::FillRatio, 1.0, 0.3)
                .with_weight(Feature::AdjacencyCount, 0.3, 3.0),
                prototype(
                    Category::Shelf,
                    [(0.02, 0.015), (0.8, 0.4), (0.3, 0.12), (0.03, 0.03)],
                ),
                prototype(
                    Category::Door,
                    [(0.75, 0.35), (0.45, 0.15), (0.019, 0.01), (0.03, 0.03)],
                ),
                prototype(
                    Category::Panel,
                    [(2.0, 0.6), (1.2, 0.6), (0.018, 0.01), (0.01, 0.01)],
                )
                .with_stat(Feature::VolumeToSurface, 0.009, 0.005),
                prototype(
                    Category::Countertop,
                    [(0.03, 0.01), (2.0, 0.8), (0.6, 0.1), (0.02, 0.02)],
                ),
            ],
        }
    }
}

impl ModelParams {
    pub fn from_json(json: &str) -> Result<Self> {
        let params: ModelParams =
            serde_json::from_str(json).map_err(|e| Error::InvalidModel(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(Error::InvalidModel(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        if !self.background_logit.is_finite() {
            return Err(Error::InvalidModel("background_logit must be finite".into()));
        }
        if self.prototypes.is_empty() {
            return Err(Error::InvalidModel("no prototypes".into()));
        }

        let mut seen: Vec<Category> = Vec::with_capacity(self.prototypes.len());
        for p in &self.prototypes {
            if p.category.is_unclassified() {
                return Err(Error::InvalidModel(
                    "unclassified cannot have a prototype".into(),
                ));
            }
            if seen.contains(&p.category) {
                return Err(Error::InvalidModel(format!(
                    "duplicate prototype for {}",
                    p.category
                )));
            }
            seen.push(p.category);

            if p.features.is_empty() {
                return Err(Error::InvalidModel(format!(
                    "{} prototype has no features",
                    p.category
                )));
            }
            if !p.bias.is_finite() {
                return Err(Error::InvalidModel(format!(
                    "{} bias must be finite",
                    p.category
                )));
            }
            for w in &p.weights {
                if !w.weight.is_finite() || w.cap.is_nan() {
                    return Err(Error::InvalidModel(format!(
                        "{} {}: weight must be finite",
                        p.category, w.feature
                    )));
                }
            }
            for s in &p.features {
                if !s.mean.is_finite() || !(s.std.is_finite() && s.std > 0.0) {
                    return Err(Error::InvalidModel(format!(
                        "{} {}: mean must be finite and std positive",
                        p.category, s.feature
                    )));
                }
            }
        }
        Ok(())
    }

    fn score(prototype: &Prototype, features: &FeatureVector) -> f64 {
        let distance: f64 = prototype
            .features
            .iter()
            .map(|s| {
                let z = (features.get(s.feature) - s.mean) / s.std;
                z * z
            })
            .sum();
        let evidence: f64 = prototype
            .weights
            .iter()
            .map(|w| w.weight * features.get(w.feature).min(w.cap))
            .sum();
        prototype.bias - 0.5 * distance + evidence
    }

    /// Most probable category. Ties go to the earlier prototype.
    pub fn predict(&self, features: &FeatureVector) -> ModelMatch {
        let logits: Vec<f64> = self
            .prototypes
            .iter()
            .map(|p| Self::score(p, features) / self.temperature)
            .collect();
        let background = self.background_logit / self.temperature;

        let max = logits
            .iter()
            .copied()
            .filter(|l| l.is_finite())
            .fold(background, f64::max);
        let exp: Vec<f64> = logits
            .iter()
            .map(|l| if l.is_finite() { (l - max).exp() } else { 0.0 })
            .collect();
        let total = exp.iter().sum::<f64>() + (background - max).exp();

        let mut best = 0;
        for (i, e) in exp.iter().enumerate() {
            if *e > exp[best] {
                best = i;
            }
        }

        ModelMatch {
            category: self.prototypes[best].category,
            confidence: (exp[best] / total).clamp(0.0, 1.0),
        }
    }
}
