// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene statistics
//!
//! Counts per category and the spread of confidences, computed once per
//! analysis for reports.

use std::collections::BTreeMap;

use joinery_core::Category;
use serde::{Deserialize, Serialize};

use crate::classify::Classification;

/// Summary of a classified scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneStats {
    pub component_count: usize,
    pub by_category: BTreeMap<Category, usize>,
    pub mean_confidence: f64,
    pub min_confidence: f64,
    pub max_confidence: f64,
    /// Ties go to the category listed first
    pub most_common: Option<Category>,
}

impl SceneStats {
    pub fn from_classifications(classifications: &[Classification]) -> Self {
        if classifications.is_empty() {
            return Self::default();
        }

        let mut by_category: BTreeMap<Category, usize> = BTreeMap::new();
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for c in classifications {
            *by_category.entry(c.category).or_insert(0) += 1;
            min = min.min(c.confidence);
            max = max.max(c.confidence);
            sum += c.confidence;
        }

        let mut most_common = None;
        let mut best = 0;
        for (category, count) in &by_category {
            if *count > best {
                best = *count;
                most_common = Some(*category);
            }
        }

        Self {
            component_count: classifications.len(),
            by_category,
            mean_confidence: sum / classifications.len() as f64,
            min_confidence: min,
            max_confidence: max,
            most_common,
        }
    }
}
