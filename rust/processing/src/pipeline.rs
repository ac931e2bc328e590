// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! End-to-end: mesh bytes to a priced budget
//!
//! Loader, segmenter, feature extractor and classifier run in
//! [`Pipeline::analyze`]; pricing is separate so one analysis can be priced
//! under several configurations.

use std::sync::Arc;

use joinery_core::{Category, GeometryWarning, LoadOptions, Mesh, MeshFormat, MeshLoader};
use joinery_geometry::{Component, FeatureConfig, FeatureExtractor, SegmentConfig, Segmenter};
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationStore, CalibrationTable};
use crate::classify::{Classification, Classifier, ClassifierConfig, ModelParams};
use crate::error::Result;
use crate::pricing::{Budget, BudgetConfig, PricingEngine};
use crate::stats::SceneStats;

/// Every stage's settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub load: LoadOptions,
    pub segment: SegmentConfig,
    pub features: FeatureConfig,
    pub classifier: ClassifierConfig,
}

/// A loaded, segmented and classified scene
#[derive(Debug, Clone)]
pub struct SceneAnalysis {
    pub mesh: Arc<Mesh>,
    pub format: MeshFormat,
    pub components: Vec<Component>,
    /// One per component, same order
    pub classifications: Vec<Classification>,
    /// Load, segmentation and low-confidence warnings, in that order
    pub warnings: Vec<GeometryWarning>,
    pub stats: SceneStats,
}

#[derive(Debug, Clone)]
pub struct PipelineResult {
    pub analysis: SceneAnalysis,
    pub budget: Budget,
}

pub struct Pipeline {
    loader: MeshLoader,
    load_options: LoadOptions,
    segmenter: Segmenter,
    feature_config: FeatureConfig,
    classifier: Classifier,
    pricing: PricingEngine,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            loader: MeshLoader::new(),
            load_options: LoadOptions::default(),
            segmenter: Segmenter::default(),
            feature_config: FeatureConfig::default(),
            classifier: Classifier::default(),
            pricing: PricingEngine::new(),
        }
    }
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        Self::with_model(config, ModelParams::default())
    }

    pub fn with_model(config: PipelineConfig, model: ModelParams) -> Result<Self> {
        Ok(Self {
            loader: MeshLoader::new(),
            load_options: config.load,
            segmenter: Segmenter::new(config.segment),
            feature_config: config.features,
            classifier: Classifier::new(config.classifier, model)?,
            pricing: PricingEngine::new(),
        })
    }

    /// Use a custom loader, e.g. with an extra parser registered
    pub fn with_loader(mut self, loader: MeshLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Load, segment, extract features and classify
    pub fn analyze(&self, bytes: &[u8], format: MeshFormat) -> Result<SceneAnalysis> {
        let start = std::time::Instant::now();

        let loaded = self.loader.load(bytes, format, &self.load_options)?;
        let mesh = Arc::new(loaded.mesh);
        let mut warnings = loaded.warnings;

        let segmentation = self.segmenter.segment(&mesh);
        warnings.extend(segmentation.warnings);
        let components = segmentation.components;

        let extractor = FeatureExtractor::new(self.feature_config.clone(), &components);
        let features = extractor.extract_all(&components);
        let classifications = self.classifier.classify_all(&components, &features);

        warnings.extend(
            classifications
                .iter()
                .filter(|c| c.is_unclassified())
                .map(|c| GeometryWarning::LowConfidence {
                    component: c.component,
                    category: c.category,
                    confidence: c.confidence,
                }),
        );

        let stats = SceneStats::from_classifications(&classifications);
        tracing::info!(
            format = %loaded.format,
            components = components.len(),
            unclassified = stats
                .by_category
                .get(&Category::Unclassified)
                .copied()
                .unwrap_or(0),
            warnings = warnings.len(),
            total_time_ms = start.elapsed().as_millis(),
            "Scene analyzed"
        );

        Ok(SceneAnalysis {
            mesh,
            format: loaded.format,
            components,
            classifications,
            warnings,
            stats,
        })
    }

    /// [`Pipeline::analyze`] with a textual format tag (`obj`, `dae`, ...)
    pub fn analyze_tagged(&self, bytes: &[u8], tag: &str) -> Result<SceneAnalysis> {
        let format: MeshFormat = tag.parse()?;
        self.analyze(bytes, format)
    }

    /// Price an analysis against an explicit table
    pub fn estimate(
        &self,
        analysis: &SceneAnalysis,
        table: &CalibrationTable,
        config: &BudgetConfig,
    ) -> Result<Budget> {
        self.pricing.estimate(table, &analysis.classifications, config)
    }

    /// Analyze and price. The store is read once, up front.
    pub fn run(
        &self,
        bytes: &[u8],
        format: MeshFormat,
        store: &CalibrationStore,
        config: &BudgetConfig,
    ) -> Result<PipelineResult> {
        let table = store.snapshot();
        // Reject bad pricing input before any geometry work
        self.pricing.check(&table, config)?;

        let analysis = self.analyze(bytes, format)?;
        let budget = self.estimate(&analysis, &table, config)?;
        Ok(PipelineResult { analysis, budget })
    }
}
