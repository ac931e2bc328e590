// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Joinery-Lite Processing
//!
//! Classification, price calibration and the end-to-end pipeline that turns
//! a furniture scene into a budget.
//!
//! ```rust,ignore
//! use joinery_processing::{BudgetConfig, CalibrationStore, Pipeline};
//! use joinery_core::MeshFormat;
//!
//! let store = CalibrationStore::default();
//! let result = Pipeline::default().run(bytes, MeshFormat::Obj, &store, &BudgetConfig::default())?;
//! println!("{} components, total {}", result.budget.lines.len(), result.budget.total);
//! ```

pub mod calibration;
pub mod classify;
pub mod error;
pub mod money;
pub mod pipeline;
pub mod pricing;
pub mod stats;

pub use calibration::{CalibrationStore, CalibrationTable, Complexity, Surcharges, UnitRates};
pub use classify::{
    Classification, Classifier, ClassifierConfig, Decision, ModelMatch, ModelParams, RuleKind,
    RuleMatch, RuleThresholds,
};
pub use error::{Error, Result};
pub use money::Money;
pub use pipeline::{Pipeline, PipelineConfig, PipelineResult, SceneAnalysis};
pub use pricing::{Budget, BudgetConfig, BudgetLine, CategorySummary, CostBreakdown, PricingEngine};
pub use stats::SceneStats;
