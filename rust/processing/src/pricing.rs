// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Price calibration
//!
//! Turns classifications into a budget using a calibration table:
//!
//! ```text
//! base = area * area_rate + volume * volume_rate + base_labor
//! cost = base * complexity_multiplier * (1 + margin_pct / 100)
//! ```
//!
//! Amounts are rounded to cents per line, so the total is an exact sum.

use std::collections::BTreeMap;

use joinery_core::Category;
use serde::{Deserialize, Serialize};

use crate::calibration::{CalibrationTable, Complexity, UnitRates};
use crate::classify::Classification;
use crate::error::{Error, Result};
use crate::money::Money;

/// What the customer asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub material: String,
    pub complexity: Complexity,
    /// Profit margin in percent, at least -100
    pub margin_pct: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            material: "mdf_18mm".into(),
            complexity: Complexity::Medium,
            margin_pct: 25.0,
        }
    }
}

impl BudgetConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.margin_pct.is_finite() || self.margin_pct < -100.0 {
            return Err(Error::InvalidConfig(format!(
                "margin_pct must be finite and at least -100, got {}",
                self.margin_pct
            )));
        }
        Ok(())
    }
}

/// Where a line's cost comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub material: Money,
    pub labor: Money,
    /// Whatever remains after material and labor, so parts sum to the cost
    pub margin: Money,
}

/// Priced component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetLine {
    pub component: usize,
    pub label: String,
    pub category: Category,
    /// Category whose rates were applied
    pub priced_as: Category,
    pub confidence: f64,
    pub low_confidence: bool,
    pub area: f64,
    pub volume: f64,
    pub cost: Money,
    pub breakdown: CostBreakdown,
}

/// Per-category totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: Category,
    pub count: usize,
    pub cost: Money,
    pub area: f64,
}

/// Priced scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    pub lines: Vec<BudgetLine>,
    pub total: Money,
    /// Cost-weighted mean of line confidences
    pub confidence: f64,
    pub total_area: f64,
    /// Total over total area, zero for an empty budget
    pub price_per_area: f64,
    pub by_category: Vec<CategorySummary>,
    pub material: String,
    pub complexity: Complexity,
    pub margin_pct: f64,
}

impl Budget {
    pub fn low_confidence_lines(&self) -> impl Iterator<Item = &BudgetLine> {
        self.lines.iter().filter(|l| l.low_confidence)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PricingEngine;

impl PricingEngine {
    pub fn new() -> Self {
        Self
    }

    /// Check a configuration against a table without pricing anything.
    /// Returns the complexity multiplier.
    pub fn check(&self, table: &CalibrationTable, config: &BudgetConfig) -> Result<f64> {
        config.validate()?;
        // Holds for an empty scene too
        if !table.has_material(&config.material) {
            return Err(Error::UnknownMaterial {
                category: table.default_category(),
                material: config.material.clone(),
            });
        }
        table.multiplier(config.complexity)
    }

    /// Price every classification. Fails before producing any line when a
    /// rate or multiplier is missing.
    pub fn estimate(
        &self,
        table: &CalibrationTable,
        classifications: &[Classification],
        config: &BudgetConfig,
    ) -> Result<Budget> {
        let multiplier = self.check(table, config)?;

        let rates: Vec<(Category, UnitRates)> = classifications
            .iter()
            .map(|c| {
                let priced_as = if c.is_unclassified() {
                    table.default_category()
                } else {
                    c.category
                };
                table
                    .rates(priced_as, &config.material)
                    .map(|r| (priced_as, r))
            })
            .collect::<Result<_>>()?;

        let surcharges = table.surcharges();
        let margin_factor = 1.0 + config.margin_pct / 100.0;

        let lines: Vec<BudgetLine> = classifications
            .iter()
            .zip(rates)
            .map(|(c, (priced_as, rates))| {
                let area = c.features.surface_area;
                let volume = c.features.volume;

                let billed_area = area * (1.0 + surcharges.waste_pct / 100.0);
                let material_base = billed_area * rates.area_rate
                    + area * surcharges.hardware_per_area
                    + volume * rates.volume_rate;
                let labor_base = rates.base_labor;

                let cost =
                    Money::from_units((material_base + labor_base) * multiplier * margin_factor);
                let material = Money::from_units(material_base * multiplier);
                let labor = Money::from_units(labor_base * multiplier);

                BudgetLine {
                    component: c.component,
                    label: c.label.clone(),
                    category: c.category,
                    priced_as,
                    confidence: c.confidence,
                    low_confidence: c.is_unclassified(),
                    area,
                    volume,
                    cost,
                    breakdown: CostBreakdown {
                        material,
                        labor,
                        margin: cost - material - labor,
                    },
                }
            })
            .collect();

        let total: Money = lines.iter().map(|l| l.cost).sum();
        let total_area: f64 = lines.iter().map(|l| l.area).sum();

        let budget = Budget {
            confidence: overall_confidence(&lines, total),
            price_per_area: if total_area > 0.0 {
                total.as_f64() / total_area
            } else {
                0.0
            },
            by_category: summarize(&lines),
            lines,
            total,
            total_area,
            material: config.material.clone(),
            complexity: config.complexity,
            margin_pct: config.margin_pct,
        };

        tracing::info!(
            lines = budget.lines.len(),
            total = %budget.total,
            confidence = budget.confidence,
            material = %budget.material,
            complexity = %budget.complexity,
            "Budget computed"
        );
        Ok(budget)
    }
}

fn overall_confidence(lines: &[BudgetLine], total: Money) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    if total.cents() == 0 {
        return lines.iter().map(|l| l.confidence).sum::<f64>() / lines.len() as f64;
    }
    let weighted: f64 = lines
        .iter()
        .map(|l| l.confidence * l.cost.cents() as f64)
        .sum();
    (weighted / total.cents() as f64).clamp(0.0, 1.0)
}

fn summarize(lines: &[BudgetLine]) -> Vec<CategorySummary> {
    let mut groups: BTreeMap<Category, CategorySummary> = BTreeMap::new();
    for line in lines {
        let entry = groups.entry(line.category).or_insert_with(|| CategorySummary {
            category: line.category,
            count: 0,
            cost: Money::ZERO,
            area: 0.0,
        });
        entry.count += 1;
        entry.cost += line.cost;
        entry.area += line.area;
    }
    groups.into_values().collect()
}
