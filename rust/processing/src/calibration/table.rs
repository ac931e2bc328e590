// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reference cost data
//!
//! A table maps (category, material) to unit rates and complexity levels to
//! multipliers. Tables are plain data: loaded once from JSON, validated, and
//! never mutated afterwards.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use joinery_core::Category;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Build complexity, priced as a multiplier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Complexity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Complexity::Low),
            "medium" => Ok(Complexity::Medium),
            "high" => Ok(Complexity::High),
            _ => Err(Error::UnknownComplexity {
                complexity: s.to_string(),
            }),
        }
    }
}

/// Per-unit prices for one (category, material) pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitRates {
    /// Price per unit of surface area
    pub area_rate: f64,
    /// Price per unit of enclosed volume
    pub volume_rate: f64,
    /// Fixed labor per component
    pub base_labor: f64,
}

/// Optional table-wide adjustments, zero unless set
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Surcharges {
    /// Offcut allowance added to the billed area, in percent
    pub waste_pct: f64,
    /// Fittings (hinges, slides, handles) per unit of surface area
    pub hardware_per_area: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RateRow {
    category: Category,
    material: String,
    #[serde(flatten)]
    rates: UnitRates,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TableDocument {
    default_category: Category,
    complexity: BTreeMap<Complexity, f64>,
    rates: Vec<RateRow>,
    #[serde(default)]
    surcharges: Surcharges,
}

/// Validated calibration data
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationTable {
    default_category: Category,
    complexity: BTreeMap<Complexity, f64>,
    rates: FxHashMap<(Category, String), UnitRates>,
    surcharges: Surcharges,
}

fn check_rate(value: f64, what: &str, context: &dyn fmt::Display) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidCalibration(format!(
            "{} for {} must be a finite non-negative number, got {}",
            what, context, value
        )))
    }
}

impl CalibrationTable {
    /// Parse and validate a JSON table
    pub fn from_json(json: &str) -> Result<Self> {
        let document: TableDocument = serde_json::from_str(json)
            .map_err(|e| Error::InvalidCalibration(e.to_string()))?;
        Self::from_document(document)
    }

    fn from_document(document: TableDocument) -> Result<Self> {
        if document.default_category.is_unclassified() {
            return Err(Error::InvalidCalibration(
                "default_category must be a furniture category".into(),
            ));
        }
        for (level, multiplier) in &document.complexity {
            check_rate(*multiplier, "multiplier", level)?;
        }
        check_rate(document.surcharges.waste_pct, "waste_pct", &"surcharges")?;
        check_rate(
            document.surcharges.hardware_per_area,
            "hardware_per_area",
            &"surcharges",
        )?;

        let mut rates = FxHashMap::default();
        for row in document.rates {
            let material = row.material.trim().to_string();
            if material.is_empty() {
                return Err(Error::InvalidCalibration(format!(
                    "empty material name for {}",
                    row.category
                )));
            }
            let context = format!("{}/{}", row.category, material);
            check_rate(row.rates.area_rate, "area_rate", &context)?;
            check_rate(row.rates.volume_rate, "volume_rate", &context)?;
            check_rate(row.rates.base_labor, "base_labor", &context)?;
            if rates.insert((row.category, material), row.rates).is_some() {
                return Err(Error::InvalidCalibration(format!("duplicate rates for {}", context)));
            }
        }

        Ok(Self {
            default_category: document.default_category,
            complexity: document.complexity,
            rates,
            surcharges: document.surcharges,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        let mut rows: Vec<RateRow> = self
            .rates
            .iter()
            .map(|((category, material), rates)| RateRow {
                category: *category,
                material: material.clone(),
                rates: *rates,
            })
            .collect();
        rows.sort_by(|a, b| (a.category, &a.material).cmp(&(b.category, &b.material)));

        let document = TableDocument {
            default_category: self.default_category,
            complexity: self.complexity.clone(),
            rates: rows,
            surcharges: self.surcharges,
        };
        serde_json::to_string_pretty(&document)
            .map_err(|e| Error::InvalidCalibration(e.to_string()))
    }

    /// Category whose rates price unclassified components
    pub fn default_category(&self) -> Category {
        self.default_category
    }

    pub fn surcharges(&self) -> Surcharges {
        self.surcharges
    }

    /// Rates for a (category, material) pair
    pub fn rates(&self, category: Category, material: &str) -> Result<UnitRates> {
        self.rates
            .get(&(category, material.to_string()))
            .copied()
            .ok_or_else(|| Error::UnknownMaterial {
                category,
                material: material.to_string(),
            })
    }

    pub fn multiplier(&self, complexity: Complexity) -> Result<f64> {
        self.complexity
            .get(&complexity)
            .copied()
            .ok_or_else(|| Error::UnknownComplexity {
                complexity: complexity.to_string(),
            })
    }

    /// Materials with at least one rate row, sorted
    /// Whether any category has rates for `material`
    pub fn has_material(&self, material: &str) -> bool {
        self.rates.keys().any(|(_, m)| m == material)
    }

    pub fn materials(&self) -> Vec<&str> {
        let mut materials: Vec<&str> = self.rates.keys().map(|(_, m)| m.as_str()).collect();
        materials.sort_unstable();
        materials.dedup();
        materials
    }

    /// Factory-derived reference prices per square metre and cubic metre.
    ///
    /// Area rates scale a per-material sheet price by a per-category
    /// factor; `mdf` is an alias of `mdf_18mm`.
    pub fn reference() -> Self {
        const MATERIALS: [(&str, f64); 7] = [
            ("mdf", 350.0),
            ("mdf_15mm", 320.0),
            ("mdf_18mm", 350.0),
            ("plywood_15mm", 280.0),
            ("plywood_18mm", 310.0),
            ("melamine_15mm", 380.0),
            ("melamine_18mm", 410.0),
        ];
        // (category, area factor, volume rate, labor)
        const CATEGORIES: [(Category, f64, f64, f64); 6] = [
            (Category::Cabinet, 1.0, 900.0, 120.0),
            (Category::DrawerUnit, 1.7, 1200.0, 160.0),
            (Category::Shelf, 0.8, 400.0, 30.0),
            (Category::Door, 1.2, 600.0, 60.0),
            (Category::Panel, 1.0, 500.0, 40.0),
            (Category::Countertop, 1.4, 800.0, 90.0),
        ];

        let mut rates = FxHashMap::default();
        for (material, sheet_price) in MATERIALS {
            for (category, factor, volume_rate, base_labor) in CATEGORIES {
                rates.insert(
                    (category, material.to_string()),
                    UnitRates {
                        area_rate: sheet_price * factor,
                        volume_rate,
                        base_labor,
                    },
                );
            }
        }

        Self {
            default_category: Category::Cabinet,
            complexity: BTreeMap::from([
                (Complexity::Low, 1.0),
                (Complexity::Medium, 1.2),
                (Complexity::High, 1.4),
            ]),
            rates,
            surcharges: Surcharges::default(),
        }
    }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self::reference()
    }
}
