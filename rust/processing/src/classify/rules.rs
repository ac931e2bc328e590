// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Threshold rules over component dimensions (metres)

use joinery_core::Category;
use joinery_geometry::FeatureVector;
use serde::{Deserialize, Serialize};

/// Which rule fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    NameHint,
    CountertopSlab,
    ShelfSlab,
    DoorLeaf,
    PanelSheet,
    DrawerUnit,
    CabinetCarcass,
}

/// A rule hit and the confidence it carries
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule: RuleKind,
    pub category: Category,
    pub confidence: f64,
}

/// Rule thresholds and base confidences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleThresholds {
    pub name_hint_confidence: f64,

    /// Horizontal slab at least this wide and deep is a countertop
    pub countertop_max_thickness: f64,
    pub countertop_min_width: f64,
    pub countertop_min_depth: f64,
    pub countertop_confidence: f64,

    pub shelf_max_thickness: f64,
    pub shelf_max_depth: f64,
    pub shelf_confidence: f64,

    /// Upright leaf: thin, tall enough, narrow enough
    pub door_max_thickness: f64,
    pub door_min_height: f64,
    pub door_max_width: f64,
    pub door_confidence: f64,

    /// Anything flatter than this is a sheet
    pub panel_max_flatness: f64,
    pub panel_confidence: f64,

    /// Drawer units and cabinets are built from boards; a block with fewer
    /// flat rectangular faces is neither
    pub carcass_min_panels: usize,

    pub drawer_max_height: f64,
    pub drawer_max_width: f64,
    pub drawer_confidence: f64,
    /// Added when the unit touches another component, e.g. its carcass
    pub drawer_adjacency_bonus: f64,

    pub cabinet_min_height: f64,
    pub cabinet_confidence: f64,
}

impl Default for RuleThresholds {
    fn default() -> Self {
        Self {
            name_hint_confidence: 0.7,
            countertop_max_thickness: 0.08,
            countertop_min_width: 0.9,
            countertop_min_depth: 0.4,
            countertop_confidence: 0.8,
            shelf_max_thickness: 0.06,
            shelf_max_depth: 0.6,
            shelf_confidence: 0.85,
            door_max_thickness: 0.05,
            door_min_height: 0.3,
            door_max_width: 0.7,
            door_confidence: 0.8,
            panel_max_flatness: 0.1,
            panel_confidence: 0.7,
            carcass_min_panels: 4,
            drawer_max_height: 0.8,
            drawer_max_width: 0.8,
            drawer_confidence: 0.6,
            drawer_adjacency_bonus: 0.15,
            cabinet_min_height: 0.3,
            cabinet_confidence: 0.6,
        }
    }
}

impl RuleThresholds {
    pub(crate) fn confidences(&self) -> [(&'static str, f64); 8] {
        [
            ("name_hint_confidence", self.name_hint_confidence),
            ("countertop_confidence", self.countertop_confidence),
            ("shelf_confidence", self.shelf_confidence),
            ("door_confidence", self.door_confidence),
            ("panel_confidence", self.panel_confidence),
            ("drawer_confidence", self.drawer_confidence),
            ("drawer_adjacency_bonus", self.drawer_adjacency_bonus),
            ("cabinet_confidence", self.cabinet_confidence),
        ]
    }

    /// First matching rule, in a fixed order
    pub fn evaluate(&self, f: &FeatureVector) -> Option<RuleMatch> {
        let hit = |rule, category, confidence| {
            Some(RuleMatch {
                rule,
                category,
                confidence,
            })
        };

        if let Some(category) = f.name_hint {
            return hit(RuleKind::NameHint, category, self.name_hint_confidence);
        }
        if f.volume <= 0.0 {
            return None;
        }

        if f.height <= self.countertop_max_thickness
            && f.width >= self.countertop_min_width
            && f.depth >= self.countertop_min_depth
        {
            return hit(
                RuleKind::CountertopSlab,
                Category::Countertop,
                self.countertop_confidence,
            );
        }
        if f.height <= self.shelf_max_thickness && f.depth <= self.shelf_max_depth {
            return hit(RuleKind::ShelfSlab, Category::Shelf, self.shelf_confidence);
        }
        if f.depth <= self.door_max_thickness
            && f.height >= self.door_min_height
            && f.width <= self.door_max_width
        {
            return hit(RuleKind::DoorLeaf, Category::Door, self.door_confidence);
        }
        if f.flatness <= self.panel_max_flatness {
            return hit(RuleKind::PanelSheet, Category::Panel, self.panel_confidence);
        }
        if f.panel_count < self.carcass_min_panels {
            return None;
        }
        if f.height <= self.drawer_max_height && f.width <= self.drawer_max_width {
            let bonus = if f.adjacency_count > 0 {
                self.drawer_adjacency_bonus
            } else {
                0.0
            };
            return hit(
                RuleKind::DrawerUnit,
                Category::DrawerUnit,
                (self.drawer_confidence + bonus).min(1.0),
            );
        }
        if f.height >= self.cabinet_min_height {
            return hit(
                RuleKind::CabinetCarcass,
                Category::Cabinet,
                self.cabinet_confidence,
            );
        }

        None
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use joinery_geometry::FeatureVector;

    /// Features of a solid box
    pub fn features(width: f64, height: f64, depth: f64) -> FeatureVector {
        let mut dims = [width, height, depth];
        dims.sort_by(f64::total_cmp);
        let volume = width * height * depth;
        let surface_area = 2.0 * (width * height + width * depth + height * depth);
        FeatureVector {
            width,
            height,
            depth,
            volume_to_surface: volume / surface_area,
            panel_count: 6,
            adjacency_count: 0,
            volume,
            surface_area,
            flatness: dims[0] / dims[2],
            elongation: dims[1] / dims[2],
            fill_ratio: 1.0,
            name_hint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::features;
    use super::*;

    fn category(width: f64, height: f64, depth: f64) -> Option<Category> {
        RuleThresholds::default()
            .evaluate(&features(width, height, depth))
            .map(|m| m.category)
    }

    #[test]
    fn test_slabs() {
        assert_eq!(category(2.4, 0.03, 0.6), Some(Category::Countertop));
        assert_eq!(category(0.8, 0.018, 0.3), Some(Category::Shelf));
    }

    #[test]
    fn test_uprights() {
        assert_eq!(category(0.45, 0.7, 0.018), Some(Category::Door));
        assert_eq!(category(2.2, 2.4, 0.018), Some(Category::Panel));
    }

    #[test]
    fn test_boxes() {
        assert_eq!(category(0.5, 0.5, 0.5), Some(Category::DrawerUnit));
        assert_eq!(category(1.2, 2.1, 0.6), Some(Category::Cabinet));
        assert_eq!(category(1.5, 0.2, 0.5), None);
    }

    #[test]
    fn test_carcass_needs_panels() {
        let mut f = features(1.2, 2.1, 0.6);
        f.panel_count = 2;
        assert_eq!(RuleThresholds::default().evaluate(&f), None);

        let mut f = features(0.6, 0.25, 0.5);
        f.panel_count = 0;
        assert_eq!(RuleThresholds::default().evaluate(&f), None);
    }

    #[test]
    fn test_adjacent_drawer_is_more_confident() {
        let rules = RuleThresholds::default();
        let mut f = features(0.6, 0.25, 0.5);
        let alone = rules.evaluate(&f).unwrap();
        f.adjacency_count = 2;
        let docked = rules.evaluate(&f).unwrap();

        assert_eq!(alone.category, Category::DrawerUnit);
        assert_eq!(docked.category, Category::DrawerUnit);
        assert!((alone.confidence - 0.6).abs() < 1e-12);
        assert!((docked.confidence - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_name_hint_wins() {
        let mut f = features(2.4, 0.03, 0.6);
        f.name_hint = Some(Category::Shelf);
        let hit = RuleThresholds::default().evaluate(&f).unwrap();
        assert_eq!(hit.rule, RuleKind::NameHint);
        assert_eq!(hit.category, Category::Shelf);
        assert_eq!(hit.confidence, 0.7);
    }
}
