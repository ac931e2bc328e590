// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Furniture category vocabulary and group-name keyword hints

use std::fmt;
use std::str::FromStr;

/// Closed set of furniture categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "kebab-case"))]
pub enum Category {
    Cabinet,
    DrawerUnit,
    Shelf,
    Door,
    Panel,
    Countertop,
    Unclassified,
}

impl Category {
    /// Every category a component can actually be priced as
    pub const FURNITURE: [Category; 6] = [
        Category::Cabinet,
        Category::DrawerUnit,
        Category::Shelf,
        Category::Door,
        Category::Panel,
        Category::Countertop,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Cabinet => "cabinet",
            Category::DrawerUnit => "drawer-unit",
            Category::Shelf => "shelf",
            Category::Door => "door",
            Category::Panel => "panel",
            Category::Countertop => "countertop",
            Category::Unclassified => "unclassified",
        }
    }

    #[inline]
    pub fn is_unclassified(&self) -> bool {
        matches!(self, Category::Unclassified)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "cabinet" => Ok(Category::Cabinet),
            "drawer-unit" => Ok(Category::DrawerUnit),
            "shelf" => Ok(Category::Shelf),
            "door" => Ok(Category::Door),
            "panel" => Ok(Category::Panel),
            "countertop" => Ok(Category::Countertop),
            "unclassified" => Ok(Category::Unclassified),
            _ => Err(format!("unknown category '{}'", s)),
        }
    }
}

/// What a group name says about its geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameHint {
    Furniture {
        category: Category,
        keyword: &'static str,
    },
    NonFurniture {
        keyword: &'static str,
    },
    None,
}

// Checked in order: "countertop" has to win over "counter".
const FURNITURE_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Countertop,
        &["countertop", "worktop", "benchtop", "bancada", "tampo"],
    ),
    (
        Category::DrawerUnit,
        &["drawer", "gaveteiro", "gaveta", "chest"],
    ),
    (Category::Door, &["door", "porta", "folha", "leaf", "frente"]),
    (
        Category::Shelf,
        &["shelf", "shelves", "prateleira", "estante", "divider"],
    ),
    (
        Category::Panel,
        &["panel", "painel", "lateral", "tamponamento"],
    ),
    (
        Category::Cabinet,
        &[
            "cabinet",
            "armario",
            "wardrobe",
            "closet",
            "cupboard",
            "pantry",
            "despenseiro",
            "balcao",
            "counter",
        ],
    ),
];

// Matched as whole tokens: "pia" must not fire on "copia".
const NON_FURNITURE_KEYWORDS: &[&str] = &[
    "wall",
    "parede",
    "muro",
    "floor",
    "piso",
    "chao",
    "ceiling",
    "teto",
    "forro",
    "laje",
    "window",
    "janela",
    "beam",
    "viga",
    "column",
    "pilar",
    "fridge",
    "refrigerator",
    "geladeira",
    "stove",
    "fogao",
    "oven",
    "microondas",
    "sink",
    "pia",
    "lamp",
    "luminaria",
];

/// Look for category keywords in a group/object name.
///
/// Furniture keywords are substring matches and take precedence, so
/// `wall_cabinet` is a cabinet rather than a wall.
pub fn name_hint(name: &str) -> NameHint {
    let lower = name.to_lowercase();

    for (category, keywords) in FURNITURE_KEYWORDS {
        if let Some(keyword) = keywords.iter().find(|k| lower.contains(*k)) {
            return NameHint::Furniture {
                category: *category,
                keyword: *keyword,
            };
        }
    }

    for token in lower.split(|c: char| !c.is_alphanumeric()) {
        if let Some(keyword) = NON_FURNITURE_KEYWORDS.iter().find(|k| **k == token) {
            return NameHint::NonFurniture { keyword: *keyword };
        }
    }

    NameHint::None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_round_trip() {
        for category in Category::FURNITURE {
            assert_eq!(category.as_str().parse::<Category>().unwrap(), category);
        }
        assert_eq!("drawer_unit".parse::<Category>().unwrap(), Category::DrawerUnit);
        assert!("sofa".parse::<Category>().is_err());
    }

    #[test]
    fn test_name_hints() {
        assert_eq!(
            name_hint("drawer_1"),
            NameHint::Furniture {
                category: Category::DrawerUnit,
                keyword: "drawer"
            }
        );
        assert!(matches!(
            name_hint("Kitchen_Countertop"),
            NameHint::Furniture {
                category: Category::Countertop,
                ..
            }
        ));
        assert!(matches!(
            name_hint("wall_cabinet_02"),
            NameHint::Furniture {
                category: Category::Cabinet,
                ..
            }
        ));
        assert_eq!(
            name_hint("Parede Norte"),
            NameHint::NonFurniture { keyword: "parede" }
        );
        assert_eq!(name_hint("copia_3"), NameHint::None);
        assert_eq!(name_hint("Group#12"), NameHint::None);
    }
}
