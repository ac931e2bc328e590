// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use joinery_core::Category;
use thiserror::Error;

/// Result type for classification and pricing
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] joinery_core::Error),

    #[error("No calibration rates for {category} in material '{material}'")]
    UnknownMaterial { category: Category, material: String },

    #[error("No multiplier for complexity '{complexity}'")]
    UnknownComplexity { complexity: String },

    #[error("Invalid calibration table: {0}")]
    InvalidCalibration(String),

    #[error("Invalid model parameters: {0}")]
    InvalidModel(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
