// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

use crate::format::MeshFormat;

/// Result type for mesh loading
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a load. No partial mesh is ever returned alongside one.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Unsupported mesh format: {format}")]
    UnsupportedFormat { format: String },

    #[error("Malformed {format} geometry at {region}: {reason}")]
    MalformedGeometry {
        format: MeshFormat,
        /// Where in the file the problem sits (`line 12`, `byte 84`, `header`, ...)
        region: String,
        reason: String,
    },
}

impl Error {
    /// Shorthand used by the format parsers
    pub fn malformed(
        format: MeshFormat,
        region: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::MalformedGeometry {
            format,
            region: region.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(format: impl Into<String>) -> Self {
        Error::UnsupportedFormat {
            format: format.into(),
        }
    }
}
