// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Calibration data and its process-wide holder

mod store;
mod table;

pub use store::CalibrationStore;
pub use table::{CalibrationTable, Complexity, Surcharges, UnitRates};
