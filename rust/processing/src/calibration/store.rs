// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Snapshot-on-read holder for the active calibration table

use std::sync::{Arc, RwLock};

use super::table::CalibrationTable;
use crate::error::Result;

/// Holds the current table. Readers take an `Arc` snapshot and keep it for
/// the whole computation, so a refresh never lands halfway through a budget.
#[derive(Debug)]
pub struct CalibrationStore {
    current: RwLock<Arc<CalibrationTable>>,
}

impl CalibrationStore {
    pub fn new(table: CalibrationTable) -> Self {
        Self {
            current: RwLock::new(Arc::new(table)),
        }
    }

    /// Parse a JSON table and hold it
    pub fn load(json: &str) -> Result<Self> {
        Ok(Self::new(CalibrationTable::from_json(json)?))
    }

    /// The table in effect right now
    pub fn snapshot(&self) -> Arc<CalibrationTable> {
        // A poisoned lock still holds a complete table; writers only swap
        // the Arc.
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Swap in a new table. Existing snapshots are unaffected.
    pub fn refresh(&self, table: CalibrationTable) {
        let table = Arc::new(table);
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        *guard = table;
        tracing::info!("Calibration table refreshed");
    }

    /// Parse and swap in a JSON table; the current table stays on error
    pub fn refresh_json(&self, json: &str) -> Result<()> {
        let table = CalibrationTable::from_json(json)?;
        self.refresh(table);
        Ok(())
    }
}

impl Default for CalibrationStore {
    fn default() -> Self {
        Self::new(CalibrationTable::reference())
    }
}
