use super::backend::StorageBackend;
use super::{APPLICABILITY_TABLE, DEFINITIONS_TABLE, SEQUENCES_TABLE};
use crate::error::{EavError, Result};
use crate::model::{Applicability, AttributeDefinition, Sequence, ValueRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

/// In-memory storage backend.
///
/// Tables sit behind `RwLock`s so any number of readers can load while a
/// writer swaps a table in.
#[derive(Default)]
pub struct MemBackend {
    definitions: RwLock<Vec<AttributeDefinition>>,
    applicability: RwLock<Vec<Applicability>>,
    sequences: RwLock<Vec<Sequence>>,
    values: RwLock<HashMap<String, Vec<ValueRecord>>>,
    simulate_write_error: AtomicBool,
    failing_table: RwLock<Option<String>>,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable write error simulation for testing error handling.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Fail saves to one table only, leaving every other table writable.
    pub fn set_failing_table(&self, table: Option<&str>) {
        *self
            .failing_table
            .write()
            .unwrap_or_else(PoisonError::into_inner) = table.map(String::from);
    }

    fn check_writable(&self, table: &str) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(EavError::Store("Simulated write error".to_string()));
        }
        let failing = self.failing_table.read().map_err(poisoned)?;
        if failing.as_deref() == Some(table) {
            return Err(EavError::Store(format!("Simulated write error on {}", table)));
        }
        Ok(())
    }
}

fn poisoned<T>(_: PoisonError<T>) -> EavError {
    EavError::Store("memory table lock poisoned".to_string())
}

impl StorageBackend for MemBackend {
    fn load_definitions(&self) -> Result<Vec<AttributeDefinition>> {
        Ok(self.definitions.read().map_err(poisoned)?.clone())
    }

    fn save_definitions(&self, definitions: &[AttributeDefinition]) -> Result<()> {
        self.check_writable(DEFINITIONS_TABLE)?;
        *self.definitions.write().map_err(poisoned)? = definitions.to_vec();
        Ok(())
    }

    fn load_applicability(&self) -> Result<Vec<Applicability>> {
        Ok(self.applicability.read().map_err(poisoned)?.clone())
    }

    fn save_applicability(&self, rows: &[Applicability]) -> Result<()> {
        self.check_writable(APPLICABILITY_TABLE)?;
        *self.applicability.write().map_err(poisoned)? = rows.to_vec();
        Ok(())
    }

    fn load_sequences(&self) -> Result<Vec<Sequence>> {
        Ok(self.sequences.read().map_err(poisoned)?.clone())
    }

    fn save_sequences(&self, sequences: &[Sequence]) -> Result<()> {
        self.check_writable(SEQUENCES_TABLE)?;
        *self.sequences.write().map_err(poisoned)? = sequences.to_vec();
        Ok(())
    }

    fn load_values(&self, table: &str) -> Result<Vec<ValueRecord>> {
        let values = self.values.read().map_err(poisoned)?;
        Ok(values.get(table).cloned().unwrap_or_default())
    }

    fn save_values(&self, table: &str, rows: &[ValueRecord]) -> Result<()> {
        self.check_writable(table)?;
        self.values
            .write()
            .map_err(poisoned)?
            .insert(table.to_string(), rows.to_vec());
        Ok(())
    }
}
