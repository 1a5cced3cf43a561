#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use sop_kernel_contracts::sop::{SopDraft, SopId, SopRecord};
use sop_kernel_contracts::{ContractViolation, Validate};

pub const SEED_SOP_TITLE: &str = "Mock SOP";
pub const SEED_SOP_DESCRIPTION: &str = "Running on mock DB";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("query parameter {index} is missing")]
    ParamMissing { index: usize },
    #[error("query parameter {index} must be {expected}")]
    ParamType {
        index: usize,
        expected: &'static str,
    },
    #[error("duplicate key in {table}: {key}")]
    DuplicateKey { table: &'static str, key: String },
    #[error("id space exhausted in {table}")]
    IdSpaceExhausted { table: &'static str },
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),
}

/// In-memory SOP table.
///
/// Rows are kept most-recent-first. New ids come from the largest id ever
/// handed out (or present, when the store was built from existing rows), so a
/// deleted id is never assigned again.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SopStore {
    rows: Vec<SopRecord>,
    id_high_water: Option<SopId>,
}

impl SopStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    /// Store holding the single mock record the service starts with.
    pub fn new_seeded() -> Self {
        let seed = SopRecord::from_draft(
            SopId::FIRST,
            SopDraft::new(SEED_SOP_TITLE, SEED_SOP_DESCRIPTION),
        );
        Self {
            rows: vec![seed],
            id_high_water: Some(SopId::FIRST),
        }
    }

    /// Builds a store from rows already in visible (most-recent-first) order.
    pub fn from_rows(rows: Vec<SopRecord>) -> Result<Self, StorageError> {
        let mut seen = BTreeSet::new();
        for row in &rows {
            row.validate()?;
            if !seen.insert(row.id) {
                return Err(StorageError::DuplicateKey {
                    table: "sops",
                    key: row.id.to_string(),
                });
            }
        }
        let id_high_water = seen.last().copied();
        Ok(Self {
            rows,
            id_high_water,
        })
    }

    pub fn list_all(&self) -> &[SopRecord] {
        &self.rows
    }

    pub fn get(&self, id: SopId) -> Option<&SopRecord> {
        self.rows.iter().find(|row| row.id == id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fails only once `SopId::MAX` has been handed out.
    pub fn insert(&mut self, draft: SopDraft) -> Result<SopRecord, StorageError> {
        let id = self
            .next_id()
            .ok_or(StorageError::IdSpaceExhausted { table: "sops" })?;
        let record = SopRecord::from_draft(id, draft);
        self.rows.insert(0, record.clone());
        self.id_high_water = Some(id);
        Ok(record)
    }

    /// Returns `None` when no row has `id`; the row keeps its position otherwise.
    pub fn update(&mut self, id: SopId, draft: SopDraft) -> Option<SopRecord> {
        let row = self.rows.iter_mut().find(|row| row.id == id)?;
        row.apply_draft(draft);
        Some(row.clone())
    }

    /// Returns the removed row, or `None` when nothing matched.
    pub fn delete(&mut self, id: SopId) -> Option<SopRecord> {
        let index = self.rows.iter().position(|row| row.id == id)?;
        Some(self.rows.remove(index))
    }

    fn next_id(&self) -> Option<SopId> {
        let current_max = self.rows.iter().map(|row| row.id).max();
        match current_max.max(self.id_high_water) {
            Some(id) => id.next(),
            None => Some(SopId::FIRST),
        }
    }
}
