#![forbid(unsafe_code)]

use sop_kernel_contracts::sop::{SopDraft, SopId, SopRecord};

use crate::store::{SopStore, StorageError};

/// Typed repository interface the query dispatcher runs against.
///
/// A durable engine replacing the in-memory table implements this trait and
/// keeps the dispatcher and transport unchanged.
pub trait SopRecordRepo {
    fn sop_rows(&self) -> Vec<SopRecord>;
    fn insert_sop_row(&mut self, draft: SopDraft) -> Result<SopRecord, StorageError>;
    fn update_sop_row(&mut self, id: SopId, draft: SopDraft) -> Option<SopRecord>;
    fn delete_sop_row(&mut self, id: SopId) -> Option<SopRecord>;
}

impl SopRecordRepo for SopStore {
    fn sop_rows(&self) -> Vec<SopRecord> {
        self.list_all().to_vec()
    }

    fn insert_sop_row(&mut self, draft: SopDraft) -> Result<SopRecord, StorageError> {
        self.insert(draft)
    }

    fn update_sop_row(&mut self, id: SopId, draft: SopDraft) -> Option<SopRecord> {
        self.update(id, draft)
    }

    fn delete_sop_row(&mut self, id: SopId) -> Option<SopRecord> {
        self.delete(id)
    }
}
