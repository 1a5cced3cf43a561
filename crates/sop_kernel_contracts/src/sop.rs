#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::common::{ContractViolation, Validate};

/// Store-assigned record identity. Ids start at 1, are never reused, and stay
/// within the `i64` range so they pass through integer query parameters unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SopId(u64);

impl SopId {
    pub const FIRST: SopId = SopId(1);
    pub const MAX: SopId = SopId(i64::MAX as u64);

    pub fn new(id: u64) -> Result<Self, ContractViolation> {
        let v = Self(id);
        v.validate()?;
        Ok(v)
    }

    /// Parses an id coming from a path segment or a text parameter.
    ///
    /// Surrounding whitespace is ignored; anything that is not a decimal
    /// integer in `1..=SopId::MAX` yields `None`, which callers treat as
    /// "no such record".
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        raw.trim().parse::<u64>().ok().and_then(|v| Self::new(v).ok())
    }

    pub fn get(self) -> u64 {
        self.0
    }

    pub fn as_i64(self) -> i64 {
        // in range: every constructor validates against MAX
        self.0 as i64
    }

    /// `None` once the id space is exhausted.
    pub fn next(self) -> Option<Self> {
        (self.0 < Self::MAX.0).then(|| Self(self.0 + 1))
    }
}

impl Validate for SopId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.0 == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "sop_id",
                reason: "must be > 0",
            });
        }
        if self.0 > Self::MAX.0 {
            return Err(ContractViolation::InvalidValue {
                field: "sop_id",
                reason: "must be <= i64::MAX",
            });
        }
        Ok(())
    }
}

impl fmt::Display for SopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-supplied SOP content. Neither field has a length constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopDraft {
    pub title: String,
    pub description: String,
}

impl SopDraft {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SopRecord {
    pub id: SopId,
    pub title: String,
    pub description: String,
}

impl SopRecord {
    pub fn from_draft(id: SopId, draft: SopDraft) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
        }
    }

    /// Overwrites content in place; `id` is immutable.
    pub fn apply_draft(&mut self, draft: SopDraft) {
        self.title = draft.title;
        self.description = draft.description;
    }
}

impl Validate for SopRecord {
    fn validate(&self) -> Result<(), ContractViolation> {
        self.id.validate()
    }
}
