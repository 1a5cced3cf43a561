#![forbid(unsafe_code)]

use sop_kernel_contracts::sop::{SopDraft, SopId, SopRecord};
use tracing::{debug, info, warn};

use crate::repo::SopRecordRepo;
use crate::store::StorageError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryCommand {
    Select,
    Insert,
    Update,
    Delete,
}

impl QueryCommand {
    /// Classifies a statement by its leading keyword.
    pub fn classify(statement: &str) -> Option<Self> {
        let keyword = statement
            .trim_start()
            .split(|c: char| c.is_whitespace() || c == '(')
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase();
        match keyword.as_str() {
            "SELECT" => Some(Self::Select),
            "INSERT" => Some(Self::Insert),
            "UPDATE" => Some(Self::Update),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// Positional query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryParam {
    Text(String),
    Int(i64),
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<SopId> for QueryParam {
    fn from(v: SopId) -> Self {
        Self::Int(v.as_i64())
    }
}

/// Uniform result envelope. An empty `rows` is how "not found" travels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub rows: Vec<SopRecord>,
}

impl QueryResult {
    pub fn empty() -> Self {
        Self::default()
    }

    fn single(row: Option<SopRecord>) -> Self {
        Self {
            rows: row.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_first(self) -> Option<SopRecord> {
        self.rows.into_iter().next()
    }
}

/// Parameter layout per command:
/// `SELECT []`, `INSERT [title, description]`, `UPDATE [title, description, id]`, `DELETE [id]`.
pub fn execute<R>(
    repo: &mut R,
    command: QueryCommand,
    params: &[QueryParam],
) -> Result<QueryResult, StorageError>
where
    R: SopRecordRepo + ?Sized,
{
    debug!(
        command = command.as_str(),
        param_count = params.len(),
        "sop query"
    );
    match command {
        QueryCommand::Select => Ok(QueryResult {
            rows: repo.sop_rows(),
        }),
        QueryCommand::Insert => {
            let draft = draft_params(params)?;
            Ok(QueryResult::single(Some(repo.insert_sop_row(draft)?)))
        }
        QueryCommand::Update => {
            let draft = draft_params(params)?;
            let updated = match id_param(params, 2)? {
                Some(id) => repo.update_sop_row(id, draft),
                None => None,
            };
            Ok(QueryResult::single(updated))
        }
        QueryCommand::Delete => {
            let deleted = match id_param(params, 0)? {
                Some(id) => repo.delete_sop_row(id),
                None => None,
            };
            if let Some(row) = deleted.as_ref() {
                info!(sop_id = %row.id, title = %row.title, "deleted sop");
            }
            Ok(QueryResult::single(deleted))
        }
    }
}

/// Runs a textual statement. Unrecognized statements return no rows.
pub fn execute_statement<R>(
    repo: &mut R,
    statement: &str,
    params: &[QueryParam],
) -> Result<QueryResult, StorageError>
where
    R: SopRecordRepo + ?Sized,
{
    match QueryCommand::classify(statement) {
        Some(command) => execute(repo, command, params),
        None => {
            warn!(statement, "unrecognized sop statement; returning no rows");
            Ok(QueryResult::empty())
        }
    }
}

fn draft_params(params: &[QueryParam]) -> Result<SopDraft, StorageError> {
    Ok(SopDraft::new(text_param(params, 0)?, text_param(params, 1)?))
}

fn text_param(params: &[QueryParam], index: usize) -> Result<String, StorageError> {
    match params.get(index) {
        Some(QueryParam::Text(v)) => Ok(v.clone()),
        Some(QueryParam::Int(_)) => Err(StorageError::ParamType {
            index,
            expected: "text",
        }),
        None => Err(StorageError::ParamMissing { index }),
    }
}

/// `Ok(None)` means the value can never name a stored row.
fn id_param(params: &[QueryParam], index: usize) -> Result<Option<SopId>, StorageError> {
    match params.get(index) {
        Some(QueryParam::Int(v)) => Ok(u64::try_from(*v).ok().and_then(|v| SopId::new(v).ok())),
        Some(QueryParam::Text(v)) => Ok(SopId::parse_lenient(v)),
        None => Err(StorageError::ParamMissing { index }),
    }
}
