#![forbid(unsafe_code)]

use std::fmt;

use upline_kernel_contracts::ContractViolation;
use upline_storage::ledger::StorageError;

#[derive(Debug, Clone, PartialEq)]
pub enum UplineError {
    /// Malformed or out-of-range input, or a reference to a row that does not exist.
    InvalidArgument(String),
    /// A member with the same display name or contact address already exists.
    DuplicateName(String),
    /// The backing store rejected or could not serve a write.
    Persistence(StorageError),
}

impl UplineError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        UplineError::InvalidArgument(reason.into())
    }

    /// Both `InvalidArgument` and `DuplicateName` are caller mistakes, never retried.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(
            self,
            UplineError::InvalidArgument(_) | UplineError::DuplicateName(_)
        )
    }

    /// Translation for writes on the `members` table.
    pub fn from_member_write(err: StorageError) -> Self {
        match err {
            StorageError::DuplicateKey { .. } => {
                UplineError::DuplicateName("display name or contact address already exists".into())
            }
            StorageError::ForeignKeyViolation { .. } => {
                UplineError::invalid("parent member does not exist")
            }
            other => UplineError::from(other),
        }
    }
}

impl From<ContractViolation> for UplineError {
    fn from(v: ContractViolation) -> Self {
        UplineError::InvalidArgument(v.to_string())
    }
}

impl From<StorageError> for UplineError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ContractViolation(v) => UplineError::from(v),
            StorageError::ForeignKeyViolation { table, key } => {
                UplineError::InvalidArgument(format!("{table} references missing row {key}"))
            }
            other => UplineError::Persistence(other),
        }
    }
}

impl fmt::Display for UplineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UplineError::InvalidArgument(reason) => write!(f, "invalid argument: {reason}"),
            UplineError::DuplicateName(reason) => write!(f, "invalid argument: {reason}"),
            UplineError::Persistence(err) => write!(f, "persistence failure: {err}"),
        }
    }
}

impl std::error::Error for UplineError {}
