//! Error types for association reconciliation.

use std::fmt;

use catalog_storage::{ErrorCategory, StorageError};

/// A call made against the association store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// Loading the current join rows of the owner.
    List,
    /// The remove batch.
    Delete,
    /// The add batch.
    Insert,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List => write!(f, "list"),
            Self::Delete => write!(f, "delete"),
            Self::Insert => write!(f, "insert"),
        }
    }
}

/// Errors reported by the reconciler.
///
/// Every variant except [`ReconcileError::PartialApplication`] guarantees that
/// no join row was changed by the failed call.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// The owner or a desired identifier is not a valid identifier.
    /// Raised before any store call.
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// A store call failed and nothing was applied.
    ///
    /// Raised when listing fails, or when one batch fails while the other
    /// batch had no rows to apply.
    #[error("Association store {operation} failed: {source}")]
    StoreUnavailable {
        operation: StoreOperation,
        #[source]
        source: StorageError,
    },

    /// Both the delete and the insert batch failed; nothing was applied.
    #[error("Both association batches failed (delete: {delete}; insert: {insert})")]
    BatchesFailed {
        delete: StorageError,
        insert: StorageError,
    },

    /// One batch was applied and the other failed. The applied side is not
    /// rolled back.
    #[error("Association {failed} batch failed after {applied} batch was applied: {source}")]
    PartialApplication {
        failed: StoreOperation,
        applied: StoreOperation,
        #[source]
        source: StorageError,
    },
}

impl ReconcileError {
    /// Creates a new `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Returns `true` if one batch was applied and the other was not.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        matches!(self, Self::PartialApplication { .. })
    }

    /// Returns the store operation that failed, if a single one did.
    #[must_use]
    pub fn failed_operation(&self) -> Option<StoreOperation> {
        match self {
            Self::StoreUnavailable { operation, .. } => Some(*operation),
            Self::PartialApplication { failed, .. } => Some(*failed),
            Self::InvalidInput { .. } | Self::BatchesFailed { .. } => None,
        }
    }

    /// Returns the underlying storage error, if there is exactly one.
    #[must_use]
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            Self::StoreUnavailable { source, .. } | Self::PartialApplication { source, .. } => {
                Some(source)
            }
            Self::InvalidInput { .. } | Self::BatchesFailed { .. } => None,
        }
    }

    /// Returns the batch that failed, if exactly one did.
    ///
    /// A failed list call is not a batch and yields `None`.
    #[must_use]
    pub fn failed_batch(&self) -> Option<StoreOperation> {
        self.failed_operation()
            .filter(|op| !matches!(op, StoreOperation::List))
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput { .. } => ErrorCategory::Validation,
            Self::StoreUnavailable { source, .. } => source.category(),
            Self::BatchesFailed { .. } => ErrorCategory::Infrastructure,
            Self::PartialApplication { .. } => ErrorCategory::Internal,
        }
    }
}
