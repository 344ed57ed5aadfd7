//! Error types for the reordering engine

use thiserror::Error;

/// Result type for reorder operations
pub type Result<T> = std::result::Result<T, ReorderError>;

/// Severity levels for error classification
///
/// - **Warning**: the event was ignored and the engine carries on unchanged.
/// - **Error**: the requested move failed, but the board stays consistent.
/// - **Critical**: the engine was handed data it cannot work with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Warning,
    Error,
    Critical,
}

/// Errors that can occur while dragging, building or reconciling reorders
#[derive(Debug, Error)]
pub enum ReorderError {
    /// A gesture event arrived that is illegal in the current drag phase
    #[error("invalid state: cannot {event} while {phase}")]
    InvalidState { event: &'static str, phase: String },

    /// The destination list does not accept the item
    #[error("item {item_id} may not be moved to list {list_id}")]
    PermissionDenied { item_id: String, list_id: String },

    /// The persistence collaborator rejected a submission
    #[error("move could not be saved: {reason}")]
    SubmissionFailure { item_id: String, reason: String },

    /// Key precision is exhausted; the list must be renumbered
    #[error("order key of length {length} exceeds the limit of {max}")]
    RebalanceRequired { length: usize, max: usize },

    /// Lower bound is not strictly below the upper bound
    #[error("no key fits between {lower} and {upper}")]
    InvalidKeyRange { lower: String, upper: String },

    /// Malformed order key
    #[error("invalid order key '{key}': {message}")]
    InvalidOrderKey { key: String, message: String },

    /// Item not found
    #[error("item not found: {id}")]
    ItemNotFound { id: String },

    /// List not found
    #[error("list not found: {id}")]
    ListNotFound { id: String },

    /// Item already present on the board
    #[error("duplicate item ID: {id}")]
    DuplicateItem { id: String },

    /// List already present on the board
    #[error("duplicate list ID: {id}")]
    DuplicateList { id: String },

    /// Two items in one list would share a key
    #[error("order key {key} already used in list {list_id} by {holder}")]
    DuplicateOrderKey {
        list_id: String,
        key: String,
        holder: String,
    },

    /// The drop names neighbors that no longer match the board
    #[error("stale drop position for item {item_id}: {message}")]
    StaleDrop { item_id: String, message: String },

    /// Configuration value out of range
    #[error("invalid value for {field}: {message}")]
    InvalidConfig { field: String, message: String },

    /// Configuration could not be extracted
    #[error("configuration error: {0}")]
    Config(#[source] Box<figment::Error>),
}

impl From<figment::Error> for ReorderError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl ReorderError {
    /// Create an invalid state error
    pub fn invalid_state(event: &'static str, phase: impl ToString) -> Self {
        Self::InvalidState {
            event,
            phase: phase.to_string(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(item_id: impl ToString, list_id: impl ToString) -> Self {
        Self::PermissionDenied {
            item_id: item_id.to_string(),
            list_id: list_id.to_string(),
        }
    }

    /// Create a submission failure
    pub fn submission_failure(item_id: impl ToString, reason: impl Into<String>) -> Self {
        Self::SubmissionFailure {
            item_id: item_id.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a stale drop error
    pub fn stale_drop(item_id: impl ToString, message: impl Into<String>) -> Self {
        Self::StaleDrop {
            item_id: item_id.to_string(),
            message: message.into(),
        }
    }

    /// Create an invalid order key error
    pub fn invalid_order_key(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidOrderKey {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn item_not_found(id: impl ToString) -> Self {
        Self::ItemNotFound { id: id.to_string() }
    }

    pub fn list_not_found(id: impl ToString) -> Self {
        Self::ListNotFound { id: id.to_string() }
    }

    /// How loudly this error should be reported
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::InvalidState { .. } | Self::RebalanceRequired { .. } => ErrorSeverity::Warning,
            Self::PermissionDenied { .. }
            | Self::SubmissionFailure { .. }
            | Self::StaleDrop { .. }
            | Self::ItemNotFound { .. }
            | Self::ListNotFound { .. }
            | Self::InvalidKeyRange { .. } => ErrorSeverity::Error,
            Self::InvalidOrderKey { .. }
            | Self::DuplicateItem { .. }
            | Self::DuplicateList { .. }
            | Self::DuplicateOrderKey { .. }
            | Self::InvalidConfig { .. }
            | Self::Config(_) => ErrorSeverity::Critical,
        }
    }

    /// Whether the UI should show a notice for this error
    pub fn is_user_visible(&self) -> bool {
        matches!(
            self,
            Self::SubmissionFailure { .. } | Self::PermissionDenied { .. }
        )
    }

    /// Check if the board is still usable after this error
    pub fn is_recoverable(&self) -> bool {
        self.severity() != ErrorSeverity::Critical
    }
}
