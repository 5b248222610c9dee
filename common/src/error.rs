use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// A rejected form, reported against the first offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    /// The `(lower(name), date)` uniqueness backstop rejected the write.
    #[error("a customer with this name already exists on this date")]
    NameTaken,
}

/// The user-facing action that hit a persistence failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Load,
    Save,
    Update,
    Delete,
    ToggleTrial,
    ToggleDelivery,
}

impl Action {
    pub fn user_message(&self) -> &'static str {
        match self {
            Action::Load => "Failed to load customers.",
            Action::Save => "Failed to save customer. Please try again.",
            Action::Update => "Failed to update customer. Please try again.",
            Action::Delete => "Failed to delete customer.",
            Action::ToggleTrial => "Failed to update trial status",
            Action::ToggleDelivery => "Failed to update delivery status",
        }
    }
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),
    #[error("customer not found")]
    NotFound,
    #[error("{}", .action.user_message())]
    Persistence {
        action: Action,
        #[source]
        source: StoreError,
    },
}
