use crate::{models::action::ModuleConfigError, services::graphql_client::GraphqlError};

/// Terminal outcome of an action that did not reach the indexed state.
///
/// Each variant belongs to exactly one failure domain. Orchestrators return
/// the first one they hit and never continue past it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Relay rejected request: {0}")]
    Relay(String),
    #[error("Signing failed: {0}")]
    Signing(String),
    #[error("Transaction reverted: {0}")]
    TransactionRevert(String),
    #[error("Indexing failed: {0}")]
    IndexingFailure(String),
    #[error("Transaction was not indexed after {attempts} status queries")]
    IndexingTimeout { attempts: u32 },
    #[error("Cancelled while waiting for indexing")]
    Cancelled,
}

impl ActionError {
    /// Stable snake_case name of the failure domain, used as a metric label.
    pub fn label(&self) -> &'static str {
        match self {
            ActionError::Authentication(_) => "authentication",
            ActionError::Relay(_) => "relay",
            ActionError::Signing(_) => "signing",
            ActionError::TransactionRevert(_) => "transaction_revert",
            ActionError::IndexingFailure(_) => "indexing_failure",
            ActionError::IndexingTimeout { .. } => "indexing_timeout",
            ActionError::Cancelled => "cancelled",
        }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Wallet error: {0}")]
    Wallet(String),
    #[error("Chain connection error: {0}")]
    Chain(String),
    #[error("Invalid module configuration: {0}")]
    ModuleConfig(#[from] ModuleConfigError),
    #[error("GraphQL error: {0}")]
    Graphql(#[from] GraphqlError),
    #[error(transparent)]
    Action(#[from] ActionError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub type AppResult<T> = Result<T, AppError>;
