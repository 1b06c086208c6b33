//! # social-relay
//!
//! Client-side orchestration for signed social actions. An action (follow,
//! unfollow, publish, collect, create profile) is turned into an indexed
//! on-chain state change by logging in to the relay, requesting EIP-712 typed
//! data, signing it with the actor's wallet, submitting the contract call and
//! polling the indexer until the transaction is confirmed.

pub mod config;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use errors::{ActionError, ActionResult, AppError, AppResult};
pub use models::action::{ActionKind, ActionRequest};
pub use models::indexer::{IndexConfirmation, IndexStatus, TransactionHandle};
pub use services::graphql_client::{GraphqlClient, GraphqlError};
pub use services::index_poller::{IndexPoller, PollPolicy};
pub use services::orchestrator::ActionOrchestrator;
pub use services::session_store::SessionStore;
pub use services::signer::{LocalWalletSigner, Signer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}

/// Get the library name
pub fn name() -> &'static str {
    NAME
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(name(), "social-relay");
    }
}
