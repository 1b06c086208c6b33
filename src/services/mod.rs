pub mod chain_submitter;
pub mod graphql_client;
pub mod index_poller;
pub mod orchestrator;
pub mod relay_api;
pub mod session_store;
pub mod signature_service;
pub mod signer;
pub mod typed_data_builder;
