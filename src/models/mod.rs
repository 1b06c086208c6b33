pub mod action;
pub mod auth;
pub mod indexer;
pub mod profile;
pub mod typed_data;
