//! Seams between the orchestration pipeline and the relay service.
//!
//! [`GraphqlClient`](super::graphql_client::GraphqlClient) implements all of
//! them; tests substitute mocks.

use alloy::primitives::Address;
use async_trait::async_trait;

use crate::{
    models::{
        action::{CreateProfileRequest, PublishRequest},
        auth::AuthenticationTokens,
        indexer::TxIndexingResult,
        profile::RelayOutcome,
        typed_data::TypedDataEnvelope,
    },
    services::graphql_client::GraphqlResult,
};

/// Challenge/response login.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn challenge(&self, address: Address) -> GraphqlResult<String>;

    async fn authenticate(&self, address: Address, signature: String) -> GraphqlResult<AuthenticationTokens>;
}

/// Authenticated mutations that prepare typed data or relay on the actor's behalf.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TypedDataApi: Send + Sync {
    async fn create_follow_typed_data(&self, access_token: String, profile_id: String) -> GraphqlResult<TypedDataEnvelope>;

    async fn create_unfollow_typed_data(
        &self,
        access_token: String,
        profile_id: String,
    ) -> GraphqlResult<TypedDataEnvelope>;

    async fn create_post_typed_data(
        &self,
        access_token: String,
        request: PublishRequest,
    ) -> GraphqlResult<TypedDataEnvelope>;

    async fn create_collect_typed_data(
        &self,
        access_token: String,
        publication_id: String,
    ) -> GraphqlResult<TypedDataEnvelope>;

    async fn create_profile(&self, access_token: String, request: CreateProfileRequest) -> GraphqlResult<RelayOutcome>;
}

/// Indexing status of a submitted transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexerApi: Send + Sync {
    async fn has_tx_hash_been_indexed(&self, tx_hash: String) -> GraphqlResult<TxIndexingResult>;
}
