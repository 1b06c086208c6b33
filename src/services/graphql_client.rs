use std::collections::HashMap;

use alloy::primitives::Address;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    models::{
        action::{CreateProfileRequest, PublishRequest},
        auth::{AuthenticateData, AuthenticationTokens, ChallengeData},
        indexer::{HasTxHashBeenIndexedData, TxIndexingResult},
        profile::{
            CreateCollectTypedDataData, CreateFollowTypedDataData, CreatePostTypedDataData,
            CreateProfileData, CreateUnfollowTypedDataData, DoesFollowData, EnabledModuleCurrenciesData,
            FollowInfo, FollowStatus, ModuleCurrency, ProfilePage, ProfilesData, ProfilesRequest,
            RelayOutcome,
        },
        typed_data::TypedDataEnvelope,
    },
    services::relay_api::{AuthApi, IndexerApi, TypedDataApi},
};

#[derive(Debug, thiserror::Error)]
pub enum GraphqlError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("GraphQL response error: {0}")]
    GraphqlResponseError(String),
    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("Invalid data format: {0}")]
    InvalidData(String),
}

impl GraphqlError {
    /// Human-readable reason without the error-kind prefix, for surfacing
    /// service rejections verbatim.
    pub fn reason(&self) -> String {
        match self {
            GraphqlError::GraphqlResponseError(reason) | GraphqlError::InvalidData(reason) => reason.clone(),
            other => other.to_string(),
        }
    }
}

pub type GraphqlResult<T> = Result<T, GraphqlError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphqlQuery {
    query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<HashMap<String, serde_json::Value>>,
}

impl GraphqlQuery {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.to_string(),
            variables: None,
        }
    }

    pub fn with_request(query: &str, request: serde_json::Value) -> Self {
        let mut variables = HashMap::new();
        variables.insert("request".to_string(), request);
        Self {
            query: query.to_string(),
            variables: Some(variables),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphqlResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<GraphqlErrorDetail>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GraphqlErrorDetail {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<Vec<serde_json::Value>>,
}

const CHALLENGE_QUERY: &str = r#"
query($request: ChallengeRequest!) {
  challenge(request: $request) { text }
}
"#;

const AUTHENTICATE_MUTATION: &str = r#"
mutation($request: SignedAuthChallenge!) {
  authenticate(request: $request) { accessToken refreshToken }
}
"#;

const CREATE_FOLLOW_TYPED_DATA_MUTATION: &str = r#"
mutation($request: FollowRequest!) {
  createFollowTypedData(request: $request) {
    id
    expiresAt
    typedData {
      domain { name chainId version verifyingContract }
      types { FollowWithSig { name type } }
      value { nonce deadline profileIds datas }
    }
  }
}
"#;

const CREATE_UNFOLLOW_TYPED_DATA_MUTATION: &str = r#"
mutation($request: UnfollowRequest!) {
  createUnfollowTypedData(request: $request) {
    id
    expiresAt
    typedData {
      domain { name chainId version verifyingContract }
      types { BurnWithSig { name type } }
      value { nonce deadline tokenId }
    }
  }
}
"#;

const CREATE_POST_TYPED_DATA_MUTATION: &str = r#"
mutation($request: CreatePublicPostRequest!) {
  createPostTypedData(request: $request) {
    id
    expiresAt
    typedData {
      domain { name chainId version verifyingContract }
      types { PostWithSig { name type } }
      value {
        nonce
        deadline
        profileId
        contentURI
        collectModule
        collectModuleData
        referenceModule
        referenceModuleData
      }
    }
  }
}
"#;

const CREATE_COLLECT_TYPED_DATA_MUTATION: &str = r#"
mutation($request: CreateCollectRequest!) {
  createCollectTypedData(request: $request) {
    id
    expiresAt
    typedData {
      domain { name chainId version verifyingContract }
      types { CollectWithSig { name type } }
      value { nonce deadline profileId pubId data }
    }
  }
}
"#;

const CREATE_PROFILE_MUTATION: &str = r#"
mutation($request: CreateProfileRequest!) {
  createProfile(request: $request) {
    ... on RelayerResult { txHash }
    ... on RelayError { reason }
    __typename
  }
}
"#;

const HAS_TX_HASH_BEEN_INDEXED_QUERY: &str = r#"
query($request: HasTxHashBeenIndexedRequest!) {
  hasTxHashBeenIndexed(request: $request) {
    ... on TransactionIndexedResult {
      indexed
      txReceipt { transactionHash blockNumber status }
    }
    ... on TransactionError {
      reason
      txReceipt { transactionHash blockNumber status }
    }
    __typename
  }
}
"#;

const DOES_FOLLOW_QUERY: &str = r#"
query($request: DoesFollowRequest!) {
  doesFollow(request: $request) { followerAddress profileId follows }
}
"#;

const ENABLED_MODULE_CURRENCIES_QUERY: &str = r#"
query {
  enabledModuleCurrencies { name symbol decimals address }
}
"#;

const PROFILES_QUERY: &str = r#"
query($request: ProfileQueryRequest!) {
  profiles(request: $request) {
    items {
      id
      handle
      name
      bio
      ownedBy
      stats { totalFollowers totalFollowing totalPosts }
    }
    pageInfo { prev next totalCount }
  }
}
"#;

#[derive(Debug, Clone)]
pub struct GraphqlClient {
    client: Client,
    graphql_url: String,
}

impl GraphqlClient {
    pub fn new(graphql_url: String, timeout: std::time::Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, graphql_url }
    }

    /// Execute a GraphQL operation, optionally as an authenticated actor.
    pub async fn execute_query<T>(&self, payload: GraphqlQuery, access_token: Option<&str>) -> GraphqlResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        debug!("Executing GraphQL query: {}", payload.query);

        let mut request = self
            .client
            .post(&self.graphql_url)
            .header("Content-Type", "application/json")
            .json(&payload);

        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GraphqlError::GraphqlResponseError(format!(
                "HTTP {} - {}",
                status, text
            )));
        }

        let graphql_response: GraphqlResponse<T> = response.json().await?;

        if let Some(errors) = graphql_response.errors {
            let error_messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(GraphqlError::GraphqlResponseError(error_messages.join(", ")));
        }

        graphql_response
            .data
            .ok_or_else(|| GraphqlError::InvalidData("No data in GraphQL response".to_string()))
    }

    pub async fn does_follow(&self, follow_infos: Vec<FollowInfo>) -> GraphqlResult<Vec<FollowStatus>> {
        let payload = GraphqlQuery::with_request(
            DOES_FOLLOW_QUERY,
            serde_json::json!({ "followInfos": follow_infos }),
        );

        let data: DoesFollowData = self.execute_query(payload, None).await?;
        debug!("doesFollow result: {:?}", data.does_follow);

        Ok(data.does_follow)
    }

    pub async fn enabled_module_currencies(&self, access_token: &str) -> GraphqlResult<Vec<ModuleCurrency>> {
        let payload = GraphqlQuery::new(ENABLED_MODULE_CURRENCIES_QUERY);

        let data: EnabledModuleCurrenciesData = self.execute_query(payload, Some(access_token)).await?;
        info!(
            "Fetched {} enabled module currencies",
            data.enabled_module_currencies.len()
        );

        Ok(data.enabled_module_currencies)
    }

    pub async fn profiles(&self, request: &ProfilesRequest) -> GraphqlResult<ProfilePage> {
        let payload = GraphqlQuery::with_request(PROFILES_QUERY, serde_json::to_value(request)?);

        let data: ProfilesData = self.execute_query(payload, None).await?;
        info!(
            "Fetched {} profiles (total {})",
            data.profiles.items.len(),
            data.profiles.page_info.total_count
        );

        Ok(data.profiles)
    }
}

#[async_trait]
impl AuthApi for GraphqlClient {
    async fn challenge(&self, address: Address) -> GraphqlResult<String> {
        let payload = GraphqlQuery::with_request(
            CHALLENGE_QUERY,
            serde_json::json!({ "address": address.to_string() }),
        );

        let data: ChallengeData = self.execute_query(payload, None).await?;
        Ok(data.challenge.text)
    }

    async fn authenticate(&self, address: Address, signature: String) -> GraphqlResult<AuthenticationTokens> {
        let payload = GraphqlQuery::with_request(
            AUTHENTICATE_MUTATION,
            serde_json::json!({ "address": address.to_string(), "signature": signature }),
        );

        let data: AuthenticateData = self.execute_query(payload, None).await?;
        Ok(data.authenticate)
    }
}

#[async_trait]
impl TypedDataApi for GraphqlClient {
    async fn create_follow_typed_data(&self, access_token: String, profile_id: String) -> GraphqlResult<TypedDataEnvelope> {
        let payload = GraphqlQuery::with_request(
            CREATE_FOLLOW_TYPED_DATA_MUTATION,
            serde_json::json!({ "follow": [{ "profile": profile_id }] }),
        );

        let data: CreateFollowTypedDataData = self.execute_query(payload, Some(&access_token)).await?;
        Ok(data.create_follow_typed_data)
    }

    async fn create_unfollow_typed_data(
        &self,
        access_token: String,
        profile_id: String,
    ) -> GraphqlResult<TypedDataEnvelope> {
        let payload = GraphqlQuery::with_request(
            CREATE_UNFOLLOW_TYPED_DATA_MUTATION,
            serde_json::json!({ "profile": profile_id }),
        );

        let data: CreateUnfollowTypedDataData = self.execute_query(payload, Some(&access_token)).await?;
        Ok(data.create_unfollow_typed_data)
    }

    async fn create_post_typed_data(
        &self,
        access_token: String,
        request: PublishRequest,
    ) -> GraphqlResult<TypedDataEnvelope> {
        let payload = GraphqlQuery::with_request(CREATE_POST_TYPED_DATA_MUTATION, request.to_request_value());

        let data: CreatePostTypedDataData = self.execute_query(payload, Some(&access_token)).await?;
        Ok(data.create_post_typed_data)
    }

    async fn create_collect_typed_data(
        &self,
        access_token: String,
        publication_id: String,
    ) -> GraphqlResult<TypedDataEnvelope> {
        let payload = GraphqlQuery::with_request(
            CREATE_COLLECT_TYPED_DATA_MUTATION,
            serde_json::json!({ "publicationId": publication_id }),
        );

        let data: CreateCollectTypedDataData = self.execute_query(payload, Some(&access_token)).await?;
        Ok(data.create_collect_typed_data)
    }

    async fn create_profile(&self, access_token: String, request: CreateProfileRequest) -> GraphqlResult<RelayOutcome> {
        let payload = GraphqlQuery::with_request(CREATE_PROFILE_MUTATION, serde_json::to_value(&request)?);

        let data: CreateProfileData = self.execute_query(payload, Some(&access_token)).await?;
        Ok(data.create_profile)
    }
}

#[async_trait]
impl IndexerApi for GraphqlClient {
    async fn has_tx_hash_been_indexed(&self, tx_hash: String) -> GraphqlResult<TxIndexingResult> {
        let payload = GraphqlQuery::with_request(
            HAS_TX_HASH_BEEN_INDEXED_QUERY,
            serde_json::json!({ "txHash": tx_hash }),
        );

        let data: HasTxHashBeenIndexedData = self.execute_query(payload, None).await?;
        Ok(data.result)
    }
}
