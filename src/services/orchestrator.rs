use std::sync::Arc;

use alloy::primitives::Address;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    errors::{ActionError, ActionResult},
    metrics::track_action,
    models::{
        action::{ActionKind, ActionRequest, CreateProfileRequest, PublishRequest},
        auth::AuthSession,
        indexer::TransactionHandle,
    },
    services::{
        chain_submitter::{prepare_call, TransactionSender},
        index_poller::IndexPoller,
        session_store::SessionStore,
        signature_service::SignatureService,
        signer::Signer,
        typed_data_builder::TypedDataBuilder,
    },
};

/// Runs one action from login to indexing confirmation.
///
/// Every step fails fast; the caller gets either an indexed transaction
/// handle or exactly one [`ActionError`].
pub struct ActionOrchestrator {
    signer: Arc<dyn Signer>,
    sessions: Arc<SessionStore>,
    builder: TypedDataBuilder,
    signatures: SignatureService,
    sender: Arc<dyn TransactionSender>,
    poller: IndexPoller,
    hub: Address,
}

impl ActionOrchestrator {
    pub fn new(
        signer: Arc<dyn Signer>,
        sessions: Arc<SessionStore>,
        builder: TypedDataBuilder,
        sender: Arc<dyn TransactionSender>,
        poller: IndexPoller,
        hub: Address,
    ) -> Self {
        let signatures = SignatureService::new(signer.clone());
        Self {
            signer,
            sessions,
            builder,
            signatures,
            sender,
            poller,
            hub,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn actor(&self) -> Address {
        self.signer.address()
    }

    pub async fn execute(&self, request: ActionRequest, cancel: &CancellationToken) -> ActionResult<TransactionHandle> {
        let kind = request.kind();
        track_action(kind, self.run(kind, request, cancel)).await
    }

    pub async fn follow(&self, profile_id: &str, cancel: &CancellationToken) -> ActionResult<TransactionHandle> {
        let request = ActionRequest::Follow {
            profile_id: profile_id.to_string(),
        };
        self.execute(request, cancel).await
    }

    pub async fn unfollow(&self, profile_id: &str, cancel: &CancellationToken) -> ActionResult<TransactionHandle> {
        let request = ActionRequest::Unfollow {
            profile_id: profile_id.to_string(),
        };
        self.execute(request, cancel).await
    }

    pub async fn publish(&self, request: PublishRequest, cancel: &CancellationToken) -> ActionResult<TransactionHandle> {
        self.execute(ActionRequest::Publish(request), cancel).await
    }

    pub async fn collect(&self, publication_id: &str, cancel: &CancellationToken) -> ActionResult<TransactionHandle> {
        let request = ActionRequest::Collect {
            publication_id: publication_id.to_string(),
        };
        self.execute(request, cancel).await
    }

    pub async fn create_profile(
        &self,
        request: CreateProfileRequest,
        cancel: &CancellationToken,
    ) -> ActionResult<TransactionHandle> {
        self.execute(ActionRequest::CreateProfile(request), cancel).await
    }

    async fn run(
        &self,
        kind: ActionKind,
        request: ActionRequest,
        cancel: &CancellationToken,
    ) -> ActionResult<TransactionHandle> {
        let actor = self.signer.address();
        info!(action = %kind, actor = %actor, "Starting action");

        let session = self.sessions.ensure_session(actor).await?;

        let handle = match &request {
            ActionRequest::CreateProfile(create) => self.builder.create_profile(&session, create).await?,
            _ => self.submit_signed(kind, &session, &request).await?,
        };

        let confirmation = self.poller.await_indexed(&handle.hash, cancel).await?;
        info!(
            action = %kind,
            actor = %actor,
            tx_hash = %handle.hash,
            attempts = confirmation.attempts,
            "Action indexed"
        );

        Ok(handle)
    }

    async fn submit_signed(
        &self,
        kind: ActionKind,
        session: &AuthSession,
        request: &ActionRequest,
    ) -> ActionResult<TransactionHandle> {
        let envelope = self.builder.build_envelope(session, request).await?;

        let signature = self.signatures.sign(&envelope).await.map_err(|e| {
            error!(action = %kind, envelope_id = %envelope.id, error = %e, "Signing failed");
            ActionError::Signing(e.to_string())
        })?;

        let call = prepare_call(kind, &envelope, &signature, session.actor_address, self.hub).map_err(|e| {
            error!(action = %kind, envelope_id = %envelope.id, error = %e, "Cannot encode contract call");
            ActionError::Relay(e.to_string())
        })?;

        info!(action = %kind, entry_point = call.entry_point.as_str(), to = %call.to, "Submitting transaction");
        self.sender
            .send(call)
            .await
            .map_err(|e| ActionError::TransactionRevert(e.reason()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            action::{CollectModule, ReferenceModule},
            auth::AuthenticationTokens, indexer::TxIndexingResult, profile::RelayOutcome,
            typed_data::TypedDataEnvelope,
        },
        services::{
            chain_submitter::{EntryPoint, MockTransactionSender, SubmitError, COLLECT_GAS_LIMIT},
            index_poller::PollPolicy,
            relay_api::{MockAuthApi, MockIndexerApi, MockTypedDataApi},
            signer::MockSigner,
        },
    };
    use std::str::FromStr;
    use tokio::time::Duration;

    const HUB: &str = "0x60Ae865ee4C725cd04353b5AAb364553f56ceF82";
    const FOLLOW_NFT: &str = "0x1eec6ecca4625da3fa6cd6339dbcc2418710e8a";

    fn actor() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn hub() -> Address {
        Address::from_str(HUB).unwrap()
    }

    fn signer(expect_typed_data: bool) -> MockSigner {
        let mut signer = MockSigner::new();
        signer.expect_address().returning(actor);
        signer
            .expect_sign_message()
            .returning(|_| Ok(format!("0x{}1b", "ab".repeat(64))));
        if expect_typed_data {
            signer
                .expect_sign_typed_data()
                .times(1)
                .returning(|_| Ok(format!("0x{}{}1c", "11".repeat(32), "22".repeat(32))));
        } else {
            signer.expect_sign_typed_data().never();
        }
        signer
    }

    fn auth_api() -> MockAuthApi {
        let mut api = MockAuthApi::new();
        api.expect_challenge()
            .times(1)
            .returning(|_| Ok("challenge".to_string()));
        api.expect_authenticate().times(1).returning(|_, _| {
            Ok(AuthenticationTokens {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
            })
        });
        api
    }

    fn envelope(primary: &str, value: serde_json::Value) -> TypedDataEnvelope {
        serde_json::from_value(serde_json::json!({
            "id": "e1",
            "expiresAt": "2099-01-01T00:00:00.000Z",
            "typedData": {
                "domain": {
                    "name": "Lens Protocol Profiles",
                    "chainId": 80001,
                    "version": "1",
                    "verifyingContract": HUB,
                    "__typename": "EIP712TypedDataDomain"
                },
                "types": {
                    primary: [
                        { "name": "nonce", "type": "uint256", "__typename": "EIP712TypedDataField" },
                        { "name": "deadline", "type": "uint256", "__typename": "EIP712TypedDataField" }
                    ]
                },
                "value": value
            }
        }))
        .unwrap()
    }

    fn indexer(responses: Vec<TxIndexingResult>) -> MockIndexerApi {
        let count = responses.len();
        let mut responses = responses.into_iter();
        let mut api = MockIndexerApi::new();
        api.expect_has_tx_hash_been_indexed()
            .times(count)
            .returning(move |_| Ok(responses.next().unwrap()));
        api
    }

    fn orchestrator(
        signer: MockSigner,
        auth: MockAuthApi,
        typed: MockTypedDataApi,
        sender: MockTransactionSender,
        indexer: MockIndexerApi,
    ) -> ActionOrchestrator {
        let signer: Arc<dyn Signer> = Arc::new(signer);
        let sessions = Arc::new(SessionStore::new(Arc::new(auth), signer.clone()));
        let policy = PollPolicy {
            interval: Duration::from_millis(500),
            max_attempts: Some(10),
            timeout: None,
        };

        ActionOrchestrator::new(
            signer,
            sessions,
            TypedDataBuilder::new(Arc::new(typed)),
            Arc::new(sender),
            IndexPoller::new(Arc::new(indexer), policy),
            hub(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_end_to_end() {
        let mut typed = MockTypedDataApi::new();
        typed
            .expect_create_follow_typed_data()
            .withf(|token, profile_id| token == "access" && profile_id == "0x01")
            .times(1)
            .returning(|_, _| {
                Ok(envelope(
                    "FollowWithSig",
                    serde_json::json!({
                        "nonce": 0,
                        "deadline": 9999999999u64,
                        "profileIds": ["0x01"],
                        "datas": ["0x"],
                        "__typename": "CreateFollowEIP712TypedDataValue"
                    }),
                ))
            });

        let mut sender = MockTransactionSender::new();
        sender
            .expect_send()
            .withf(|call| call.to == hub() && call.entry_point == EntryPoint::FollowWithSig)
            .times(1)
            .returning(|_| Ok(TransactionHandle::new("0xabc")));

        let orchestrator = orchestrator(
            signer(true),
            auth_api(),
            typed,
            sender,
            indexer(vec![TxIndexingResult::pending(), TxIndexingResult::indexed()]),
        );

        let handle = orchestrator.follow("0x01", &CancellationToken::new()).await.unwrap();
        assert_eq!(handle, TransactionHandle::new("0xabc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_revert_skips_polling() {
        let mut typed = MockTypedDataApi::new();
        typed.expect_create_collect_typed_data().times(1).returning(|_, _| {
            Ok(envelope(
                "CollectWithSig",
                serde_json::json!({
                    "nonce": 0,
                    "deadline": 9999999999u64,
                    "profileId": "0x01",
                    "pubId": "0x02",
                    "data": "0x"
                }),
            ))
        });

        let mut sender = MockTransactionSender::new();
        sender
            .expect_send()
            .withf(|call| call.gas_limit == Some(COLLECT_GAS_LIMIT))
            .times(1)
            .returning(|_| Err(SubmitError::Reverted("insufficient allowance".to_string())));

        let orchestrator = orchestrator(signer(true), auth_api(), typed, sender, indexer(vec![]));

        let err = orchestrator
            .collect("0x01-0x02", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::TransactionRevert("insufficient allowance".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_profile_polls_relayed_hash() {
        let mut typed = MockTypedDataApi::new();
        typed.expect_create_profile().times(1).returning(|_, _| {
            Ok(RelayOutcome::RelayerResult {
                tx_hash: "0xfeed".to_string(),
            })
        });

        let mut sender = MockTransactionSender::new();
        sender.expect_send().never();

        let orchestrator = orchestrator(
            signer(false),
            auth_api(),
            typed,
            sender,
            indexer(vec![TxIndexingResult::indexed()]),
        );

        let handle = orchestrator
            .create_profile(
                CreateProfileRequest {
                    handle: "punk".to_string(),
                    profile_picture_uri: None,
                    follow_nft_uri: None,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(handle.hash, "0xfeed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_profile_relay_error() {
        let mut typed = MockTypedDataApi::new();
        typed.expect_create_profile().returning(|_, _| {
            Ok(RelayOutcome::RelayError {
                reason: "HANDLE_TAKEN".to_string(),
            })
        });

        let mut sender = MockTransactionSender::new();
        sender.expect_send().never();

        let orchestrator = orchestrator(signer(false), auth_api(), typed, sender, indexer(vec![]));

        let err = orchestrator
            .create_profile(
                CreateProfileRequest {
                    handle: "punk".to_string(),
                    profile_picture_uri: None,
                    follow_nft_uri: None,
                },
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::Relay("HANDLE_TAKEN".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_authentication_failure_stops_pipeline() {
        let mut signer = MockSigner::new();
        signer.expect_address().returning(actor);
        signer.expect_sign_typed_data().never();

        let mut auth = MockAuthApi::new();
        auth.expect_challenge().returning(|_| {
            Err(crate::services::graphql_client::GraphqlError::GraphqlResponseError(
                "Rate limited".to_string(),
            ))
        });
        auth.expect_authenticate().never();

        let mut typed = MockTypedDataApi::new();
        typed.expect_create_unfollow_typed_data().never();
        let mut sender = MockTransactionSender::new();
        sender.expect_send().never();

        let orchestrator = orchestrator(signer, auth, typed, sender, indexer(vec![]));

        let err = orchestrator
            .unfollow("0x01", &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, ActionError::Authentication("Rate limited".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_envelope_is_signing_error() {
        let mut signer = MockSigner::new();
        signer.expect_address().returning(actor);
        signer
            .expect_sign_message()
            .returning(|_| Ok("0xsigned".to_string()));
        signer.expect_sign_typed_data().never();

        let mut typed = MockTypedDataApi::new();
        typed.expect_create_follow_typed_data().returning(|_, _| {
            let mut expired = envelope("FollowWithSig", serde_json::json!({ "nonce": 0, "deadline": 1 }));
            expired.expires_at = Some((chrono::Utc::now() - chrono::Duration::minutes(5)).to_rfc3339());
            Ok(expired)
        });
        let mut sender = MockTransactionSender::new();
        sender.expect_send().never();

        let orchestrator = orchestrator(signer, auth_api(), typed, sender, indexer(vec![]));

        let err = orchestrator.follow("0x01", &CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, ActionError::Signing(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_reused_across_actions() {
        let mut typed = MockTypedDataApi::new();
        typed.expect_create_follow_typed_data().times(2).returning(|_, _| {
            Ok(envelope(
                "FollowWithSig",
                serde_json::json!({ "nonce": 0, "deadline": 9999999999u64, "profileIds": ["0x01"], "datas": ["0x"] }),
            ))
        });

        let mut signer = MockSigner::new();
        signer.expect_address().returning(actor);
        signer
            .expect_sign_message()
            .times(1)
            .returning(|_| Ok("0xsigned".to_string()));
        signer
            .expect_sign_typed_data()
            .times(2)
            .returning(|_| Ok(format!("0x{}{}1b", "11".repeat(32), "22".repeat(32))));

        let mut sender = MockTransactionSender::new();
        sender
            .expect_send()
            .times(2)
            .returning(|_| Ok(TransactionHandle::new("0xabc")));

        let orchestrator = orchestrator(
            signer,
            auth_api(),
            typed,
            sender,
            indexer(vec![TxIndexingResult::indexed(), TxIndexingResult::indexed()]),
        );

        let cancel = CancellationToken::new();
        orchestrator.follow("0x01", &cancel).await.unwrap();
        orchestrator.follow("0x01", &cancel).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unfollow_burns_on_verifying_contract() {
        let mut typed = MockTypedDataApi::new();
        typed
            .expect_create_unfollow_typed_data()
            .withf(|_, profile_id| profile_id == "0x01")
            .times(1)
            .returning(|_, _| {
                let mut burn = envelope(
                    "BurnWithSig",
                    serde_json::json!({ "nonce": 0, "deadline": 9999999999u64, "tokenId": "0x07" }),
                );
                burn.typed_data.domain.verifying_contract = Address::from_str(FOLLOW_NFT).unwrap();
                Ok(burn)
            });

        let mut sender = MockTransactionSender::new();
        sender
            .expect_send()
            .withf(|call| {
                call.to == Address::from_str(FOLLOW_NFT).unwrap() && call.entry_point == EntryPoint::BurnWithSig
            })
            .times(1)
            .returning(|_| Ok(TransactionHandle::new("0xburn")));

        let orchestrator = orchestrator(
            signer(true),
            auth_api(),
            typed,
            sender,
            indexer(vec![TxIndexingResult::indexed()]),
        );

        let handle = orchestrator.unfollow("0x01", &CancellationToken::new()).await.unwrap();
        assert_eq!(handle, TransactionHandle::new("0xburn"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_reaches_post_with_sig() {
        let mut typed = MockTypedDataApi::new();
        typed
            .expect_create_post_typed_data()
            .withf(|_, request| request.content_uri == "ipfs://QmHash")
            .times(1)
            .returning(|_, _| {
                Ok(envelope(
                    "PostWithSig",
                    serde_json::json!({
                        "nonce": 0,
                        "deadline": 9999999999u64,
                        "profileId": "0x01",
                        "contentURI": "ipfs://QmHash",
                        "collectModule": "0x5e70ffd2c6d04d65c3abeba64e93082cfa348df8",
                        "collectModuleData": "0x",
                        "referenceModule": "0x0000000000000000000000000000000000000000",
                        "referenceModuleData": "0x"
                    }),
                ))
            });

        let mut sender = MockTransactionSender::new();
        sender
            .expect_send()
            .withf(|call| call.to == hub() && call.entry_point == EntryPoint::PostWithSig && call.gas_limit.is_none())
            .times(1)
            .returning(|_| Ok(TransactionHandle::new("0xpost")));

        let orchestrator = orchestrator(
            signer(true),
            auth_api(),
            typed,
            sender,
            indexer(vec![TxIndexingResult::indexed()]),
        );

        let request = PublishRequest {
            profile_id: "0x01".to_string(),
            content_uri: "ipfs://QmHash".to_string(),
            collect_module: CollectModule::Revert,
            reference_module: ReferenceModule::Open,
        };
        let handle = orchestrator.publish(request, &CancellationToken::new()).await.unwrap();
        assert_eq!(handle, TransactionHandle::new("0xpost"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_indexer_failure_reaches_caller() {
        let mut typed = MockTypedDataApi::new();
        typed.expect_create_follow_typed_data().times(1).returning(|_, _| {
            Ok(envelope(
                "FollowWithSig",
                serde_json::json!({ "nonce": 0, "deadline": 9999999999u64, "profileIds": ["0x01"], "datas": ["0x"] }),
            ))
        });
        let mut sender = MockTransactionSender::new();
        sender
            .expect_send()
            .times(1)
            .returning(|_| Ok(TransactionHandle::new("0xabc")));

        let orchestrator = orchestrator(
            signer(true),
            auth_api(),
            typed,
            sender,
            indexer(vec![TxIndexingResult::pending(), TxIndexingResult::failed("execution reverted")]),
        );

        let err = orchestrator.follow("0x01", &CancellationToken::new()).await.unwrap_err();
        assert_eq!(err, ActionError::IndexingFailure("execution reverted".to_string()));
    }
}
