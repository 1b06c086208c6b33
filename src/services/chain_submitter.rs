use alloy::{
    network::{EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes},
    providers::{DynProvider, Provider, ProviderBuilder},
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    sol,
    sol_types::SolCall,
    transports::{http::reqwest::Url, RpcError, TransportErrorKind},
};
use async_trait::async_trait;
use tracing::{error, info};

use crate::{
    models::{
        action::ActionKind,
        indexer::TransactionHandle,
        typed_data::{
            BurnWithSigValue, CollectWithSigValue, FollowWithSigValue, PostWithSigValue, TypedDataEnvelope,
        },
    },
    services::signature_service::Signature,
};

/// Fixed gas limit for `collectWithSig`.
pub const COLLECT_GAS_LIMIT: u64 = 1_000_000;

sol! {
    struct EIP712Signature {
        uint8 v;
        bytes32 r;
        bytes32 s;
        uint256 deadline;
    }

    struct FollowWithSigData {
        address follower;
        uint256[] profileIds;
        bytes[] datas;
        EIP712Signature sig;
    }

    struct PostWithSigData {
        uint256 profileId;
        string contentURI;
        address collectModule;
        bytes collectModuleInitData;
        address referenceModule;
        bytes referenceModuleInitData;
        EIP712Signature sig;
    }

    struct CollectWithSigData {
        address collector;
        uint256 profileId;
        uint256 pubId;
        bytes data;
        EIP712Signature sig;
    }

    interface ILensHub {
        function followWithSig(FollowWithSigData calldata vars) external returns (uint256[] memory);
        function postWithSig(PostWithSigData calldata vars) external returns (uint256);
        function collectWithSig(CollectWithSigData calldata vars) external returns (uint256);
    }

    interface IFollowNFT {
        function burnWithSig(uint256 tokenId, EIP712Signature calldata sig) external;
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PrepareError {
    #[error("Malformed typed data value: {0}")]
    Value(#[from] serde_json::Error),
    #[error("{0} is not submitted on chain")]
    Unsupported(ActionKind),
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("{0}")]
    Reverted(String),
    #[error("RPC transport error: {0}")]
    Transport(String),
}

impl SubmitError {
    pub fn reason(&self) -> String {
        match self {
            SubmitError::Reverted(reason) | SubmitError::Transport(reason) => reason.clone(),
        }
    }
}

pub type SubmitResult<T> = Result<T, SubmitError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryPoint {
    FollowWithSig,
    BurnWithSig,
    PostWithSig,
    CollectWithSig,
}

impl EntryPoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryPoint::FollowWithSig => "followWithSig",
            EntryPoint::BurnWithSig => "burnWithSig",
            EntryPoint::PostWithSig => "postWithSig",
            EntryPoint::CollectWithSig => "collectWithSig",
        }
    }
}

/// ABI-encoded contract call ready to be sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedCall {
    pub to: Address,
    pub entry_point: EntryPoint,
    pub input: Bytes,
    pub gas_limit: Option<u64>,
}

impl From<&Signature> for EIP712Signature {
    fn from(sig: &Signature) -> Self {
        Self {
            v: sig.v,
            r: sig.r,
            s: sig.s,
            deadline: sig.deadline,
        }
    }
}

/// Map a signed envelope onto its contract entry point.
///
/// Follow, publish and collect go to the hub. Unfollow burns the follow NFT,
/// whose address is the envelope's verifying contract.
pub fn prepare_call(
    kind: ActionKind,
    envelope: &TypedDataEnvelope,
    signature: &Signature,
    sender: Address,
    hub: Address,
) -> Result<PreparedCall, PrepareError> {
    let typed_data = &envelope.typed_data;
    let sig = EIP712Signature::from(signature);

    let call = match kind {
        ActionKind::Follow => {
            let value: FollowWithSigValue = typed_data.decode_value()?;
            let input = ILensHub::followWithSigCall {
                vars: FollowWithSigData {
                    follower: sender,
                    profileIds: value.profile_ids.into_iter().map(|id| id.0).collect(),
                    datas: value.datas,
                    sig,
                },
            }
            .abi_encode();
            PreparedCall {
                to: hub,
                entry_point: EntryPoint::FollowWithSig,
                input: input.into(),
                gas_limit: None,
            }
        }
        ActionKind::Unfollow => {
            let value: BurnWithSigValue = typed_data.decode_value()?;
            let input = IFollowNFT::burnWithSigCall {
                tokenId: value.token_id.0,
                sig,
            }
            .abi_encode();
            PreparedCall {
                to: typed_data.domain.verifying_contract,
                entry_point: EntryPoint::BurnWithSig,
                input: input.into(),
                gas_limit: None,
            }
        }
        ActionKind::Publish => {
            let value: PostWithSigValue = typed_data.decode_value()?;
            let input = ILensHub::postWithSigCall {
                vars: PostWithSigData {
                    profileId: value.profile_id.0,
                    contentURI: value.content_uri,
                    collectModule: value.collect_module,
                    collectModuleInitData: value.collect_module_data,
                    referenceModule: value.reference_module,
                    referenceModuleInitData: value.reference_module_data,
                    sig,
                },
            }
            .abi_encode();
            PreparedCall {
                to: hub,
                entry_point: EntryPoint::PostWithSig,
                input: input.into(),
                gas_limit: None,
            }
        }
        ActionKind::Collect => {
            let value: CollectWithSigValue = typed_data.decode_value()?;
            let input = ILensHub::collectWithSigCall {
                vars: CollectWithSigData {
                    collector: sender,
                    profileId: value.profile_id.0,
                    pubId: value.pub_id.0,
                    data: value.data,
                    sig,
                },
            }
            .abi_encode();
            PreparedCall {
                to: hub,
                entry_point: EntryPoint::CollectWithSig,
                input: input.into(),
                gas_limit: Some(COLLECT_GAS_LIMIT),
            }
        }
        ActionKind::CreateProfile => return Err(PrepareError::Unsupported(kind)),
    };

    Ok(call)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransactionSender: Send + Sync {
    async fn send(&self, call: PreparedCall) -> SubmitResult<TransactionHandle>;
}

/// Sends prepared calls from the local wallet over JSON-RPC.
pub struct ProviderTransactionSender {
    provider: DynProvider,
    from: Address,
}

impl ProviderTransactionSender {
    pub fn connect(rpc_url: &str, wallet: PrivateKeySigner) -> SubmitResult<Self> {
        let url: Url = rpc_url
            .parse()
            .map_err(|e| SubmitError::Transport(format!("invalid RPC url {}: {}", rpc_url, e)))?;
        let from = wallet.address();

        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(wallet))
            .connect_http(url)
            .erased();

        info!(rpc_url = %rpc_url, from = %from, "Connected chain provider");
        Ok(Self { provider, from })
    }
}

#[async_trait]
impl TransactionSender for ProviderTransactionSender {
    async fn send(&self, call: PreparedCall) -> SubmitResult<TransactionHandle> {
        let mut tx = TransactionRequest::default()
            .with_from(self.from)
            .with_to(call.to)
            .with_input(call.input);
        if let Some(gas_limit) = call.gas_limit {
            tx = tx.with_gas_limit(gas_limit);
        }

        let pending = self.provider.send_transaction(tx).await.map_err(|e| {
            let err = classify_rpc_error(e);
            error!(entry_point = call.entry_point.as_str(), to = %call.to, error = %err, "Transaction rejected");
            err
        })?;

        let hash = pending.tx_hash().to_string();
        info!(entry_point = call.entry_point.as_str(), to = %call.to, tx_hash = %hash, "Transaction sent");
        Ok(TransactionHandle::new(hash))
    }
}

fn classify_rpc_error(error: RpcError<TransportErrorKind>) -> SubmitError {
    match error.as_error_resp() {
        Some(payload) => SubmitError::Reverted(payload.message.to_string()),
        None => SubmitError::Transport(error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::{B256, U256};
    use std::str::FromStr;

    const HUB: &str = "0x60Ae865ee4C725cd04353b5AAb364553f56ceF82";

    fn envelope(verifying_contract: &str, primary: &str, value: serde_json::Value) -> TypedDataEnvelope {
        serde_json::from_value(serde_json::json!({
            "id": "e1",
            "typedData": {
                "domain": {
                    "name": "Lens Protocol",
                    "chainId": 80001,
                    "version": "1",
                    "verifyingContract": verifying_contract
                },
                "types": { primary: [] },
                "value": value
            }
        }))
        .unwrap()
    }

    fn signature() -> Signature {
        Signature {
            v: 28,
            r: B256::repeat_byte(0x11),
            s: B256::repeat_byte(0x22),
            deadline: U256::from(9_999_999_999u64),
        }
    }

    fn hub() -> Address {
        Address::from_str(HUB).unwrap()
    }

    #[test]
    fn test_follow_targets_hub_with_sender_as_follower() {
        let sender = Address::repeat_byte(0xaa);
        let envelope = envelope(
            HUB,
            "FollowWithSig",
            serde_json::json!({ "nonce": 0, "deadline": 9999999999u64, "profileIds": ["0x01"], "datas": ["0x"] }),
        );

        let call = prepare_call(ActionKind::Follow, &envelope, &signature(), sender, hub()).unwrap();
        assert_eq!(call.to, hub());
        assert_eq!(call.entry_point, EntryPoint::FollowWithSig);
        assert_eq!(call.gas_limit, None);

        let decoded = ILensHub::followWithSigCall::abi_decode(&call.input).unwrap();
        assert_eq!(decoded.vars.follower, sender);
        assert_eq!(decoded.vars.profileIds, vec![U256::from(1u64)]);
        assert_eq!(decoded.vars.sig.v, 28);
        assert_eq!(decoded.vars.sig.deadline, U256::from(9_999_999_999u64));
    }

    #[test]
    fn test_unfollow_targets_envelope_verifying_contract() {
        let first_nft = "0x1111111111111111111111111111111111111111";
        let second_nft = "0x2222222222222222222222222222222222222222";
        let value = serde_json::json!({ "nonce": 0, "deadline": 1, "tokenId": "7" });

        let first = prepare_call(
            ActionKind::Unfollow,
            &envelope(first_nft, "BurnWithSig", value.clone()),
            &signature(),
            Address::ZERO,
            hub(),
        )
        .unwrap();
        let second = prepare_call(
            ActionKind::Unfollow,
            &envelope(second_nft, "BurnWithSig", value),
            &signature(),
            Address::ZERO,
            hub(),
        )
        .unwrap();

        assert_eq!(first.to, Address::from_str(first_nft).unwrap());
        assert_eq!(second.to, Address::from_str(second_nft).unwrap());
        assert_ne!(first.to, second.to);
        assert_eq!(first.entry_point, EntryPoint::BurnWithSig);

        let decoded = IFollowNFT::burnWithSigCall::abi_decode(&first.input).unwrap();
        assert_eq!(decoded.tokenId, U256::from(7u64));
    }

    #[test]
    fn test_collect_uses_fixed_gas_limit() {
        let sender = Address::repeat_byte(0xbb);
        let envelope = envelope(
            HUB,
            "CollectWithSig",
            serde_json::json!({ "nonce": 0, "deadline": 1, "profileId": "0x01", "pubId": "0x02", "data": "0x" }),
        );

        let call = prepare_call(ActionKind::Collect, &envelope, &signature(), sender, hub()).unwrap();
        assert_eq!(call.gas_limit, Some(COLLECT_GAS_LIMIT));

        let decoded = ILensHub::collectWithSigCall::abi_decode(&call.input).unwrap();
        assert_eq!(decoded.vars.collector, sender);
        assert_eq!(decoded.vars.pubId, U256::from(2u64));
    }

    #[test]
    fn test_post_maps_module_fields() {
        let collect_module = "0x0BE6bD7092ee83D44a6eC1D949626FeE48caB30c";
        let envelope = envelope(
            HUB,
            "PostWithSig",
            serde_json::json!({
                "nonce": 0,
                "deadline": 1,
                "profileId": "0x01",
                "contentURI": "ipfs://QmHash",
                "collectModule": collect_module,
                "collectModuleData": "0x",
                "referenceModule": "0x0000000000000000000000000000000000000000",
                "referenceModuleData": "0x"
            }),
        );

        let call = prepare_call(ActionKind::Publish, &envelope, &signature(), Address::ZERO, hub()).unwrap();
        let decoded = ILensHub::postWithSigCall::abi_decode(&call.input).unwrap();
        assert_eq!(decoded.vars.contentURI, "ipfs://QmHash");
        assert_eq!(decoded.vars.collectModule, Address::from_str(collect_module).unwrap());
    }

    #[test]
    fn test_malformed_value_is_rejected() {
        let envelope = envelope(HUB, "FollowWithSig", serde_json::json!({ "deadline": 1 }));
        let err = prepare_call(ActionKind::Follow, &envelope, &signature(), Address::ZERO, hub()).unwrap_err();
        assert!(matches!(err, PrepareError::Value(_)));
    }

    #[test]
    fn test_create_profile_has_no_entry_point() {
        let envelope = envelope(HUB, "FollowWithSig", serde_json::json!({ "deadline": 1 }));
        let err = prepare_call(ActionKind::CreateProfile, &envelope, &signature(), Address::ZERO, hub()).unwrap_err();
        assert!(matches!(err, PrepareError::Unsupported(ActionKind::CreateProfile)));
    }
}
