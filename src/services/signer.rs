use std::str::FromStr;

use alloy::{
    dyn_abi::TypedData,
    primitives::Address,
    signers::{local::PrivateKeySigner, Signer as _},
};
use async_trait::async_trait;
use tracing::debug;

use crate::models::typed_data::SigningPayload;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("Invalid private key: {0}")]
    InvalidKey(String),
    #[error("Signing payload rejected: {0}")]
    Payload(String),
    #[error("Signer refused: {0}")]
    Refused(String),
}

pub type SignerResult<T> = Result<T, SignerError>;

/// Wallet capability of the acting account. Signatures are 0x-prefixed hex.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> Address;

    async fn sign_message(&self, message: String) -> SignerResult<String>;

    async fn sign_typed_data(&self, payload: SigningPayload) -> SignerResult<String>;
}

/// [`Signer`] backed by an in-process private key.
#[derive(Clone)]
pub struct LocalWalletSigner {
    inner: PrivateKeySigner,
}

impl LocalWalletSigner {
    pub fn from_private_key(private_key: &str) -> SignerResult<Self> {
        let key = private_key.trim();
        let key = key.strip_prefix("0x").unwrap_or(key);
        let inner = PrivateKeySigner::from_str(key).map_err(|e| SignerError::InvalidKey(e.to_string()))?;
        Ok(Self { inner })
    }

    pub fn wallet(&self) -> PrivateKeySigner {
        self.inner.clone()
    }
}

impl std::fmt::Debug for LocalWalletSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalWalletSigner")
            .field("address", &self.inner.address())
            .finish()
    }
}

#[async_trait]
impl Signer for LocalWalletSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_message(&self, message: String) -> SignerResult<String> {
        let signature = self
            .inner
            .sign_message(message.as_bytes())
            .await
            .map_err(|e| SignerError::Refused(e.to_string()))?;

        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }

    async fn sign_typed_data(&self, payload: SigningPayload) -> SignerResult<String> {
        let json = serde_json::to_value(&payload).map_err(|e| SignerError::Payload(e.to_string()))?;
        let typed_data: TypedData = serde_json::from_value(json).map_err(|e| SignerError::Payload(e.to_string()))?;
        debug!(primary_type = %payload.primary_type, "Signing typed data");

        let signature = self
            .inner
            .sign_dynamic_typed_data(&typed_data)
            .await
            .map_err(|e| SignerError::Refused(e.to_string()))?;

        Ok(format!("0x{}", hex::encode(signature.as_bytes())))
    }
}
