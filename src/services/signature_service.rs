use std::sync::Arc;

use alloy::primitives::{B256, U256};
use chrono::Utc;
use tracing::{debug, info};

use crate::{
    models::typed_data::{TypedDataEnvelope, TypedDataError},
    services::signer::{Signer, SignerError},
};

#[derive(Debug, thiserror::Error)]
pub enum SigServiceError {
    #[error("Hex decode error: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("Signature must be 64 or 65 bytes, got {0}")]
    InvalidLength(usize),
    #[error("Invalid recovery id: {0}")]
    InvalidRecoveryId(u8),
    #[error("Typed data envelope {0} has expired")]
    Expired(String),
    #[error("Unsignable typed data: {0}")]
    TypedData(#[from] TypedDataError),
    #[error(transparent)]
    Signer(#[from] SignerError),
}

pub type SigServiceResult<T> = Result<T, SigServiceError>;

/// Split signature as consumed by the `*WithSig` entry points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub v: u8,
    pub r: B256,
    pub s: B256,
    pub deadline: U256,
}

pub struct SignatureService {
    signer: Arc<dyn Signer>,
}

impl SignatureService {
    pub fn new(signer: Arc<dyn Signer>) -> Self {
        Self { signer }
    }

    /// Sign the envelope's typed data and split the result.
    pub async fn sign(&self, envelope: &TypedDataEnvelope) -> SigServiceResult<Signature> {
        if envelope.is_expired_at(Utc::now()) {
            return Err(SigServiceError::Expired(envelope.id.clone()));
        }

        let deadline = envelope.typed_data.deadline()?;
        let payload = envelope.typed_data.signing_payload()?;
        debug!(envelope_id = %envelope.id, primary_type = %payload.primary_type, "Built signing payload");

        let raw = self.signer.sign_typed_data(payload).await?;
        let (v, r, s) = Self::split_signature(&raw)?;

        info!(
            envelope_id = %envelope.id,
            v = v,
            deadline = %deadline,
            "SignatureService::sign"
        );

        Ok(Signature { v, r, s, deadline })
    }

    /// Split a hex signature into `(v, r, s)`.
    ///
    /// Accepts the 65-byte `r || s || v` form (v as 0/1 or 27/28) and the
    /// 64-byte EIP-2098 compact form where the top bit of the second word
    /// carries the y-parity. `v` is always returned as 27 or 28.
    pub fn split_signature(signature_hex: &str) -> SigServiceResult<(u8, B256, B256)> {
        let sig_hex = signature_hex.strip_prefix("0x").unwrap_or(signature_hex);
        let bytes = hex::decode(sig_hex)?;

        match bytes.len() {
            65 => {
                let v = match bytes[64] {
                    0 | 1 => bytes[64] + 27,
                    27 | 28 => bytes[64],
                    other => return Err(SigServiceError::InvalidRecoveryId(other)),
                };
                Ok((v, B256::from_slice(&bytes[..32]), B256::from_slice(&bytes[32..64])))
            }
            64 => {
                let mut s = [0u8; 32];
                s.copy_from_slice(&bytes[32..]);
                let y_parity = s[0] >> 7;
                s[0] &= 0x7f;
                Ok((27 + y_parity, B256::from_slice(&bytes[..32]), B256::from(s)))
            }
            other => Err(SigServiceError::InvalidLength(other)),
        }
    }
}
