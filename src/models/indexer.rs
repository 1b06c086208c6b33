use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexStatus {
    Pending,
    Indexed,
    Failed(String),
}

impl IndexStatus {
    pub fn label(&self) -> &'static str {
        match self {
            IndexStatus::Pending => "pending",
            IndexStatus::Indexed => "indexed",
            IndexStatus::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct HasTxHashBeenIndexedData {
    #[serde(rename = "hasTxHashBeenIndexed")]
    pub result: TxIndexingResult,
}

/// `hasTxHashBeenIndexed` union, discriminated by `__typename`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum TxIndexingResult {
    #[serde(rename_all = "camelCase")]
    TransactionIndexedResult {
        indexed: bool,
        #[serde(default)]
        tx_receipt: Option<TxReceipt>,
    },
    #[serde(rename_all = "camelCase")]
    TransactionError {
        reason: String,
        #[serde(default)]
        tx_receipt: Option<TxReceipt>,
    },
}

impl TxIndexingResult {
    pub fn status(&self) -> IndexStatus {
        match self {
            TxIndexingResult::TransactionIndexedResult { indexed: true, .. } => IndexStatus::Indexed,
            TxIndexingResult::TransactionIndexedResult { indexed: false, .. } => IndexStatus::Pending,
            TxIndexingResult::TransactionError { reason, .. } => IndexStatus::Failed(reason.clone()),
        }
    }

    pub fn receipt(&self) -> Option<&TxReceipt> {
        match self {
            TxIndexingResult::TransactionIndexedResult { tx_receipt, .. }
            | TxIndexingResult::TransactionError { tx_receipt, .. } => tx_receipt.as_ref(),
        }
    }

    #[cfg(test)]
    pub fn pending() -> Self {
        TxIndexingResult::TransactionIndexedResult {
            indexed: false,
            tx_receipt: None,
        }
    }

    #[cfg(test)]
    pub fn indexed() -> Self {
        TxIndexingResult::TransactionIndexedResult {
            indexed: true,
            tx_receipt: None,
        }
    }

    #[cfg(test)]
    pub fn failed(reason: &str) -> Self {
        TxIndexingResult::TransactionError {
            reason: reason.to_string(),
            tx_receipt: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub status: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionHandle {
    pub hash: String,
}

impl TransactionHandle {
    pub fn new(hash: impl Into<String>) -> Self {
        Self { hash: hash.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexConfirmation {
    pub tx_hash: String,
    pub block_number: Option<u64>,
    pub attempts: u32,
}
