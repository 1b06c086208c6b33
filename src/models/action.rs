use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::utils::eth_address_validator::is_valid_eth_address;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModuleConfigError {
    #[error("no collect module selected")]
    NoModuleSelected,
    #[error("collect modules are mutually exclusive, got: {}", .0.join(", "))]
    ConflictingModules(Vec<String>),
    #[error("{field} is not a valid address: {value}")]
    InvalidAddress { field: &'static str, value: String },
    #[error("amount must be a positive decimal, got {0}")]
    InvalidAmount(String),
    #[error("referral fee must be between 0 and 100, got {0}")]
    InvalidReferralFee(f64),
    #[error("collect limit must be a positive integer, got {0}")]
    InvalidCollectLimit(String),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Follow,
    Unfollow,
    Publish,
    Collect,
    CreateProfile,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Follow => "follow",
            ActionKind::Unfollow => "unfollow",
            ActionKind::Publish => "publish",
            ActionKind::Collect => "collect",
            ActionKind::CreateProfile => "create_profile",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionRequest {
    Follow { profile_id: String },
    Unfollow { profile_id: String },
    Publish(PublishRequest),
    Collect { publication_id: String },
    CreateProfile(CreateProfileRequest),
}

impl ActionRequest {
    pub fn kind(&self) -> ActionKind {
        match self {
            ActionRequest::Follow { .. } => ActionKind::Follow,
            ActionRequest::Unfollow { .. } => ActionKind::Unfollow,
            ActionRequest::Publish(_) => ActionKind::Publish,
            ActionRequest::Collect { .. } => ActionKind::Collect,
            ActionRequest::CreateProfile(_) => ActionKind::CreateProfile,
        }
    }

    pub fn validate(&self) -> Result<(), ModuleConfigError> {
        match self {
            ActionRequest::Follow { profile_id } | ActionRequest::Unfollow { profile_id } => {
                non_empty("profile id", profile_id)
            }
            ActionRequest::Collect { publication_id } => non_empty("publication id", publication_id),
            ActionRequest::Publish(publish) => {
                non_empty("profile id", &publish.profile_id)?;
                non_empty("content uri", &publish.content_uri)?;
                publish.collect_module.validate()
            }
            ActionRequest::CreateProfile(create) => create.validate(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PublishRequest {
    pub profile_id: String,
    pub content_uri: String,
    pub collect_module: CollectModule,
    pub reference_module: ReferenceModule,
}

impl PublishRequest {
    /// Request object for `createPostTypedData`.
    pub fn to_request_value(&self) -> Value {
        json!({
            "profileId": self.profile_id,
            "contentURI": self.content_uri,
            "collectModule": self.collect_module.to_request_value(),
            "referenceModule": self.reference_module.to_request_value(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileRequest {
    pub handle: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture_uri: Option<String>,
    #[serde(rename = "followNFTURI", skip_serializing_if = "Option::is_none")]
    pub follow_nft_uri: Option<String>,
}

impl CreateProfileRequest {
    pub fn validate(&self) -> Result<(), ModuleConfigError> {
        non_empty("handle", &self.handle)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleAmount {
    pub currency: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeCollectParams {
    pub amount: ModuleAmount,
    pub recipient: String,
    pub referral_fee: f64,
    #[serde(default)]
    pub follower_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitedFeeCollectParams {
    pub collect_limit: String,
    pub amount: ModuleAmount,
    pub recipient: String,
    pub referral_fee: f64,
    #[serde(default)]
    pub follower_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeCollectParams {
    #[serde(default)]
    pub follower_only: bool,
}

/// Collect behaviour attached to a publication. Exactly one is active.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectModule {
    Revert,
    Free(FreeCollectParams),
    Fee(FeeCollectParams),
    LimitedFee(LimitedFeeCollectParams),
    TimedFee(FeeCollectParams),
    LimitedTimedFee(LimitedFeeCollectParams),
}

impl CollectModule {
    pub fn request_key(&self) -> &'static str {
        match self {
            CollectModule::Revert => "revertCollectModule",
            CollectModule::Free(_) => "freeCollectModule",
            CollectModule::Fee(_) => "feeCollectModule",
            CollectModule::LimitedFee(_) => "limitedFeeCollectModule",
            CollectModule::TimedFee(_) => "timedFeeCollectModule",
            CollectModule::LimitedTimedFee(_) => "limitedTimedFeeCollectModule",
        }
    }

    pub fn to_request_value(&self) -> Value {
        let params = match self {
            CollectModule::Revert => Value::Bool(true),
            CollectModule::Free(p) => json!(p),
            CollectModule::Fee(p) | CollectModule::TimedFee(p) => json!(p),
            CollectModule::LimitedFee(p) | CollectModule::LimitedTimedFee(p) => json!(p),
        };
        let mut request = serde_json::Map::new();
        request.insert(self.request_key().to_string(), params);
        Value::Object(request)
    }

    pub fn validate(&self) -> Result<(), ModuleConfigError> {
        match self {
            CollectModule::Revert | CollectModule::Free(_) => Ok(()),
            CollectModule::Fee(p) | CollectModule::TimedFee(p) => {
                validate_fee(&p.amount, &p.recipient, p.referral_fee)
            }
            CollectModule::LimitedFee(p) | CollectModule::LimitedTimedFee(p) => {
                match p.collect_limit.parse::<u64>() {
                    Ok(limit) if limit > 0 => {}
                    _ => return Err(ModuleConfigError::InvalidCollectLimit(p.collect_limit.clone())),
                }
                validate_fee(&p.amount, &p.recipient, p.referral_fee)
            }
        }
    }
}

/// Collect module as a record of optional keys, the shape used by JSON input.
/// Converting it into a [`CollectModule`] enforces that exactly one key is set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectModuleRecord {
    pub revert_collect_module: Option<bool>,
    pub free_collect_module: Option<FreeCollectParams>,
    pub fee_collect_module: Option<FeeCollectParams>,
    pub limited_fee_collect_module: Option<LimitedFeeCollectParams>,
    pub timed_fee_collect_module: Option<FeeCollectParams>,
    pub limited_timed_fee_collect_module: Option<LimitedFeeCollectParams>,
}

impl TryFrom<CollectModuleRecord> for CollectModule {
    type Error = ModuleConfigError;

    fn try_from(record: CollectModuleRecord) -> Result<Self, Self::Error> {
        let mut selected = Vec::new();

        if record.revert_collect_module == Some(true) {
            selected.push(CollectModule::Revert);
        }
        if let Some(p) = record.free_collect_module {
            selected.push(CollectModule::Free(p));
        }
        if let Some(p) = record.fee_collect_module {
            selected.push(CollectModule::Fee(p));
        }
        if let Some(p) = record.limited_fee_collect_module {
            selected.push(CollectModule::LimitedFee(p));
        }
        if let Some(p) = record.timed_fee_collect_module {
            selected.push(CollectModule::TimedFee(p));
        }
        if let Some(p) = record.limited_timed_fee_collect_module {
            selected.push(CollectModule::LimitedTimedFee(p));
        }

        match selected.len() {
            0 => Err(ModuleConfigError::NoModuleSelected),
            1 => {
                let module = selected.remove(0);
                module.validate()?;
                Ok(module)
            }
            _ => Err(ModuleConfigError::ConflictingModules(
                selected.iter().map(|m| m.request_key().to_string()).collect(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReferenceModule {
    #[default]
    Open,
    FollowerOnly,
}

impl ReferenceModule {
    pub fn to_request_value(&self) -> Value {
        json!({ "followerOnlyReferenceModule": matches!(self, ReferenceModule::FollowerOnly) })
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ModuleConfigError> {
    if value.trim().is_empty() {
        return Err(ModuleConfigError::Empty(field));
    }
    Ok(())
}

fn validate_fee(amount: &ModuleAmount, recipient: &str, referral_fee: f64) -> Result<(), ModuleConfigError> {
    if !is_valid_eth_address(&amount.currency) {
        return Err(ModuleConfigError::InvalidAddress {
            field: "currency",
            value: amount.currency.clone(),
        });
    }
    if !is_valid_eth_address(recipient) {
        return Err(ModuleConfigError::InvalidAddress {
            field: "recipient",
            value: recipient.to_string(),
        });
    }
    match amount.value.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => {}
        _ => return Err(ModuleConfigError::InvalidAmount(amount.value.clone())),
    }
    if !(0.0..=100.0).contains(&referral_fee) {
        return Err(ModuleConfigError::InvalidReferralFee(referral_fee));
    }
    Ok(())
}
