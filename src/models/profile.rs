use serde::{Deserialize, Serialize};

use crate::models::typed_data::TypedDataEnvelope;

/// `createProfile` union, discriminated by `__typename`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "__typename")]
pub enum RelayOutcome {
    #[serde(rename_all = "camelCase")]
    RelayerResult { tx_hash: String },
    RelayError { reason: String },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileData {
    pub create_profile: RelayOutcome,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFollowTypedDataData {
    pub create_follow_typed_data: TypedDataEnvelope,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUnfollowTypedDataData {
    pub create_unfollow_typed_data: TypedDataEnvelope,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostTypedDataData {
    pub create_post_typed_data: TypedDataEnvelope,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCollectTypedDataData {
    pub create_collect_typed_data: TypedDataEnvelope,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowInfo {
    pub follower_address: String,
    pub profile_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatus {
    pub follower_address: String,
    pub profile_id: String,
    pub follows: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoesFollowData {
    pub does_follow: Vec<FollowStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleCurrency {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub address: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnabledModuleCurrenciesData {
    pub enabled_module_currencies: Vec<ModuleCurrency>,
}

/// Filter for the `profiles` query. The service expects exactly one selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileSelector {
    ProfileIds(Vec<String>),
    Handles(Vec<String>),
    OwnedBy(Vec<String>),
    WhoMirroredPublicationId(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilesRequest {
    #[serde(flatten)]
    pub selector: ProfileSelector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileStats {
    pub total_followers: u64,
    pub total_following: u64,
    pub total_posts: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub handle: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub owned_by: String,
    #[serde(default)]
    pub stats: Option<ProfileStats>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub prev: Option<String>,
    #[serde(default)]
    pub next: Option<String>,
    pub total_count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePage {
    pub items: Vec<Profile>,
    pub page_info: PageInfo,
}

#[derive(Debug, Deserialize)]
pub struct ProfilesData {
    pub profiles: ProfilePage,
}
