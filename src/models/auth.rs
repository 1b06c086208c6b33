use alloy::primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer credential obtained from a completed challenge/response handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub actor_address: Address,
    pub access_token: String,
    pub refresh_token: String,
    pub issued_at: DateTime<Utc>,
}

impl AuthSession {
    pub fn new(actor_address: Address, tokens: AuthenticationTokens) -> Self {
        Self {
            actor_address,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            issued_at: Utc::now(),
        }
    }

    pub fn bearer(&self) -> &str {
        &self.access_token
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub actor_address: Address,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ChallengeData {
    pub challenge: ChallengeText,
}

#[derive(Debug, Deserialize)]
pub struct ChallengeText {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct AuthenticateData {
    pub authenticate: AuthenticationTokens,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationTokens {
    pub access_token: String,
    pub refresh_token: String,
}
