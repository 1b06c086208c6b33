use std::{collections::HashMap, sync::Arc};

use alloy::primitives::Address;
use tokio::sync::{OnceCell, RwLock};
use tracing::{error, info};

use crate::{
    errors::{ActionError, ActionResult},
    models::auth::{AuthSession, Challenge},
    services::{relay_api::AuthApi, signer::Signer},
};

/// Per-actor bearer sessions.
///
/// Each actor owns a once-cell, so concurrent callers for the same actor wait
/// on a single handshake while different actors never block each other. A
/// failed handshake leaves the cell empty and the next call starts over.
pub struct SessionStore {
    auth_api: Arc<dyn AuthApi>,
    signer: Arc<dyn Signer>,
    sessions: RwLock<HashMap<Address, Arc<OnceCell<AuthSession>>>>,
}

impl SessionStore {
    pub fn new(auth_api: Arc<dyn AuthApi>, signer: Arc<dyn Signer>) -> Self {
        Self {
            auth_api,
            signer,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn ensure_session(&self, actor: Address) -> ActionResult<AuthSession> {
        let cell = self.cell_for(actor).await;
        let session = cell.get_or_try_init(|| self.handshake(actor)).await?;
        Ok(session.clone())
    }

    pub async fn cached(&self, actor: Address) -> Option<AuthSession> {
        let sessions = self.sessions.read().await;
        sessions.get(&actor).and_then(|cell| cell.get().cloned())
    }

    /// Drop the cached session for `actor`; the next action logs in again.
    pub async fn invalidate(&self, actor: Address) -> bool {
        let removed = self.sessions.write().await.remove(&actor);
        let had_session = removed.is_some_and(|cell| cell.initialized());
        if had_session {
            info!(actor = %actor, "Invalidated session");
        }
        had_session
    }

    async fn cell_for(&self, actor: Address) -> Arc<OnceCell<AuthSession>> {
        if let Some(cell) = self.sessions.read().await.get(&actor) {
            return cell.clone();
        }
        self.sessions.write().await.entry(actor).or_default().clone()
    }

    async fn handshake(&self, actor: Address) -> ActionResult<AuthSession> {
        info!(actor = %actor, "Starting challenge/response handshake");

        let challenge = self
            .auth_api
            .challenge(actor)
            .await
            .map(|text| Challenge {
                actor_address: actor,
                text,
            })
            .map_err(|e| auth_failure(actor, e.reason()))?;

        let signature = self
            .signer
            .sign_message(challenge.text)
            .await
            .map_err(|e| auth_failure(actor, e.to_string()))?;

        let tokens = self
            .auth_api
            .authenticate(challenge.actor_address, signature)
            .await
            .map_err(|e| auth_failure(actor, e.reason()))?;

        info!(actor = %actor, "Authenticated");
        Ok(AuthSession::new(actor, tokens))
    }
}

fn auth_failure(actor: Address, reason: String) -> ActionError {
    error!(actor = %actor, reason = %reason, "Authentication failed");
    ActionError::Authentication(reason)
}
