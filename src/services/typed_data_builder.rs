use std::sync::Arc;

use tracing::{debug, error, info};

use crate::{
    errors::{ActionError, ActionResult},
    models::{
        action::{ActionKind, ActionRequest, CreateProfileRequest},
        auth::AuthSession,
        indexer::TransactionHandle,
        profile::RelayOutcome,
        typed_data::TypedDataEnvelope,
    },
    services::relay_api::TypedDataApi,
};

/// Requests action-specific typed data from the relay.
pub struct TypedDataBuilder {
    api: Arc<dyn TypedDataApi>,
}

impl TypedDataBuilder {
    pub fn new(api: Arc<dyn TypedDataApi>) -> Self {
        Self { api }
    }

    pub async fn build_envelope(&self, session: &AuthSession, request: &ActionRequest) -> ActionResult<TypedDataEnvelope> {
        request.validate().map_err(|e| relay_failure(request.kind(), e.to_string()))?;

        let token = session.bearer().to_string();
        let envelope = match request {
            ActionRequest::Follow { profile_id } => {
                self.api.create_follow_typed_data(token, profile_id.clone()).await
            }
            ActionRequest::Unfollow { profile_id } => {
                self.api.create_unfollow_typed_data(token, profile_id.clone()).await
            }
            ActionRequest::Publish(publish) => self.api.create_post_typed_data(token, publish.clone()).await,
            ActionRequest::Collect { publication_id } => {
                self.api.create_collect_typed_data(token, publication_id.clone()).await
            }
            ActionRequest::CreateProfile(_) => {
                return Err(relay_failure(
                    request.kind(),
                    "profile creation is relayed without typed data".to_string(),
                ))
            }
        }
        .map_err(|e| relay_failure(request.kind(), e.reason()))?;

        info!(
            action = %request.kind(),
            envelope_id = %envelope.id,
            expires_at = ?envelope.expires_at,
            "Received typed data envelope"
        );
        debug!(envelope = ?envelope.typed_data, "Envelope contents");

        Ok(envelope)
    }

    /// Relay-backed profile creation. Returns the relayed transaction.
    pub async fn create_profile(
        &self,
        session: &AuthSession,
        request: &CreateProfileRequest,
    ) -> ActionResult<TransactionHandle> {
        let kind = ActionKind::CreateProfile;
        request.validate().map_err(|e| relay_failure(kind, e.to_string()))?;

        let outcome = self
            .api
            .create_profile(session.bearer().to_string(), request.clone())
            .await
            .map_err(|e| relay_failure(kind, e.reason()))?;

        match outcome {
            RelayOutcome::RelayerResult { tx_hash } => {
                info!(handle = %request.handle, tx_hash = %tx_hash, "Profile creation relayed");
                Ok(TransactionHandle::new(tx_hash))
            }
            RelayOutcome::RelayError { reason } => Err(relay_failure(kind, reason)),
        }
    }
}

fn relay_failure(kind: ActionKind, reason: String) -> ActionError {
    error!(action = %kind, reason = %reason, "Relay rejected request");
    ActionError::Relay(reason)
}
