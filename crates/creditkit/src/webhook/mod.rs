//! Signing-provider webhook ingestion
//!
//! Inbound protocol handler for events pushed by the signing provider.
//! Every delivery is verified (HMAC-SHA256 over the raw body), validated,
//! correlated against the application's stored signing round and applied
//! through the transition catalog; one audit entry and at most one
//! notification result per event.
//!
//! Replays are deliberately not deduplicated: a re-delivery that would
//! regress the state machine is rejected by the transition check and
//! surfaced to the provider instead of being ack'd as a no-op.

use std::sync::Arc;
use std::time::Duration;

use bitcoin::hashes::{sha256, Hash, HashEngine, Hmac, HmacEngine};
use creditkit_common::application::Signer;
use creditkit_common::util::hex;
use creditkit_common::webhook::{SigningStatus, WebhookAck, WebhookRequest};
use creditkit_common::{state, util, Error, Principal};
use serde_json::json;
use subtle::ConstantTimeEq;
use tokio::time::timeout;
use uuid::Uuid;

use crate::lifecycle::Lifecycle;

/// Default bound on store access inside the webhook critical section
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Webhook protocol handler
///
/// The shared secret is passed explicitly at construction so tests can run
/// with distinct secrets; no ambient configuration is read.
#[derive(Debug)]
pub struct WebhookIngestor {
    lifecycle: Arc<Lifecycle>,
    secret: String,
    operation_timeout: Duration,
}

impl WebhookIngestor {
    /// Create a new [`WebhookIngestor`]
    pub fn new(lifecycle: Arc<Lifecycle>, secret: impl Into<String>) -> Self {
        Self {
            lifecycle,
            secret: secret.into(),
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
        }
    }

    /// Override the store-access timeout
    pub fn with_operation_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    /// Hex HMAC-SHA256 of `payload` under `secret`
    ///
    /// The digest the provider is expected to send in the signature header.
    pub fn sign_payload(secret: &str, payload: &[u8]) -> String {
        let mut engine = HmacEngine::<sha256::Hash>::new(secret.as_bytes());
        engine.input(payload);

        hex::encode(Hmac::<sha256::Hash>::from_engine(engine).to_byte_array())
    }

    /// Verify the signature header against the raw request body
    ///
    /// Operates on the exact bytes the provider signed; re-serialization is
    /// not guaranteed byte-identical. Comparison is constant time.
    pub fn verify_signature(&self, signature: Option<&str>, payload: &[u8]) -> Result<(), Error> {
        let Some(signature) = signature else {
            tracing::warn!("Webhook received without signature header");
            return Err(Error::MissingSignature);
        };

        let supplied = hex::decode(signature.trim()).map_err(|_| {
            tracing::error!("Webhook signature is not valid hex");
            Error::InvalidSignature
        })?;

        let mut engine = HmacEngine::<sha256::Hash>::new(self.secret.as_bytes());
        engine.input(payload);
        let expected = Hmac::<sha256::Hash>::from_engine(engine).to_byte_array();

        if !bool::from(expected.as_slice().ct_eq(supplied.as_slice())) {
            tracing::error!("Invalid webhook signature");
            return Err(Error::InvalidSignature);
        }

        Ok(())
    }

    /// Process one webhook delivery
    ///
    /// Steps short-circuit in order: signature, payload shape, application
    /// resolution, transaction correlation, state transition. Steps after
    /// resolution run inside the per-application lock; the aggregate is
    /// written once, after every check passed. Notification creation after
    /// the write is best effort.
    pub async fn process(
        &self,
        signature: Option<&str>,
        payload: &[u8],
    ) -> Result<WebhookAck, Error> {
        self.verify_signature(signature, payload)?;

        let request: WebhookRequest = serde_json::from_slice(payload).map_err(|err| {
            tracing::error!("Invalid webhook payload: {}", err);
            Error::InvalidPayload(err.to_string())
        })?;

        let solicitud_id =
            Uuid::parse_str(&request.solicitud_id).map_err(|_| Error::InvalidSolicitudId)?;

        let estado: SigningStatus = request
            .estado
            .parse()
            .map_err(|_| Error::UnknownProviderState(request.estado.clone()))?;

        tracing::info!(
            "Processing webhook {} for application {} (transaction {})",
            estado,
            solicitud_id,
            request.transaction_id
        );

        // Critical section: read-validate-mutate-append, serialized per
        // application. Deliveries for other applications are unaffected.
        let _guard = self.lifecycle.lock_application(solicitud_id).await;

        let localstore = self.lifecycle.localstore();

        let mut application = timeout(
            self.operation_timeout,
            localstore.get_application(&solicitud_id),
        )
        .await
        .map_err(|_| Error::Timeout)??
        .ok_or_else(|| {
            tracing::error!("Application {} not found for webhook", solicitud_id);
            Error::ApplicationNotFound
        })?;

        match &application.signing_process {
            None => return Err(state::Error::MissingSigningProcess.into()),
            Some(process) if process.transaction_id != request.transaction_id => {
                tracing::warn!(
                    "Transaction id mismatch for application {}: expected {}, received {}",
                    solicitud_id,
                    process.transaction_id,
                    request.transaction_id
                );
                return Err(state::Error::TransactionIdMismatch {
                    expected: process.transaction_id.clone(),
                    received: request.transaction_id,
                }
                .into());
            }
            Some(_) => {}
        }

        let previous_state = application.state;

        if let Some(target) = estado.target_state() {
            application = application.transition_to(target)?;
        }

        let now = util::unix_time();
        if let Some(process) = application.signing_process.as_mut() {
            process.provider_status = estado;
            process.signers_completed = request.firmantes_completados;
            if !request.firmantes.is_empty() {
                process.signers = request
                    .firmantes
                    .iter()
                    .map(|f| Signer {
                        name: f.name.clone(),
                        email: f.email.clone(),
                        signed: f.signed,
                        signed_at: f.signed_at.clone(),
                    })
                    .collect();
            }
            process.signers_pending =
                (process.signers.len() as u32).saturating_sub(process.signers_completed);
            process.webhook_received_time = Some(now);
            if estado.is_terminal() {
                process.completed_time = Some(now);
            }
        }

        let mut event_payload = json!({
            "transaction_id": request.transaction_id,
            "firmantes_completados": request.firmantes_completados,
        });
        if !request.firmantes.is_empty() {
            event_payload["firmantes"] = json!(request.firmantes);
        }

        application.record_event(
            estado.timeline_event(),
            Principal::firmaplus(),
            Some(event_payload),
        );

        timeout(
            self.operation_timeout,
            localstore.update_application(application.clone()),
        )
        .await
        .map_err(|_| Error::Timeout)??;

        tracing::info!(
            "Webhook {} applied to application {}: {} -> {}",
            estado,
            solicitud_id,
            previous_state,
            application.state
        );

        // The authoritative state change is committed; a notification
        // failure must not fail the request.
        if let Some(kind) = estado.notification_type() {
            let data = json!({
                "solicitud_id": application.id,
                "previous_state": previous_state,
                "new_state": application.state,
                "firmantes_completados": request.firmantes_completados,
            });

            let created = timeout(
                self.operation_timeout,
                self.lifecycle
                    .notifications()
                    .create(application.owner_id, kind, data),
            )
            .await
            .map_err(|_| Error::Timeout)
            .and_then(|result| result);

            if let Err(err) = created {
                tracing::warn!(
                    "Could not create {} notification for application {}: {}",
                    kind,
                    solicitud_id,
                    err
                );
            }
        }

        Ok(WebhookAck {
            procesado: true,
            solicitud_id,
            estado,
            transaction_id: request.transaction_id,
        })
    }
}
