//! Webhook ingestion protocol tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use creditkit::database::MemoryDatabase;
use creditkit::{ApplicationState, Lifecycle, Principal, WebhookIngestor};
use creditkit_common::application::{CreditApplication, GeneratedDocument, Signer};
use creditkit_common::database::{self, Database};
use creditkit_common::webhook::SigningStatus;
use creditkit_common::{state, Error, Notification, NotificationType, Postulation, SYSTEM_FIRMAPLUS};
use serde_json::json;
use uuid::Uuid;

const SECRET: &str = "test_secret";
const TRANSACTION_ID: &str = "test-123";

fn signers() -> Vec<Signer> {
    vec![
        Signer {
            name: "Juan Pérez".to_string(),
            email: "juan@example.com".to_string(),
            signed: false,
            signed_at: None,
        },
        Signer {
            name: "María García".to_string(),
            email: "maria@example.com".to_string(),
            signed: false,
            signed_at: None,
        },
    ]
}

/// Application in PENDING_SIGNATURE with an open signing round
async fn setup() -> (Arc<Lifecycle>, WebhookIngestor, CreditApplication) {
    let lifecycle = Arc::new(Lifecycle::new(Arc::new(MemoryDatabase::new())));
    let ingestor = WebhookIngestor::new(Arc::clone(&lifecycle), SECRET);

    let owner_id = Uuid::new_v4();
    let application = lifecycle
        .submit_application(owner_id)
        .await
        .expect("submit");
    lifecycle
        .transition_application(
            &application.id,
            ApplicationState::DocumentsUploaded,
            Principal::User(owner_id),
        )
        .await
        .expect("documents uploaded");
    let application = lifecycle
        .start_signing(
            &application.id,
            TRANSACTION_ID,
            signers(),
            Principal::User(owner_id),
        )
        .await
        .expect("start signing");

    (lifecycle, ingestor, application)
}

fn event_body(solicitud_id: &str, estado: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "transaction_id": TRANSACTION_ID,
        "solicitud_id": solicitud_id,
        "estado": estado,
        "firmantes_completados": 2,
        "firmantes": [
            {"nombre": "Juan Pérez", "email": "juan@example.com", "firmado": true, "fecha_firma": "2026-02-10T14:00:00Z"},
            {"nombre": "María García", "email": "maria@example.com", "firmado": true, "fecha_firma": "2026-02-10T14:05:00Z"}
        ]
    }))
    .expect("serialize")
}

fn sign(body: &[u8]) -> String {
    WebhookIngestor::sign_payload(SECRET, body)
}

#[tokio::test]
async fn rejects_missing_signature() {
    let (_, ingestor, application) = setup().await;
    let body = event_body(&application.id.to_string(), "FIRMADO");

    let err = ingestor.process(None, &body).await.expect_err("no header");
    assert!(matches!(err, Error::MissingSignature));
    assert_eq!(
        err.to_string(),
        "Missing signature header (X-Signature or X-Webhook-Signature)"
    );
}

#[tokio::test]
async fn rejects_signature_over_different_payload() {
    let (_, ingestor, application) = setup().await;
    let body = event_body(&application.id.to_string(), "FIRMADO");
    let other = event_body(&application.id.to_string(), "RECHAZADO");

    let err = ingestor
        .process(Some(&sign(&other)), &body)
        .await
        .expect_err("wrong signature");
    assert!(matches!(err, Error::InvalidSignature));
    assert_eq!(err.to_string(), "Invalid signature");
}

#[tokio::test]
async fn rejects_payload_missing_solicitud_id() {
    let (_, ingestor, _) = setup().await;
    let body = serde_json::to_vec(&json!({
        "transaction_id": TRANSACTION_ID,
        "estado": "FIRMADO",
        "firmantes_completados": 2
    }))
    .expect("serialize");

    // Valid HMAC over the actual sent body; the payload itself is bad.
    let err = ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect_err("missing field");
    assert!(matches!(err, Error::InvalidPayload(_)));
}

#[tokio::test]
async fn rejects_malformed_solicitud_id() {
    let (_, ingestor, _) = setup().await;
    let body = event_body("not-a-uuid", "FIRMADO");

    let err = ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect_err("bad uuid");
    assert!(matches!(err, Error::InvalidSolicitudId));
}

#[tokio::test]
async fn rejects_unrecognized_estado() {
    let (_, ingestor, application) = setup().await;
    let body = event_body(&application.id.to_string(), "ESTADO_INVALIDO");

    let err = ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect_err("unknown estado");
    assert!(matches!(err, Error::UnknownProviderState(_)));
}

#[tokio::test]
async fn rejects_unknown_application() {
    let (_, ingestor, _) = setup().await;
    let body = event_body(&Uuid::new_v4().to_string(), "FIRMADO");

    let err = ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect_err("unknown application");
    assert!(matches!(err, Error::ApplicationNotFound));
}

#[tokio::test]
async fn firmado_advances_to_signed_with_audit_and_notification() {
    let (lifecycle, ingestor, application) = setup().await;
    let body = event_body(&application.id.to_string(), "FIRMADO");

    let ack = ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect("valid delivery");

    assert!(ack.procesado);
    assert_eq!(ack.solicitud_id, application.id);
    assert_eq!(ack.estado, SigningStatus::Firmado);
    assert_eq!(ack.transaction_id, TRANSACTION_ID);

    let stored = lifecycle
        .get_application(&application.id)
        .await
        .expect("stored");
    assert_eq!(stored.state, ApplicationState::Signed);

    let process = stored.signing_process.expect("signing round");
    assert_eq!(process.provider_status, SigningStatus::Firmado);
    assert_eq!(process.signers_completed, 2);
    assert_eq!(process.signers_pending, 0);
    assert!(process.signers.iter().all(|s| s.signed));
    assert!(process.completed_time.is_some());

    let webhook_entries: Vec<_> = stored
        .timeline
        .iter()
        .filter(|e| e.event == "WEBHOOK_FIRMADO")
        .collect();
    assert_eq!(webhook_entries.len(), 1);
    assert_eq!(webhook_entries[0].principal.to_string(), SYSTEM_FIRMAPLUS);
    let payload = webhook_entries[0].payload.as_ref().expect("payload");
    assert_eq!(payload["transaction_id"], TRANSACTION_ID);
    assert_eq!(payload["firmantes"].as_array().expect("signers").len(), 2);

    let notifications = lifecycle
        .notifications()
        .list(&application.owner_id, false)
        .await
        .expect("list");
    let completadas: Vec<_> = notifications
        .iter()
        .filter(|n| n.kind == NotificationType::FirmaCompletada)
        .collect();
    assert_eq!(completadas.len(), 1);
    assert!(!completadas[0].is_read());
    assert_eq!(completadas[0].data["new_state"], json!("SIGNED"));
}

#[tokio::test]
async fn rechazado_moves_application_to_rejected() {
    let (lifecycle, ingestor, application) = setup().await;
    let body = event_body(&application.id.to_string(), "RECHAZADO");

    ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect("valid delivery");

    let stored = lifecycle
        .get_application(&application.id)
        .await
        .expect("stored");
    assert_eq!(stored.state, ApplicationState::Rejected);
    assert_eq!(
        stored.timeline.last().expect("entry").event,
        "WEBHOOK_RECHAZADO"
    );

    let unread = lifecycle
        .notifications()
        .list(&application.owner_id, true)
        .await
        .expect("list");
    assert!(unread
        .iter()
        .any(|n| n.kind == NotificationType::FirmaRechazada));
}

#[tokio::test]
async fn expirado_terminates_as_withdrawn() {
    let (lifecycle, ingestor, application) = setup().await;
    let body = event_body(&application.id.to_string(), "EXPIRADO");

    ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect("valid delivery");

    let stored = lifecycle
        .get_application(&application.id)
        .await
        .expect("stored");
    assert_eq!(stored.state, ApplicationState::Withdrawn);
    assert_eq!(
        stored.timeline.last().expect("entry").event,
        "WEBHOOK_EXPIRADO"
    );

    let notifications = lifecycle
        .notifications()
        .list(&application.owner_id, false)
        .await
        .expect("list");
    assert!(notifications
        .iter()
        .any(|n| n.kind == NotificationType::FirmaExpirada));
}

#[tokio::test]
async fn pendiente_firmado_is_a_progress_report() {
    let (lifecycle, ingestor, application) = setup().await;
    let body = serde_json::to_vec(&json!({
        "transaction_id": TRANSACTION_ID,
        "solicitud_id": application.id,
        "estado": "PENDIENTE_FIRMADO",
        "firmantes_completados": 1
    }))
    .expect("serialize");

    let notifications_before = lifecycle
        .notifications()
        .list(&application.owner_id, false)
        .await
        .expect("list")
        .len();

    let ack = ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect("progress event");
    assert!(ack.procesado);

    let stored = lifecycle
        .get_application(&application.id)
        .await
        .expect("stored");
    // No state transition, but progress and audit are recorded.
    assert_eq!(stored.state, ApplicationState::PendingSignature);
    let process = stored.signing_process.expect("signing round");
    assert_eq!(process.signers_completed, 1);
    assert_eq!(process.signers_pending, 1);
    assert!(process.completed_time.is_none());
    assert_eq!(
        stored.timeline.last().expect("entry").event,
        "WEBHOOK_PENDIENTE_FIRMADO"
    );

    let notifications_after = lifecycle
        .notifications()
        .list(&application.owner_id, false)
        .await
        .expect("list")
        .len();
    assert_eq!(notifications_before, notifications_after);
}

#[tokio::test]
async fn rejects_transaction_id_mismatch_without_mutation() {
    let (lifecycle, ingestor, application) = setup().await;
    let body = serde_json::to_vec(&json!({
        "transaction_id": "stale-999",
        "solicitud_id": application.id,
        "estado": "FIRMADO",
        "firmantes_completados": 2
    }))
    .expect("serialize");

    let before = lifecycle
        .get_application(&application.id)
        .await
        .expect("stored");

    let err = ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect_err("stale transaction");
    match err {
        Error::State(state::Error::TransactionIdMismatch { expected, received }) => {
            assert_eq!(expected, TRANSACTION_ID);
            assert_eq!(received, "stale-999");
        }
        other => panic!("unexpected error: {other}"),
    }

    let after = lifecycle
        .get_application(&application.id)
        .await
        .expect("stored");
    assert_eq!(before, after);
}

#[tokio::test]
async fn rejects_event_without_signing_round() {
    let lifecycle = Arc::new(Lifecycle::new(Arc::new(MemoryDatabase::new())));
    let ingestor = WebhookIngestor::new(Arc::clone(&lifecycle), SECRET);

    let application = lifecycle
        .submit_application(Uuid::new_v4())
        .await
        .expect("submit");
    let body = event_body(&application.id.to_string(), "FIRMADO");

    let err = ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect_err("no round started");
    assert!(matches!(
        err,
        Error::State(state::Error::MissingSigningProcess)
    ));
}

#[tokio::test]
async fn replay_after_finalized_is_rejected_without_side_effects() {
    let (lifecycle, ingestor, application) = setup().await;
    let body = event_body(&application.id.to_string(), "FIRMADO");

    ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect("first delivery");

    // Drive the application to its terminal state.
    let admin = Principal::System("ADMIN".to_string());
    for target in [
        ApplicationState::SentForApproval,
        ApplicationState::Approved,
        ApplicationState::Finalized,
    ] {
        lifecycle
            .transition_application(&application.id, target, admin.clone())
            .await
            .expect("legal transition");
    }

    let before = lifecycle
        .get_application(&application.id)
        .await
        .expect("stored");
    let notifications_before = lifecycle
        .notifications()
        .list(&application.owner_id, false)
        .await
        .expect("list")
        .len();

    // Re-delivery of the same event must be rejected by the state machine,
    // not ack'd as a duplicate no-op.
    let err = ingestor
        .process(Some(&sign(&body)), &body)
        .await
        .expect_err("replay");
    assert!(matches!(
        err,
        Error::State(state::Error::InvalidTransition(
            ApplicationState::Finalized,
            ApplicationState::Signed
        ))
    ));

    let after = lifecycle
        .get_application(&application.id)
        .await
        .expect("stored");
    assert_eq!(before.timeline.len(), after.timeline.len());
    assert_eq!(after.state, ApplicationState::Finalized);

    let notifications_after = lifecycle
        .notifications()
        .list(&application.owner_id, false)
        .await
        .expect("list")
        .len();
    assert_eq!(notifications_before, notifications_after);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn racing_deliveries_for_one_application_serialize() {
    let (lifecycle, ingestor, application) = setup().await;
    let body = event_body(&application.id.to_string(), "FIRMADO");
    let signature = sign(&body);

    let (first, second) = tokio::join!(
        ingestor.process(Some(&signature), &body),
        ingestor.process(Some(&signature), &body)
    );

    // Exactly one wins; the loser sees the already-advanced state.
    assert_eq!(
        u32::from(first.is_ok()) + u32::from(second.is_ok()),
        1,
        "exactly one delivery must succeed"
    );

    let stored = lifecycle
        .get_application(&application.id)
        .await
        .expect("stored");
    assert_eq!(stored.state, ApplicationState::Signed);
    assert_eq!(
        stored
            .timeline
            .iter()
            .filter(|e| e.event == "WEBHOOK_FIRMADO")
            .count(),
        1
    );
}

/// Store whose notification writes never resolve
#[derive(Debug, Default)]
struct StalledNotificationStore {
    inner: MemoryDatabase,
}

#[async_trait]
impl Database for StalledNotificationStore {
    type Err = database::Error;

    async fn add_application(&self, application: CreditApplication) -> Result<(), Self::Err> {
        self.inner.add_application(application).await
    }

    async fn get_application(
        &self,
        id: &Uuid,
    ) -> Result<Option<CreditApplication>, Self::Err> {
        self.inner.get_application(id).await
    }

    async fn update_application(&self, application: CreditApplication) -> Result<(), Self::Err> {
        self.inner.update_application(application).await
    }

    async fn add_postulation(&self, postulation: Postulation) -> Result<(), Self::Err> {
        self.inner.add_postulation(postulation).await
    }

    async fn get_postulation(&self, id: &Uuid) -> Result<Option<Postulation>, Self::Err> {
        self.inner.get_postulation(id).await
    }

    async fn update_postulation(&self, postulation: Postulation) -> Result<(), Self::Err> {
        self.inner.update_postulation(postulation).await
    }

    async fn add_notification(&self, _notification: Notification) -> Result<(), Self::Err> {
        std::future::pending::<Result<(), Self::Err>>().await
    }

    async fn get_notification(&self, id: &Uuid) -> Result<Option<Notification>, Self::Err> {
        self.inner.get_notification(id).await
    }

    async fn get_notifications(
        &self,
        recipient_id: &Uuid,
    ) -> Result<Vec<Notification>, Self::Err> {
        self.inner.get_notifications(recipient_id).await
    }

    async fn update_notification(&self, notification: Notification) -> Result<(), Self::Err> {
        self.inner.update_notification(notification).await
    }

    async fn remove_notification(&self, id: &Uuid) -> Result<(), Self::Err> {
        self.inner.remove_notification(id).await
    }
}

#[tokio::test]
async fn stalled_notification_backend_does_not_hang_delivery() {
    let lifecycle = Arc::new(Lifecycle::new(Arc::new(StalledNotificationStore::default())));
    let ingestor = WebhookIngestor::new(Arc::clone(&lifecycle), SECRET)
        .with_operation_timeout(Duration::from_millis(50));

    // Set up through the paths that raise no notifications; the store above
    // never completes a notification write.
    let owner_id = Uuid::new_v4();
    let application = lifecycle
        .submit_application(owner_id)
        .await
        .expect("submit");
    lifecycle
        .attach_document(
            &application.id,
            GeneratedDocument {
                path: "contracts/2026/solicitud.pdf".to_string(),
                filename: "solicitud.pdf".to_string(),
                generated_time: 1_760_000_000,
            },
            Principal::User(owner_id),
        )
        .await
        .expect("attach");
    let application = lifecycle
        .start_signing(
            &application.id,
            TRANSACTION_ID,
            signers(),
            Principal::User(owner_id),
        )
        .await
        .expect("start signing");

    let body = event_body(&application.id.to_string(), "FIRMADO");
    let ack = tokio::time::timeout(
        Duration::from_secs(5),
        ingestor.process(Some(&sign(&body)), &body),
    )
    .await
    .expect("delivery must not hang on the notification write")
    .expect("delivery succeeds");
    assert!(ack.procesado);

    // The aggregate write committed; the stalled notification is dropped.
    let stored = lifecycle
        .get_application(&application.id)
        .await
        .expect("stored");
    assert_eq!(stored.state, ApplicationState::Signed);
    assert_eq!(
        stored.timeline.last().expect("entry").event,
        "WEBHOOK_FIRMADO"
    );
}

#[tokio::test]
async fn deliveries_for_different_applications_are_independent() {
    let (lifecycle, ingestor, first) = setup().await;

    let owner_id = Uuid::new_v4();
    let second = lifecycle
        .submit_application(owner_id)
        .await
        .expect("submit");
    lifecycle
        .transition_application(
            &second.id,
            ApplicationState::DocumentsUploaded,
            Principal::User(owner_id),
        )
        .await
        .expect("documents uploaded");
    lifecycle
        .start_signing(&second.id, TRANSACTION_ID, signers(), Principal::User(owner_id))
        .await
        .expect("start signing");

    let body_a = event_body(&first.id.to_string(), "FIRMADO");
    let body_b = event_body(&second.id.to_string(), "RECHAZADO");

    let sig_a = sign(&body_a);
    let sig_b = sign(&body_b);
    let (a, b) = tokio::join!(
        ingestor.process(Some(&sig_a), &body_a),
        ingestor.process(Some(&sig_b), &body_b)
    );
    a.expect("first application");
    b.expect("second application");

    assert_eq!(
        lifecycle
            .get_application(&first.id)
            .await
            .expect("stored")
            .state,
        ApplicationState::Signed
    );
    assert_eq!(
        lifecycle
            .get_application(&second.id)
            .await
            .expect("stored")
            .state,
        ApplicationState::Rejected
    );
}
