//! Application lifecycle service
//!
//! All mutations of an application's state go through this service (or the
//! webhook ingestor, which shares its per-application locks); both consult
//! the transition catalog before writing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use creditkit_common::application::{GeneratedDocument, Signer, SigningProcess};
use creditkit_common::database::{self, Database};
use creditkit_common::state::{ApplicationState, PostulationState};
use creditkit_common::{
    CreditApplication, Error, NotificationType, Postulation, Principal,
};
use serde_json::json;
use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::notification::NotificationService;

/// Localstore type held by the engine
pub type LocalStore = Arc<dyn Database<Err = database::Error> + Send + Sync>;

/// Per-application locks serializing read-modify-write sequences
///
/// Rows must be locked before modification so that concurrent mutators for
/// the same application never interleave; mutators for different
/// applications proceed in parallel.
#[derive(Debug, Default)]
pub(crate) struct RowLocks {
    inner: Mutex<HashMap<Uuid, Arc<tokio::sync::Mutex<()>>>>,
}

impl RowLocks {
    pub(crate) async fn lock(&self, id: Uuid) -> OwnedMutexGuard<()> {
        let row = {
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            // A row nobody holds or waits on has a single strong reference;
            // evict those so the map is bounded by concurrent lockers.
            map.retain(|_, row| Arc::strong_count(row) > 1);
            map.entry(id).or_default().clone()
        };

        row.lock_owned().await
    }
}

/// Credit application lifecycle service
#[derive(Debug)]
pub struct Lifecycle {
    localstore: LocalStore,
    notifications: NotificationService,
    locks: RowLocks,
}

impl Lifecycle {
    /// Create a new [`Lifecycle`] over the given store
    pub fn new(localstore: LocalStore) -> Self {
        let notifications = NotificationService::new(Arc::clone(&localstore));
        Self {
            localstore,
            notifications,
            locks: RowLocks::default(),
        }
    }

    /// Notification sink used for lifecycle events
    pub fn notifications(&self) -> &NotificationService {
        &self.notifications
    }

    pub(crate) fn localstore(&self) -> &LocalStore {
        &self.localstore
    }

    /// Acquire the mutation lock for one application
    pub(crate) async fn lock_application(&self, id: Uuid) -> OwnedMutexGuard<()> {
        self.locks.lock(id).await
    }

    /// Create a new application in `SUBMITTED`
    pub async fn submit_application(&self, owner_id: Uuid) -> Result<CreditApplication, Error> {
        let mut application = CreditApplication::new(owner_id);
        application.record_event("APPLICATION_SUBMITTED", Principal::User(owner_id), None);

        self.localstore.add_application(application.clone()).await?;

        tracing::info!(
            "Application {} submitted by {}",
            application.id,
            owner_id
        );

        Ok(application)
    }

    /// Look up an application
    pub async fn get_application(&self, id: &Uuid) -> Result<CreditApplication, Error> {
        self.localstore
            .get_application(id)
            .await?
            .ok_or(Error::ApplicationNotFound)
    }

    /// Apply a validator-gated state transition
    ///
    /// Appends a `STATE_CHANGED` audit entry and raises an
    /// `estado_actualizado` notification to the owner (best effort).
    pub async fn transition_application(
        &self,
        id: &Uuid,
        new_state: ApplicationState,
        principal: Principal,
    ) -> Result<CreditApplication, Error> {
        let _guard = self.lock_application(*id).await;

        let application = self.get_application(id).await?;
        let previous_state = application.state;

        let mut application = application.transition_to(new_state)?;
        application.record_event(
            "STATE_CHANGED",
            principal,
            Some(json!({
                "from": previous_state,
                "to": new_state,
            })),
        );

        self.localstore.update_application(application.clone()).await?;

        tracing::info!(
            "Application {} transitioned {} -> {}",
            id,
            previous_state,
            new_state
        );

        if let Err(err) = self
            .notifications
            .create(
                application.owner_id,
                NotificationType::EstadoActualizado,
                json!({
                    "solicitud_id": application.id,
                    "previous_state": previous_state,
                    "new_state": new_state,
                }),
            )
            .await
        {
            tracing::warn!("Could not create state-change notification: {}", err);
        }

        Ok(application)
    }

    /// Record the generated document for an application
    ///
    /// Moves `SUBMITTED` applications to `DOCUMENTS_UPLOADED`.
    pub async fn attach_document(
        &self,
        id: &Uuid,
        document: GeneratedDocument,
        principal: Principal,
    ) -> Result<CreditApplication, Error> {
        let _guard = self.lock_application(*id).await;

        let mut application = self.get_application(id).await?;

        if application.state == ApplicationState::Submitted {
            application = application.transition_to(ApplicationState::DocumentsUploaded)?;
        }

        application.record_event(
            "DOCUMENT_ATTACHED",
            principal,
            Some(json!({ "filename": document.filename })),
        );
        application.generated_document = Some(document);

        self.localstore.update_application(application.clone()).await?;

        Ok(application)
    }

    /// Start a signing round with the external provider
    ///
    /// Moves the application to `PENDING_SIGNATURE` and installs the
    /// [`SigningProcess`] record the webhook later correlates against.
    pub async fn start_signing(
        &self,
        id: &Uuid,
        transaction_id: &str,
        signers: Vec<Signer>,
        principal: Principal,
    ) -> Result<CreditApplication, Error> {
        let _guard = self.lock_application(*id).await;

        let application = self.get_application(id).await?;
        let mut application = application.transition_to(ApplicationState::PendingSignature)?;

        let process = SigningProcess::new(transaction_id, signers);
        application.record_event(
            "SIGNING_STARTED",
            principal,
            Some(json!({
                "transaction_id": transaction_id,
                "num_signers": process.signers.len(),
            })),
        );
        application.signing_process = Some(process);

        self.localstore.update_application(application.clone()).await?;

        tracing::info!(
            "Signing round {} started for application {}",
            transaction_id,
            id
        );

        Ok(application)
    }

    /// Create a new postulation in `POSTULATED`
    pub async fn submit_postulation(&self, owner_id: Uuid) -> Result<Postulation, Error> {
        let postulation = Postulation::new(owner_id);
        self.localstore.add_postulation(postulation.clone()).await?;

        Ok(postulation)
    }

    /// Look up a postulation
    pub async fn get_postulation(&self, id: &Uuid) -> Result<Postulation, Error> {
        self.localstore
            .get_postulation(id)
            .await?
            .ok_or(Error::PostulationNotFound)
    }

    /// Apply a validator-gated screening transition
    pub async fn transition_postulation(
        &self,
        id: &Uuid,
        new_state: PostulationState,
    ) -> Result<Postulation, Error> {
        let _guard = self.lock_application(*id).await;

        let postulation = self.get_postulation(id).await?;
        let postulation = postulation.transition_to(new_state)?;

        self.localstore.update_postulation(postulation.clone()).await?;

        Ok(postulation)
    }
}
