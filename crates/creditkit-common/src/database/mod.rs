//! Creditkit Database

use std::fmt::Debug;

use async_trait::async_trait;
use uuid::Uuid;

use crate::application::CreditApplication;
use crate::notification::Notification;
use crate::postulation::Postulation;

/// Database error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend error
    #[error(transparent)]
    Database(Box<dyn std::error::Error + Send + Sync>),
    /// Serde Error
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
    /// Unknown application
    #[error("Unknown application")]
    UnknownApplication,
    /// Unknown postulation
    #[error("Unknown postulation")]
    UnknownPostulation,
    /// Unknown notification
    #[error("Unknown notification")]
    UnknownNotification,
    /// Invalid state transition applied at the storage layer
    #[error("Invalid state transition")]
    InvalidStateTransition(crate::state::Error),
    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Record store keyed by UUID for applications, postulations and
/// notifications
///
/// Implementations must support per-id serialized access: an
/// `update_application` racing another writer for the same id must not
/// interleave (the engine additionally serializes its own read-modify-write
/// sequences per application).
#[async_trait]
pub trait Database: Debug {
    /// Database Error
    type Err: Into<Error> + From<Error>;

    /// Add a [`CreditApplication`]
    async fn add_application(&self, application: CreditApplication) -> Result<(), Self::Err>;
    /// Get a [`CreditApplication`] by id
    async fn get_application(&self, id: &Uuid)
        -> Result<Option<CreditApplication>, Self::Err>;
    /// Persist an updated [`CreditApplication`]
    async fn update_application(&self, application: CreditApplication) -> Result<(), Self::Err>;

    /// Add a [`Postulation`]
    async fn add_postulation(&self, postulation: Postulation) -> Result<(), Self::Err>;
    /// Get a [`Postulation`] by id
    async fn get_postulation(&self, id: &Uuid) -> Result<Option<Postulation>, Self::Err>;
    /// Persist an updated [`Postulation`]
    async fn update_postulation(&self, postulation: Postulation) -> Result<(), Self::Err>;

    /// Add a [`Notification`]
    async fn add_notification(&self, notification: Notification) -> Result<(), Self::Err>;
    /// Get a [`Notification`] by id
    async fn get_notification(&self, id: &Uuid) -> Result<Option<Notification>, Self::Err>;
    /// Get notifications for a recipient, most recent first
    async fn get_notifications(&self, recipient_id: &Uuid)
        -> Result<Vec<Notification>, Self::Err>;
    /// Persist an updated [`Notification`]
    async fn update_notification(&self, notification: Notification) -> Result<(), Self::Err>;
    /// Remove a [`Notification`]
    async fn remove_notification(&self, id: &Uuid) -> Result<(), Self::Err>;
}
