//! Errors

use thiserror::Error;

use crate::{database, state};

/// Creditkit Error
#[derive(Debug, Error)]
pub enum Error {
    /// Webhook delivered without a signature header
    #[error("Missing signature header (X-Signature or X-Webhook-Signature)")]
    MissingSignature,
    /// Webhook signature does not match the request body
    #[error("Invalid signature")]
    InvalidSignature,
    /// Webhook payload malformed or missing mandatory fields
    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(String),
    /// `solicitud_id` is not a well-formed UUID
    #[error("solicitud_id is not a valid UUID")]
    InvalidSolicitudId,
    /// Provider reported a state outside its recognized set
    #[error("Unknown provider state: {0}")]
    UnknownProviderState(String),
    /// No application exists for the given id
    #[error("Application not found")]
    ApplicationNotFound,
    /// No postulation exists for the given id
    #[error("Postulation not found")]
    PostulationNotFound,
    /// Store access exceeded the request deadline
    #[error("Storage operation timed out")]
    Timeout,
    /// State transition rejection
    #[error(transparent)]
    State(#[from] state::Error),
    /// Database error
    #[error(transparent)]
    Database(#[from] database::Error),
}
