//! Signing-provider webhook wire format
//!
//! The provider signs the exact raw JSON body with HMAC-SHA256 and sends the
//! hex digest in `X-Signature` (or `X-Webhook-Signature`). Field names are
//! the provider's contract and must not change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notification::NotificationType;
use crate::state::ApplicationState;

/// Provider-reported state of a signing round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SigningStatus {
    /// All signers completed, document signed
    Firmado,
    /// One or more signers rejected the document
    Rechazado,
    /// The signing round expired before completion
    Expirado,
    /// The signing round was cancelled
    Cancelado,
    /// Round in progress, progress report only
    PendienteFirmado,
}

impl SigningStatus {
    /// Internal lifecycle state this provider state maps to
    ///
    /// `None` means the event carries no state transition (progress report).
    pub fn target_state(&self) -> Option<ApplicationState> {
        match self {
            Self::Firmado => Some(ApplicationState::Signed),
            Self::Rechazado => Some(ApplicationState::Rejected),
            // The catalog has no dedicated expired state; an expired or
            // cancelled round terminates the application as withdrawn.
            Self::Expirado | Self::Cancelado => Some(ApplicationState::Withdrawn),
            Self::PendienteFirmado => None,
        }
    }

    /// Notification raised towards the application owner for this event
    pub fn notification_type(&self) -> Option<NotificationType> {
        match self {
            Self::Firmado => Some(NotificationType::FirmaCompletada),
            Self::Rechazado => Some(NotificationType::FirmaRechazada),
            Self::Expirado => Some(NotificationType::FirmaExpirada),
            Self::Cancelado => Some(NotificationType::EstadoActualizado),
            Self::PendienteFirmado => None,
        }
    }

    /// Timeline event name recorded for a webhook delivery of this state
    pub fn timeline_event(&self) -> String {
        format!("WEBHOOK_{self}")
    }

    /// Whether this state ends the signing round
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::PendienteFirmado)
    }
}

impl fmt::Display for SigningStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Firmado => "FIRMADO",
            Self::Rechazado => "RECHAZADO",
            Self::Expirado => "EXPIRADO",
            Self::Cancelado => "CANCELADO",
            Self::PendienteFirmado => "PENDIENTE_FIRMADO",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SigningStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FIRMADO" => Ok(Self::Firmado),
            "RECHAZADO" => Ok(Self::Rechazado),
            "EXPIRADO" => Ok(Self::Expirado),
            "CANCELADO" => Ok(Self::Cancelado),
            "PENDIENTE_FIRMADO" => Ok(Self::PendienteFirmado),
            _ => Err(format!("Unknown provider state: {s}")),
        }
    }
}

/// Signer detail reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerDetail {
    /// Signer full name
    #[serde(rename = "nombre")]
    pub name: String,
    /// Signer email
    #[serde(default)]
    pub email: String,
    /// Whether this signer has signed
    #[serde(rename = "firmado", default)]
    pub signed: bool,
    /// Signature timestamp (ISO 8601)
    #[serde(rename = "fecha_firma", default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<String>,
}

/// Webhook event pushed by the signing provider
///
/// `solicitud_id` and `estado` are deliberately plain strings here; the
/// ingestor validates them separately so malformed values yield precise
/// rejections rather than opaque parse errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRequest {
    /// Provider transaction id of the signing round
    pub transaction_id: String,
    /// Target application id (UUID)
    pub solicitud_id: String,
    /// Provider-reported state
    pub estado: String,
    /// Count of signers that completed
    #[serde(default)]
    pub firmantes_completados: u32,
    /// Signer details, when the provider includes them
    #[serde(default)]
    pub firmantes: Vec<SignerDetail>,
}

/// Successful webhook acknowledgement payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookAck {
    /// Event was applied
    pub procesado: bool,
    /// Target application id
    pub solicitud_id: Uuid,
    /// Provider state that was applied
    pub estado: SigningStatus,
    /// Provider transaction id
    pub transaction_id: String,
}
