//! Notification records

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::util::unix_time;

/// Semantic notification type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationType {
    /// Signing round completed
    #[serde(rename = "firma_completada")]
    FirmaCompletada,
    /// Signing round rejected by a signer
    #[serde(rename = "firma_rechazada")]
    FirmaRechazada,
    /// Signing round expired
    #[serde(rename = "firma_expirada")]
    FirmaExpirada,
    /// Application state changed
    #[serde(rename = "estado_actualizado")]
    EstadoActualizado,
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::FirmaCompletada => "firma_completada",
            Self::FirmaRechazada => "firma_rechazada",
            Self::FirmaExpirada => "firma_expirada",
            Self::EstadoActualizado => "estado_actualizado",
        };
        write!(f, "{s}")
    }
}

/// Kind of notification recipient
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecipientKind {
    /// A user account
    #[default]
    User,
}

/// A persisted notification
///
/// Created unread; the only permitted mutation is setting `read_at`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Notification id
    pub id: Uuid,
    /// Recipient principal id
    pub recipient_id: Uuid,
    /// Recipient kind
    #[serde(default)]
    pub recipient_kind: RecipientKind,
    /// Semantic type tag
    #[serde(rename = "type")]
    pub kind: NotificationType,
    /// Structured payload
    pub data: Value,
    /// Unix time the notification was read, none while unread
    #[serde(default)]
    pub read_at: Option<u64>,
    /// Unix time of creation
    pub created_time: u64,
    /// Unix time of last update
    pub updated_time: u64,
}

impl Notification {
    /// Create a new unread notification
    pub fn new(recipient_id: Uuid, kind: NotificationType, data: Value) -> Self {
        let now = unix_time();
        Self {
            id: Uuid::new_v4(),
            recipient_id,
            recipient_kind: RecipientKind::User,
            kind,
            data,
            read_at: None,
            created_time: now,
            updated_time: now,
        }
    }

    /// Whether the notification has been read
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }

    /// Mark the notification read; returns false when it already was
    pub fn mark_read(&mut self) -> bool {
        if self.read_at.is_some() {
            return false;
        }

        let now = unix_time();
        self.read_at = Some(now);
        self.updated_time = now;
        true
    }
}
