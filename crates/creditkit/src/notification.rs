//! Notification sink
//!
//! Persists notification records for lifecycle events. Delivery to the user
//! (email, push) is downstream and out of scope; this service only creates
//! and manages the records.

use creditkit_common::{Error, Notification, NotificationType};
use serde_json::Value;
use uuid::Uuid;

use crate::lifecycle::LocalStore;

/// Notification record service
#[derive(Debug, Clone)]
pub struct NotificationService {
    localstore: LocalStore,
}

impl NotificationService {
    /// Create a new [`NotificationService`] over the given store
    pub fn new(localstore: LocalStore) -> Self {
        Self { localstore }
    }

    /// Create a notification for a recipient; unread by construction
    pub async fn create(
        &self,
        recipient_id: Uuid,
        kind: NotificationType,
        data: Value,
    ) -> Result<Notification, Error> {
        let notification = Notification::new(recipient_id, kind, data);
        self.localstore.add_notification(notification.clone()).await?;

        tracing::debug!(
            "Notification {} ({}) created for {}",
            notification.id,
            kind,
            recipient_id
        );

        Ok(notification)
    }

    /// Mark one notification read
    ///
    /// Returns false when the record does not exist or does not belong to
    /// the recipient.
    pub async fn mark_read(&self, id: &Uuid, recipient_id: &Uuid) -> Result<bool, Error> {
        let Some(mut notification) = self.localstore.get_notification(id).await? else {
            return Ok(false);
        };

        if notification.recipient_id != *recipient_id {
            return Ok(false);
        }

        if notification.mark_read() {
            self.localstore.update_notification(notification).await?;
        }

        Ok(true)
    }

    /// Mark all of a recipient's notifications read; returns the count of
    /// records that changed
    pub async fn mark_all_read(&self, recipient_id: &Uuid) -> Result<usize, Error> {
        let mut count = 0;
        for mut notification in self.localstore.get_notifications(recipient_id).await? {
            if notification.mark_read() {
                self.localstore.update_notification(notification).await?;
                count += 1;
            }
        }

        Ok(count)
    }

    /// Count of unread notifications for a recipient
    pub async fn unread_count(&self, recipient_id: &Uuid) -> Result<usize, Error> {
        Ok(self
            .localstore
            .get_notifications(recipient_id)
            .await?
            .iter()
            .filter(|n| !n.is_read())
            .count())
    }

    /// List a recipient's notifications, most recent first
    pub async fn list(
        &self,
        recipient_id: &Uuid,
        unread_only: bool,
    ) -> Result<Vec<Notification>, Error> {
        let mut notifications = self.localstore.get_notifications(recipient_id).await?;

        if unread_only {
            notifications.retain(|n| !n.is_read());
        }

        Ok(notifications)
    }

    /// Delete one notification
    ///
    /// Returns false when the record does not exist or does not belong to
    /// the recipient.
    pub async fn delete(&self, id: &Uuid, recipient_id: &Uuid) -> Result<bool, Error> {
        let Some(notification) = self.localstore.get_notification(id).await? else {
            return Ok(false);
        };

        if notification.recipient_id != *recipient_id {
            return Ok(false);
        }

        self.localstore.remove_notification(id).await?;
        Ok(true)
    }
}
