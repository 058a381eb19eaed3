//! In-memory database

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use creditkit_common::database::{Database, Error};
use creditkit_common::{CreditApplication, Notification, Postulation};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Memory-backed record store
///
/// Notifications are kept in insertion order so recency ordering survives
/// second-granularity timestamp ties.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    applications: Arc<RwLock<HashMap<Uuid, CreditApplication>>>,
    postulations: Arc<RwLock<HashMap<Uuid, Postulation>>>,
    notifications: Arc<RwLock<Vec<Notification>>>,
}

impl MemoryDatabase {
    /// Create new [`MemoryDatabase`]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Database for MemoryDatabase {
    type Err = Error;

    async fn add_application(&self, application: CreditApplication) -> Result<(), Self::Err> {
        self.applications
            .write()
            .await
            .insert(application.id, application);
        Ok(())
    }

    async fn get_application(
        &self,
        id: &Uuid,
    ) -> Result<Option<CreditApplication>, Self::Err> {
        Ok(self.applications.read().await.get(id).cloned())
    }

    async fn update_application(&self, application: CreditApplication) -> Result<(), Self::Err> {
        let mut applications = self.applications.write().await;
        if !applications.contains_key(&application.id) {
            return Err(Error::UnknownApplication);
        }

        applications.insert(application.id, application);
        Ok(())
    }

    async fn add_postulation(&self, postulation: Postulation) -> Result<(), Self::Err> {
        self.postulations
            .write()
            .await
            .insert(postulation.id, postulation);
        Ok(())
    }

    async fn get_postulation(&self, id: &Uuid) -> Result<Option<Postulation>, Self::Err> {
        Ok(self.postulations.read().await.get(id).cloned())
    }

    async fn update_postulation(&self, postulation: Postulation) -> Result<(), Self::Err> {
        let mut postulations = self.postulations.write().await;
        if !postulations.contains_key(&postulation.id) {
            return Err(Error::UnknownPostulation);
        }

        postulations.insert(postulation.id, postulation);
        Ok(())
    }

    async fn add_notification(&self, notification: Notification) -> Result<(), Self::Err> {
        self.notifications.write().await.push(notification);
        Ok(())
    }

    async fn get_notification(&self, id: &Uuid) -> Result<Option<Notification>, Self::Err> {
        Ok(self
            .notifications
            .read()
            .await
            .iter()
            .find(|n| n.id == *id)
            .cloned())
    }

    async fn get_notifications(
        &self,
        recipient_id: &Uuid,
    ) -> Result<Vec<Notification>, Self::Err> {
        Ok(self
            .notifications
            .read()
            .await
            .iter()
            .rev()
            .filter(|n| n.recipient_id == *recipient_id)
            .cloned()
            .collect())
    }

    async fn update_notification(&self, notification: Notification) -> Result<(), Self::Err> {
        let mut notifications = self.notifications.write().await;
        let Some(stored) = notifications.iter_mut().find(|n| n.id == notification.id) else {
            return Err(Error::UnknownNotification);
        };

        *stored = notification;
        Ok(())
    }

    async fn remove_notification(&self, id: &Uuid) -> Result<(), Self::Err> {
        self.notifications.write().await.retain(|n| n.id != *id);
        Ok(())
    }
}
