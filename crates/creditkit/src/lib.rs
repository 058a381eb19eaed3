//! Creditkit
//!
//! Engine for the credit-application lifecycle: validator-gated state
//! mutations, the signing-provider webhook ingestion protocol, notification
//! records and an in-memory record store.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod database;
pub mod lifecycle;
pub mod notification;
pub mod webhook;

pub use creditkit_common::error::Error;
pub use creditkit_common::{
    ApplicationState, CreditApplication, Notification, NotificationType, Postulation,
    PostulationState, Principal, StateCatalog,
};
pub use lifecycle::Lifecycle;
pub use notification::NotificationService;
pub use webhook::WebhookIngestor;
