//! Creditkit shared types
//!
//! Types shared between the lifecycle engine, the storage backends and the
//! HTTP layer: the state catalogs and their transition rules, the credit
//! application aggregate, notification records and the webhook wire format.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod application;
pub mod database;
pub mod error;
pub mod notification;
pub mod postulation;
pub mod state;
pub mod util;
pub mod webhook;

pub use application::{
    CreditApplication, GeneratedDocument, Principal, Signer, SigningProcess, Timeline,
    TimelineEntry, SYSTEM_FIRMAPLUS,
};
pub use error::Error;
pub use notification::{Notification, NotificationType, RecipientKind};
pub use postulation::Postulation;
pub use state::{ApplicationState, PostulationState, StateCatalog, StateInfo};
pub use webhook::{SignerDetail, SigningStatus, WebhookAck, WebhookRequest};
