//! Credit application aggregate

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::state::{self, ApplicationState};
use crate::util::unix_time;
use crate::webhook::SigningStatus;

/// Synthetic principal recorded for webhook-originated timeline events
pub const SYSTEM_FIRMAPLUS: &str = "SYSTEM_FIRMAPLUS";

/// Acting principal of a timeline event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// A user, identified by id
    User(Uuid),
    /// A synthetic system principal, e.g. the signing provider
    System(String),
}

impl Principal {
    /// Principal recorded for events pushed by the signing provider
    pub fn firmaplus() -> Self {
        Self::System(SYSTEM_FIRMAPLUS.to_string())
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "{id}"),
            Self::System(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for Principal {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Uuid::parse_str(s) {
            Ok(id) => Ok(Self::User(id)),
            Err(_) => Ok(Self::System(s.to_string())),
        }
    }
}

impl Serialize for Principal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Principal {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        #[allow(clippy::unwrap_used)]
        Ok(s.parse().unwrap())
    }
}

/// One immutable audit event on an application timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Event name, e.g. `WEBHOOK_FIRMADO`
    pub event: String,
    /// Acting principal
    pub principal: Principal,
    /// Unix time the event was recorded
    pub timestamp: u64,
    /// Optional structured payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Append-only audit timeline
///
/// Entries are only ever appended; historical entries are never mutated or
/// removed. Ordering is insertion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timeline(Vec<TimelineEntry>);

impl Timeline {
    /// New empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, returning a reference to the recorded entry
    pub fn append(
        &mut self,
        event: impl Into<String>,
        principal: Principal,
        payload: Option<Value>,
    ) -> &TimelineEntry {
        self.0.push(TimelineEntry {
            event: event.into(),
            principal,
            timestamp: unix_time(),
            payload,
        });

        #[allow(clippy::unwrap_used)]
        self.0.last().unwrap()
    }

    /// Most recently appended entry
    pub fn last(&self) -> Option<&TimelineEntry> {
        self.0.last()
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &TimelineEntry> {
        self.0.iter()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no events have been recorded
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A signer participating in a signing round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signer {
    /// Signer full name
    #[serde(rename = "nombre")]
    pub name: String,
    /// Signer email
    pub email: String,
    /// Whether the signer has signed
    #[serde(rename = "firmado", default)]
    pub signed: bool,
    /// Provider-reported signature timestamp (ISO 8601)
    #[serde(rename = "fecha_firma", default, skip_serializing_if = "Option::is_none")]
    pub signed_at: Option<String>,
}

/// Signing round started with the external provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigningProcess {
    /// Provider transaction id correlating webhook events to this round
    pub transaction_id: String,
    /// Provider-reported sub-state
    pub provider_status: SigningStatus,
    /// Count of signers that completed their signature
    pub signers_completed: u32,
    /// Count of signers still pending
    pub signers_pending: u32,
    /// Signer details
    #[serde(default)]
    pub signers: Vec<Signer>,
    /// Unix time the round was started
    pub started_time: u64,
    /// Unix time the provider reported a terminal outcome
    #[serde(default)]
    pub completed_time: Option<u64>,
    /// Unix time of the last webhook delivery applied to this round
    #[serde(default)]
    pub webhook_received_time: Option<u64>,
}

impl SigningProcess {
    /// Start a new signing round
    pub fn new(transaction_id: impl Into<String>, signers: Vec<Signer>) -> Self {
        let signers_pending = signers.len() as u32;
        Self {
            transaction_id: transaction_id.into(),
            provider_status: SigningStatus::PendienteFirmado,
            signers_completed: 0,
            signers_pending,
            signers,
            started_time: unix_time(),
            completed_time: None,
            webhook_received_time: None,
        }
    }
}

/// Reference to the generated credit-application document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedDocument {
    /// Storage path of the document
    pub path: String,
    /// File name
    pub filename: String,
    /// Unix time the document was generated
    pub generated_time: u64,
}

/// The credit application aggregate
///
/// Owned exclusively by the lifecycle subsystem. The `state` field is only
/// mutated through [`CreditApplication::transition_to`], which consults the
/// transition catalog; callers persist the updated aggregate and append the
/// audit entry themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditApplication {
    /// Application id
    pub id: Uuid,
    /// Owner (applicant) user id, recipient of lifecycle notifications
    pub owner_id: Uuid,
    /// Current lifecycle state
    pub state: ApplicationState,
    /// Signing round, present once signing has been started
    #[serde(default)]
    pub signing_process: Option<SigningProcess>,
    /// Generated document sent to the signing provider
    #[serde(default)]
    pub generated_document: Option<GeneratedDocument>,
    /// Audit timeline
    #[serde(default)]
    pub timeline: Timeline,
    /// Unix time the application was created
    pub created_time: u64,
    /// Unix time of the last mutation
    pub updated_time: u64,
}

impl CreditApplication {
    /// Create a new application in [`ApplicationState::Submitted`]
    pub fn new(owner_id: Uuid) -> Self {
        let now = unix_time();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            state: ApplicationState::Submitted,
            signing_process: None,
            generated_document: None,
            timeline: Timeline::new(),
            created_time: now,
            updated_time: now,
        }
    }

    /// Attempt the transition to `new_state`
    ///
    /// Pure and side-effect free: on success the returned aggregate carries
    /// the new state, on failure the typed rejection carries both states.
    /// Safe to call speculatively.
    pub fn transition_to(mut self, new_state: ApplicationState) -> Result<Self, state::Error> {
        state::check_state_transition(self.state, new_state)?;

        self.state = new_state;
        self.updated_time = unix_time();

        Ok(self)
    }

    /// Append an audit event to the timeline
    pub fn record_event(
        &mut self,
        event: impl Into<String>,
        principal: Principal,
        payload: Option<Value>,
    ) -> &TimelineEntry {
        self.timeline.append(event, principal, payload)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn transition_to_rejects_illegal_moves() {
        let application = CreditApplication::new(Uuid::new_v4());
        assert_eq!(application.state, ApplicationState::Submitted);

        let err = application
            .clone()
            .transition_to(ApplicationState::Signed)
            .expect_err("SUBMITTED -> SIGNED must be rejected");
        assert_eq!(
            err,
            state::Error::InvalidTransition(ApplicationState::Submitted, ApplicationState::Signed)
        );

        let moved = application
            .transition_to(ApplicationState::DocumentsUploaded)
            .expect("legal transition");
        assert_eq!(moved.state, ApplicationState::DocumentsUploaded);
    }

    #[test]
    fn timeline_last_is_most_recent_append() {
        let mut application = CreditApplication::new(Uuid::new_v4());

        application.record_event("SIGNING_STARTED", Principal::User(application.owner_id), None);
        application.record_event(
            "WEBHOOK_FIRMADO",
            Principal::firmaplus(),
            Some(json!({"transaction_id": "tx-1"})),
        );

        assert_eq!(application.timeline.len(), 2);
        let last = application.timeline.last().expect("two entries");
        assert_eq!(last.event, "WEBHOOK_FIRMADO");
        assert_eq!(last.principal, Principal::firmaplus());
    }

    #[test]
    fn principal_serializes_as_string() {
        let principal = Principal::firmaplus();
        assert_eq!(
            serde_json::to_value(&principal).expect("serialize"),
            json!("SYSTEM_FIRMAPLUS")
        );

        let user = Uuid::new_v4();
        let round_trip: Principal =
            serde_json::from_value(json!(user.to_string())).expect("deserialize");
        assert_eq!(round_trip, Principal::User(user));
    }
}
