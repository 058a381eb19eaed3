//! State catalogs and transition rules
//!
//! Two closed state machines live here: the credit-application lifecycle and
//! the smaller postulation (screening) machine. Both implement the same
//! [`StateCatalog`] abstraction; the transition tables are authoritative and
//! every other component must go through [`check_state_transition`] or
//! [`check_postulation_transition`] before mutating a state field.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Display metadata attached to each catalog state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateInfo {
    /// Human readable label
    pub label: &'static str,
    /// Color tag used by consumers for severity rendering
    pub color: &'static str,
    /// Numeric ordering rank along the happy path
    pub rank: u8,
    /// Human description of the state
    pub description: &'static str,
    /// State belongs to an in-flight application
    pub is_active: bool,
    /// Terminal state, admits no outgoing transitions
    pub is_final: bool,
    /// State requires action from the applicant or an advisor
    pub requires_action: bool,
}

/// A closed set of lifecycle states with attached metadata and a directed
/// transition graph.
pub trait StateCatalog: Copy + Eq + fmt::Display + Sized + 'static {
    /// Every state in the catalog
    const ALL: &'static [Self];

    /// Display metadata for the state
    fn info(&self) -> StateInfo;

    /// Set of states reachable from this one
    fn transitions(&self) -> &'static [Self];

    /// Check if the transition to `new_state` is permitted
    fn can_transition_to(&self, new_state: Self) -> bool {
        self.transitions().contains(&new_state)
    }

    /// State belongs to an in-flight application
    fn is_active(&self) -> bool {
        self.info().is_active
    }

    /// Terminal state
    fn is_final(&self) -> bool {
        self.info().is_final
    }

    /// State requires applicant/advisor action
    fn requires_action(&self) -> bool {
        self.info().requires_action
    }
}

/// State transition Error
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Invalid application transition
    #[error("Invalid transition: From {0} to {1}")]
    InvalidTransition(ApplicationState, ApplicationState),
    /// Invalid postulation transition
    #[error("Invalid postulation state transition: From {0} to {1}")]
    InvalidPostulationTransition(PostulationState, PostulationState),
    /// Webhook event does not correlate with the stored signing round
    #[error("Transaction id mismatch: expected {expected}, received {received}")]
    TransactionIdMismatch {
        /// Transaction id of the signing round started for the application
        expected: String,
        /// Transaction id carried by the webhook event
        received: String,
    },
    /// Webhook event targets an application with no signing round
    #[error("No signing process started for application")]
    MissingSigningProcess,
}

/// Credit application lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationState {
    /// Application created and submitted
    Submitted,
    /// All required documents uploaded
    DocumentsUploaded,
    /// Sent to advisors for validation
    SentForValidation,
    /// Digital signature round in progress
    PendingSignature,
    /// Credit documents signed
    Signed,
    /// Sent and awaiting approval
    SentForApproval,
    /// Approved, ready for disbursement
    Approved,
    /// Credit disbursed to the applicant
    Disbursed,
    /// Credit repaid and closed
    Finalized,
    /// Application rejected
    Rejected,
    /// Applicant withdrew the application
    Withdrawn,
    /// Applicant must correct the submitted data
    RequiresCorrection,
}

impl StateCatalog for ApplicationState {
    const ALL: &'static [Self] = &[
        Self::Submitted,
        Self::DocumentsUploaded,
        Self::SentForValidation,
        Self::PendingSignature,
        Self::Signed,
        Self::SentForApproval,
        Self::Approved,
        Self::Disbursed,
        Self::Finalized,
        Self::Rejected,
        Self::Withdrawn,
        Self::RequiresCorrection,
    ];

    fn info(&self) -> StateInfo {
        match self {
            Self::Submitted => StateInfo {
                label: "Submitted",
                color: "#6B7280",
                rank: 1,
                description: "Application created and submitted",
                is_active: true,
                is_final: false,
                requires_action: false,
            },
            Self::DocumentsUploaded => StateInfo {
                label: "Documents uploaded",
                color: "#3B82F6",
                rank: 2,
                description: "All required documents have been uploaded",
                is_active: true,
                is_final: false,
                requires_action: false,
            },
            Self::SentForValidation => StateInfo {
                label: "Sent for validation",
                color: "#F59E0B",
                rank: 3,
                description: "Sent to advisors for validation",
                is_active: true,
                is_final: false,
                requires_action: true,
            },
            Self::PendingSignature => StateInfo {
                label: "Pending signature",
                color: "#F5E20B",
                rank: 4,
                description: "Digital signature round in progress",
                is_active: true,
                is_final: false,
                requires_action: true,
            },
            Self::Signed => StateInfo {
                label: "Signed",
                color: "#0D9488",
                rank: 5,
                description: "Credit documents signed",
                is_active: true,
                is_final: false,
                requires_action: false,
            },
            Self::SentForApproval => StateInfo {
                label: "Sent for approval",
                color: "#8B5CF6",
                rank: 6,
                description: "Sent and awaiting approval",
                is_active: true,
                is_final: false,
                requires_action: false,
            },
            Self::Approved => StateInfo {
                label: "Approved",
                color: "#10B981",
                rank: 7,
                description: "Approved and ready for disbursement",
                is_active: true,
                is_final: false,
                requires_action: false,
            },
            Self::Disbursed => StateInfo {
                label: "Disbursed",
                color: "#059669",
                rank: 8,
                description: "Credit disbursed to the applicant",
                is_active: true,
                is_final: false,
                requires_action: false,
            },
            Self::Finalized => StateInfo {
                label: "Finalized",
                color: "#6366F1",
                rank: 9,
                description: "Credit repaid and closed",
                is_active: false,
                is_final: true,
                requires_action: false,
            },
            Self::Rejected => StateInfo {
                label: "Rejected",
                color: "#EF4444",
                rank: 10,
                description: "Application rejected for unmet requirements",
                is_active: false,
                is_final: true,
                requires_action: false,
            },
            Self::Withdrawn => StateInfo {
                label: "Withdrawn",
                color: "#F97316",
                rank: 11,
                description: "Applicant withdrew from the application",
                is_active: false,
                is_final: true,
                requires_action: false,
            },
            Self::RequiresCorrection => StateInfo {
                label: "Requires correction",
                color: "#16A6F9",
                rank: 12,
                description: "Applicant must correct the submitted data to continue",
                is_active: false,
                is_final: false,
                requires_action: true,
            },
        }
    }

    fn transitions(&self) -> &'static [Self] {
        match self {
            Self::Submitted => &[
                Self::DocumentsUploaded,
                Self::SentForValidation,
                Self::Rejected,
                Self::Withdrawn,
                Self::RequiresCorrection,
            ],
            Self::DocumentsUploaded => &[
                Self::PendingSignature,
                Self::SentForValidation,
                Self::Rejected,
                Self::Withdrawn,
                Self::RequiresCorrection,
            ],
            Self::SentForValidation => &[
                Self::PendingSignature,
                Self::Rejected,
                Self::Withdrawn,
                Self::RequiresCorrection,
            ],
            Self::PendingSignature => &[
                Self::Signed,
                Self::Rejected,
                Self::Withdrawn,
                Self::RequiresCorrection,
            ],
            Self::Signed => &[
                Self::SentForApproval,
                Self::Rejected,
                Self::Withdrawn,
                Self::RequiresCorrection,
            ],
            Self::SentForApproval => &[
                Self::Approved,
                Self::Rejected,
                Self::Withdrawn,
                Self::RequiresCorrection,
            ],
            Self::Approved => &[
                Self::Disbursed,
                Self::Finalized,
                Self::Rejected,
                Self::Withdrawn,
            ],
            Self::Disbursed => &[Self::Finalized],
            Self::Finalized | Self::Rejected | Self::Withdrawn | Self::RequiresCorrection => &[],
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Submitted => "SUBMITTED",
            Self::DocumentsUploaded => "DOCUMENTS_UPLOADED",
            Self::SentForValidation => "SENT_FOR_VALIDATION",
            Self::PendingSignature => "PENDING_SIGNATURE",
            Self::Signed => "SIGNED",
            Self::SentForApproval => "SENT_FOR_APPROVAL",
            Self::Approved => "APPROVED",
            Self::Disbursed => "DISBURSED",
            Self::Finalized => "FINALIZED",
            Self::Rejected => "REJECTED",
            Self::Withdrawn => "WITHDRAWN",
            Self::RequiresCorrection => "REQUIRES_CORRECTION",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ApplicationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUBMITTED" => Ok(Self::Submitted),
            "DOCUMENTS_UPLOADED" => Ok(Self::DocumentsUploaded),
            "SENT_FOR_VALIDATION" => Ok(Self::SentForValidation),
            "PENDING_SIGNATURE" => Ok(Self::PendingSignature),
            "SIGNED" => Ok(Self::Signed),
            "SENT_FOR_APPROVAL" => Ok(Self::SentForApproval),
            "APPROVED" => Ok(Self::Approved),
            "DISBURSED" => Ok(Self::Disbursed),
            "FINALIZED" => Ok(Self::Finalized),
            "REJECTED" => Ok(Self::Rejected),
            "WITHDRAWN" => Ok(Self::Withdrawn),
            "REQUIRES_CORRECTION" => Ok(Self::RequiresCorrection),
            _ => Err(format!("Unknown application state: {s}")),
        }
    }
}

/// Postulation (screening) state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostulationState {
    /// Postulation received
    Postulated,
    /// Under advisor review
    InReview,
    /// Screening approved
    Approved,
    /// Screening rejected
    Rejected,
    /// Cancelled by the postulant
    Cancelled,
}

impl StateCatalog for PostulationState {
    const ALL: &'static [Self] = &[
        Self::Postulated,
        Self::InReview,
        Self::Approved,
        Self::Rejected,
        Self::Cancelled,
    ];

    fn info(&self) -> StateInfo {
        match self {
            Self::Postulated => StateInfo {
                label: "Postulated",
                color: "gray",
                rank: 1,
                description: "Postulation received",
                is_active: true,
                is_final: false,
                requires_action: false,
            },
            Self::InReview => StateInfo {
                label: "In review",
                color: "blue",
                rank: 2,
                description: "Under advisor review",
                is_active: true,
                is_final: false,
                requires_action: false,
            },
            Self::Approved => StateInfo {
                label: "Approved",
                color: "green",
                rank: 3,
                description: "Screening approved",
                is_active: false,
                is_final: true,
                requires_action: false,
            },
            Self::Rejected => StateInfo {
                label: "Rejected",
                color: "red",
                rank: 4,
                description: "Screening rejected",
                is_active: false,
                is_final: true,
                requires_action: false,
            },
            Self::Cancelled => StateInfo {
                label: "Cancelled",
                color: "orange",
                rank: 5,
                description: "Cancelled by the postulant",
                is_active: false,
                is_final: true,
                requires_action: false,
            },
        }
    }

    fn transitions(&self) -> &'static [Self] {
        match self {
            Self::Postulated => &[Self::InReview, Self::Cancelled],
            Self::InReview => &[Self::Approved, Self::Rejected, Self::Cancelled],
            Self::Approved | Self::Rejected | Self::Cancelled => &[],
        }
    }
}

impl fmt::Display for PostulationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Postulated => "POSTULATED",
            Self::InReview => "IN_REVIEW",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for PostulationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "POSTULATED" => Ok(Self::Postulated),
            "IN_REVIEW" => Ok(Self::InReview),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            "CANCELLED" => Ok(Self::Cancelled),
            _ => Err(format!("Unknown postulation state: {s}")),
        }
    }
}

#[inline]
/// Check if the application state transition is allowed
pub fn check_state_transition(
    current_state: ApplicationState,
    new_state: ApplicationState,
) -> Result<(), Error> {
    if !current_state.can_transition_to(new_state) {
        return Err(Error::InvalidTransition(current_state, new_state));
    }

    Ok(())
}

#[inline]
/// Check if the postulation state transition is allowed
pub fn check_postulation_transition(
    current_state: PostulationState,
    new_state: PostulationState,
) -> Result<(), Error> {
    if !current_state.can_transition_to(new_state) {
        return Err(Error::InvalidPostulationTransition(
            current_state, new_state,
        ));
    }

    Ok(())
}
