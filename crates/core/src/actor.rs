//! The acting principal supplied by the auth collaborator.
//!
//! The engine never evaluates permissions itself. Whoever calls in hands over
//! an [`Actor`] whose capability flags were already resolved upstream.

use devalaya_shared::types::ActorId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A capability the engine checks before a guarded transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Approve or reject pending entries, cancel approved ones.
    ApproveEntries,
    /// Execute year-end closing.
    CloseYear,
    /// Lock a finalized reconciliation session.
    LockReconciliation,
    /// Entries created by this actor skip the pending state.
    AutoApprove,
}

impl Capability {
    /// Returns the string representation of the capability.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ApproveEntries => "can_approve_entries",
            Self::CloseYear => "can_close_year",
            Self::LockReconciliation => "can_lock_reconciliation",
            Self::AutoApprove => "auto_approve",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Capability flags resolved by the auth collaborator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Capabilities {
    /// May approve, reject, and cancel entries.
    pub can_approve_entries: bool,
    /// May execute year-end closing.
    pub can_close_year: bool,
    /// May lock reconciliation sessions.
    pub can_lock_reconciliation: bool,
    /// Postings are stored directly as approved (system-generated entries).
    pub auto_approve: bool,
}

/// An actor performing an engine operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Actor identifier, stored on audit columns.
    pub id: ActorId,
    /// Resolved capabilities.
    pub capabilities: Capabilities,
}

impl Actor {
    /// Creates an actor with no capabilities (a plain clerk).
    #[must_use]
    pub fn clerk(id: ActorId) -> Self {
        Self {
            id,
            capabilities: Capabilities::default(),
        }
    }

    /// Creates an actor holding every capability except auto-approval.
    #[must_use]
    pub fn accountant(id: ActorId) -> Self {
        Self {
            id,
            capabilities: Capabilities {
                can_approve_entries: true,
                can_close_year: true,
                can_lock_reconciliation: true,
                auto_approve: false,
            },
        }
    }

    /// Creates an auto-approving system actor used by other business modules.
    #[must_use]
    pub fn system(id: ActorId) -> Self {
        Self {
            id,
            capabilities: Capabilities {
                auto_approve: true,
                ..Capabilities::default()
            },
        }
    }

    /// Returns true if the actor holds the capability.
    #[must_use]
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::ApproveEntries => self.capabilities.can_approve_entries,
            Capability::CloseYear => self.capabilities.can_close_year,
            Capability::LockReconciliation => self.capabilities.can_lock_reconciliation,
            Capability::AutoApprove => self.capabilities.auto_approve,
        }
    }
}
