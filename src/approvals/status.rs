//! Status taxonomies and the append-only status trail
//!
//! Each record carries its current status plus every status it has passed
//! through. Entries are only ever appended, and only along the edges each
//! taxonomy allows.

use crate::error::PortalError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed set of workflow states with a fixed transition graph
pub trait WorkflowStatus: Copy + PartialEq + fmt::Debug {
    /// Initial state of every new record
    const PENDING: Self;

    fn as_str(self) -> &'static str;

    /// Whether `self -> next` is an edge of the graph
    fn allows(self, next: Self) -> bool;
}

/// Beverage order lifecycle: `pending_approval -> {approved -> sent, denied}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingApproval,
    Approved,
    Sent,
    Denied,
}

impl WorkflowStatus for OrderStatus {
    const PENDING: Self = OrderStatus::PendingApproval;

    fn as_str(self) -> &'static str {
        match self {
            OrderStatus::PendingApproval => "pending_approval",
            OrderStatus::Approved => "approved",
            OrderStatus::Sent => "sent",
            OrderStatus::Denied => "denied",
        }
    }

    fn allows(self, next: Self) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (PendingApproval, Approved) | (PendingApproval, Denied) | (Approved, Sent)
        )
    }
}

/// NDA request lifecycle.
///
/// `pending_approval -> {approved -> sent | error, denied}`, `error -> sent | error`
/// on retry, `sent -> signed` once the signed copy is back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NdaStatus {
    PendingApproval,
    Approved,
    Sent,
    Signed,
    Error,
    Denied,
}

impl WorkflowStatus for NdaStatus {
    const PENDING: Self = NdaStatus::PendingApproval;

    fn as_str(self) -> &'static str {
        match self {
            NdaStatus::PendingApproval => "pending_approval",
            NdaStatus::Approved => "approved",
            NdaStatus::Sent => "sent",
            NdaStatus::Signed => "signed",
            NdaStatus::Error => "error",
            NdaStatus::Denied => "denied",
        }
    }

    fn allows(self, next: Self) -> bool {
        use NdaStatus::*;
        matches!(
            (self, next),
            (PendingApproval, Approved)
                | (PendingApproval, Denied)
                | (Approved, Sent)
                | (Approved, Error)
                | (Error, Sent)
                | (Error, Error)
                | (Sent, Signed)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for NdaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a record's history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry<S> {
    pub status: S,
    pub timestamp: DateTime<Utc>,
    pub note: String,
}

/// Current status plus the full history, flattened into the owning record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTrail<S> {
    status: S,
    status_history: Vec<StatusEntry<S>>,
}

impl<S: WorkflowStatus> StatusTrail<S> {
    /// Start a trail in the pending state
    pub fn pending(note: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            status: S::PENDING,
            status_history: vec![StatusEntry {
                status: S::PENDING,
                timestamp: at,
                note: note.into(),
            }],
        }
    }

    pub fn current(&self) -> S {
        self.status
    }

    pub fn is_pending(&self) -> bool {
        self.status == S::PENDING
    }

    pub fn history(&self) -> &[StatusEntry<S>] {
        &self.status_history
    }

    pub fn last_entry(&self) -> Option<&StatusEntry<S>> {
        self.status_history.last()
    }

    /// Append a transition. Edges outside the graph are rejected and leave
    /// the trail untouched.
    pub fn advance(
        &mut self,
        record_id: &str,
        next: S,
        note: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Result<(), PortalError> {
        if !self.status.allows(next) {
            return Err(PortalError::InvalidTransition {
                record: record_id.to_string(),
                from: self.status.as_str(),
                to: next.as_str(),
            });
        }

        self.status = next;
        self.status_history.push(StatusEntry {
            status: next,
            timestamp: at,
            note: note.into(),
        });
        Ok(())
    }
}
