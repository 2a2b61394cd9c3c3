//! Submitted-quote ledger row.
//!
//! The intake service appends one row per confirmed submission. Everything
//! except `status` is immutable once appended; the full original payload is
//! kept alongside the human-readable summary so a submission can be
//! reconstructed later.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::value_objects::ReferenceId;
use crate::submission::ContactInfo;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    New,
    Contacted,
    InProgress,
    Completed,
    Cancelled,
}

impl QuoteStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Forward progression is `New → Contacted → InProgress → Completed`;
    /// cancellation is allowed from any non-terminal state.
    pub fn can_transition_to(self, next: QuoteStatus) -> bool {
        match (self, next) {
            (Self::New, Self::Contacted)
            | (Self::Contacted, Self::InProgress)
            | (Self::InProgress, Self::Completed) => true,
            (from, Self::Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmittedQuote {
    reference: ReferenceId,
    submitted_at: DateTime<Utc>,
    status: QuoteStatus,
    contact: ContactInfo,
    summary: String,
    total: Decimal,
    payload: serde_json::Value,
}

impl SubmittedQuote {
    pub fn append(
        reference: ReferenceId,
        contact: ContactInfo,
        summary: impl Into<String>,
        total: Decimal,
        payload: serde_json::Value,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            reference,
            submitted_at,
            status: QuoteStatus::New,
            contact,
            summary: summary.into(),
            total,
            payload,
        }
    }

    pub fn reference(&self) -> &ReferenceId {
        &self.reference
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    pub fn contact(&self) -> &ContactInfo {
        &self.contact
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }

    /// The only mutation a ledger row supports.
    pub fn update_status(&mut self, next: QuoteStatus) -> Result<(), StatusError> {
        if !self.status.can_transition_to(next) {
            return Err(StatusError::Illegal { from: self.status, to: next });
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Error, Debug, Clone)]
pub enum StatusError {
    #[error("illegal status transition {from:?} -> {to:?}")]
    Illegal { from: QuoteStatus, to: QuoteStatus },
}
