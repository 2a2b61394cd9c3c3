//! Value objects for the quote domain.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Per-size quantity map. Zero counts are never stored: setting a size to
/// zero removes the entry, so the map's sum is always the live quantity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SizeQuantities(BTreeMap<String, u32>);

impl SizeQuantities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn of(entries: &[(&str, u32)]) -> Self {
        let mut sizes = Self::new();
        for (size, qty) in entries {
            sizes.set(size, *qty);
        }
        sizes
    }

    pub fn set(&mut self, size: &str, qty: u32) {
        if qty == 0 {
            self.0.remove(size);
        } else {
            self.0.insert(size.to_string(), qty);
        }
    }

    pub fn get(&self, size: &str) -> u32 {
        self.0.get(size).copied().unwrap_or(0)
    }

    /// Add another map's counts size-by-size.
    pub fn merge(&mut self, other: &SizeQuantities) {
        for (size, qty) in &other.0 {
            let current = self.get(size);
            self.set(size, current.saturating_add(*qty));
        }
    }

    pub fn total(&self) -> u32 {
        self.0.values().fold(0u32, |acc, q| acc.saturating_add(*q))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(size, qty)| (size.as_str(), *qty))
    }
}

/// Chosen product colorway.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorChoice {
    pub name: String,
    pub hex: String,
}

impl fmt::Display for ColorChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Whether a submission is a binding purchase or a pricing inquiry. The two
/// share one ledger, distinguished by reference-id prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    DirectOrder,
    QuoteRequest,
}

impl SubmissionKind {
    pub fn prefix(self) -> &'static str {
        match self {
            Self::DirectOrder => "ORD",
            Self::QuoteRequest => "QT",
        }
    }
}

/// Ledger reference id: `ORD-` or `QT-` prefix with a millisecond creation
/// timestamp suffix, so ids are unique and roughly time-sortable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReferenceId(String);

impl ReferenceId {
    pub fn generate(kind: SubmissionKind, at: DateTime<Utc>) -> Self {
        Self(format!("{}-{}", kind.prefix(), at.timestamp_millis()))
    }

    pub fn parse(value: &str) -> Result<Self, ReferenceIdError> {
        let (prefix, suffix) = value
            .split_once('-')
            .ok_or_else(|| ReferenceIdError::BadPrefix(value.to_string()))?;
        if prefix != SubmissionKind::DirectOrder.prefix()
            && prefix != SubmissionKind::QuoteRequest.prefix()
        {
            return Err(ReferenceIdError::BadPrefix(value.to_string()));
        }
        if suffix.is_empty() || !suffix.chars().all(|c| c.is_ascii_digit()) {
            return Err(ReferenceIdError::BadTimestamp(value.to_string()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn kind(&self) -> SubmissionKind {
        if self.0.starts_with("ORD-") {
            SubmissionKind::DirectOrder
        } else {
            SubmissionKind::QuoteRequest
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReferenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug, Clone)]
pub enum ReferenceIdError {
    #[error("reference id {0:?} has no ORD-/QT- prefix")]
    BadPrefix(String),
    #[error("reference id {0:?} has no numeric timestamp suffix")]
    BadTimestamp(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_count_is_removed() {
        let mut sizes = SizeQuantities::of(&[("M", 2), ("L", 1)]);
        sizes.set("L", 0);
        assert_eq!(sizes.get("L"), 0);
        assert_eq!(sizes.iter().count(), 1);
        assert_eq!(sizes.total(), 2);
    }

    #[test]
    fn test_merge_adds_size_by_size() {
        let mut sizes = SizeQuantities::of(&[("S", 1), ("M", 2)]);
        sizes.merge(&SizeQuantities::of(&[("M", 3), ("L", 4)]));
        assert_eq!(sizes.get("S"), 1);
        assert_eq!(sizes.get("M"), 5);
        assert_eq!(sizes.get("L"), 4);
        assert_eq!(sizes.total(), 10);
    }

    #[test]
    fn test_reference_id_round_trip() {
        let at = Utc::now();
        let id = ReferenceId::generate(SubmissionKind::DirectOrder, at);
        assert!(id.as_str().starts_with("ORD-"));
        let parsed = ReferenceId::parse(id.as_str()).unwrap();
        assert_eq!(parsed.kind(), SubmissionKind::DirectOrder);
    }

    #[test]
    fn test_reference_id_rejects_garbage() {
        assert!(ReferenceId::parse("nope").is_err());
        assert!(ReferenceId::parse("ABC-123").is_err());
        assert!(ReferenceId::parse("QT-").is_err());
        assert!(ReferenceId::parse("QT-12x3").is_err());
        assert!(ReferenceId::parse("QT-1724500000000").is_ok());
    }
}
