//! Custom-Apparel Storefront Core
//!
//! The two design-bearing mechanisms of the storefront:
//! - a semantic URL path codec ([`router`]) translating view state into
//!   human-readable paths (`/Performance/jersey-01/Home-Blue`) and back
//! - a quote basket ([`domain::aggregates::quote`]) aggregating garment
//!   selections into line items that survive a session reload and are
//!   submitted to the order-intake ledger
//!
//! ## Features
//! - Bidirectional, total path encoding/decoding without a routing library
//! - Quote aggregation with per-size quantities and duplicate merging
//! - Snapshot persistence behind an explicit storage boundary
//! - Direct-order and quote-request submission with base64 file transport
//! - Ledger row status tracking for the admin side

pub mod config;
pub mod domain;
pub mod router;
pub mod storage;
pub mod submission;

pub use domain::aggregates::quote::{AddItem, QuoteBasket, QuoteItem};
pub use router::{decode, encode, RouteState, View};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorefrontError {
    #[error("storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("submission error: {0}")]
    Submission(#[from] submission::SubmissionError),

    #[error("status error: {0}")]
    Status(#[from] domain::aggregates::ledger::StatusError),
}

pub type Result<T> = std::result::Result<T, StorefrontError>;
