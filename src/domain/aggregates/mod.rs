//! Aggregates module
pub mod ledger;
pub mod product;
pub mod quote;

pub use ledger::{QuoteStatus, StatusError, SubmittedQuote};
pub use product::CatalogProduct;
pub use quote::{AddItem, Attachment, Customization, QuoteBasket, QuoteItem};
