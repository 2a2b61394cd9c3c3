//! Domain events raised by the quote basket. Drained with
//! [`QuoteBasket::take_events`](crate::domain::aggregates::quote::QuoteBasket::take_events)
//! or observed live through registered subscribers.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuoteEvent {
    ItemAdded { item_id: String },
    ItemMerged { item_id: String, added_quantity: u32 },
    ItemRemoved { item_id: String },
    Cleared,
    Submitted { reference: String },
}
