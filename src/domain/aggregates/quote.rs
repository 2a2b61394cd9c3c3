//! Quote basket aggregate.
//!
//! Ordered collection of line items the visitor intends to order or request
//! a quote for. Every mutation completes synchronously in memory, raises a
//! [`QuoteEvent`], and is followed by a best-effort snapshot save through
//! the injected [`QuoteStorage`]; a failed save is logged and swallowed so a
//! flaky store never blocks the shopper.
//!
//! Identity and merge rules:
//! - plain items are keyed by product, color, and print-location count, and
//!   re-adding the same configuration merges quantities size-by-size
//! - customized batches (per-unit names/numbers) are always distinct, since
//!   merging would silently overwrite customer-specific requests

use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::aggregates::product::CatalogProduct;
use crate::domain::events::QuoteEvent;
use crate::domain::value_objects::{ColorChoice, SizeQuantities};
use crate::storage::QuoteStorage;

/// Per-unit customization for jersey-type goods.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customization {
    pub name: String,
    pub number: String,
    pub size: String,
}

/// Uploaded artwork owned exclusively by one item. Never serialized: a
/// snapshot save strips attachments, so a reload keeps quantities and
/// metadata but the shopper must re-attach files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// One line item. Fields that can go structurally missing through snapshot
/// tampering or partial writes are lenient (`Option`/defaulted) so a corrupt
/// row degrades instead of crashing rendering or totals.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub id: String,
    #[serde(default)]
    pub product: Option<CatalogProduct>,
    #[serde(default)]
    pub color: Option<ColorChoice>,
    #[serde(default)]
    pub sizes: SizeQuantities,
    #[serde(default)]
    pub unit_price: Option<Decimal>,
    #[serde(default = "default_print_locations")]
    pub print_locations: u32,
    #[serde(skip)]
    pub logo: Option<Attachment>,
    #[serde(skip)]
    pub design: Option<Attachment>,
    #[serde(default)]
    pub customizations: Vec<Customization>,
}

fn default_print_locations() -> u32 {
    1
}

impl QuoteItem {
    pub fn total_quantity(&self) -> u32 {
        self.sizes.total()
    }

    /// `unit_price × total quantity`, treating a missing price or an empty
    /// size map as zero.
    pub fn line_total(&self) -> Decimal {
        self.unit_price.unwrap_or_default() * Decimal::from(self.total_quantity())
    }

    /// A row needs a product, a color, and at least one size to be worth
    /// rendering or submitting.
    pub fn is_renderable(&self) -> bool {
        self.product.is_some() && self.color.is_some() && !self.sizes.is_empty()
    }
}

/// Identity key for plain (non-customized) items.
pub fn identity_key(product_id: &str, color_name: &str, print_locations: u32) -> String {
    format!("{product_id}-{color_name}-loc{print_locations}")
}

fn customized_batch_id() -> String {
    // Time-based, with a uuid tiebreak for batches landing in the same
    // millisecond.
    format!("custom-{}-{}", Utc::now().timestamp_millis(), Uuid::new_v4().simple())
}

/// Single normalization point for rows read from persistence or the
/// network. Broken rows are dropped with a warning instead of being guarded
/// against at every consumption site.
pub fn normalize_items(items: Vec<QuoteItem>) -> Vec<QuoteItem> {
    items
        .into_iter()
        .filter(|item| {
            let keep = item.is_renderable();
            if !keep {
                tracing::warn!(item_id = %item.id, "dropping structurally incomplete quote item");
            }
            keep
        })
        .collect()
}

/// Parameters for [`QuoteBasket::add_item`]. `print_locations` defaults to
/// one and `unit_price` to the product's list price.
#[derive(Clone, Debug)]
pub struct AddItem {
    pub product: CatalogProduct,
    pub color: ColorChoice,
    pub sizes: SizeQuantities,
    pub logo: Option<Attachment>,
    pub design: Option<Attachment>,
    pub customizations: Vec<Customization>,
    pub print_locations: Option<u32>,
    pub unit_price: Option<Decimal>,
}

impl AddItem {
    pub fn new(product: CatalogProduct, color: ColorChoice, sizes: SizeQuantities) -> Self {
        Self {
            product,
            color,
            sizes,
            logo: None,
            design: None,
            customizations: Vec::new(),
            print_locations: None,
            unit_price: None,
        }
    }
}

type Subscriber = Box<dyn Fn(&QuoteEvent) + Send + Sync>;

/// The aggregator: an explicit store object rather than ambient global
/// state. UI layers either register a subscriber or drain
/// [`take_events`](Self::take_events) after mutating.
pub struct QuoteBasket {
    items: Vec<QuoteItem>,
    storage: Box<dyn QuoteStorage>,
    subscribers: Vec<Subscriber>,
    events: Vec<QuoteEvent>,
}

impl QuoteBasket {
    /// Fresh basket with nothing persisted yet.
    pub fn new(storage: Box<dyn QuoteStorage>) -> Self {
        Self { items: Vec::new(), storage, subscribers: Vec::new(), events: Vec::new() }
    }

    /// Basket rehydrated from the storage snapshot. Load failures start an
    /// empty basket; loaded rows pass through [`normalize_items`].
    pub fn load(storage: Box<dyn QuoteStorage>) -> Self {
        let items = match storage.load() {
            Ok(items) => normalize_items(items),
            Err(e) => {
                tracing::warn!(error = %e, "quote snapshot load failed, starting empty");
                Vec::new()
            }
        };
        Self { items, storage, subscribers: Vec::new(), events: Vec::new() }
    }

    pub fn items(&self) -> &[QuoteItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn subscribe(&mut self, f: impl Fn(&QuoteEvent) + Send + Sync + 'static) {
        self.subscribers.push(Box::new(f));
    }

    /// Add a configuration, merging into an existing identical one where
    /// the identity rules allow. Returns the item id.
    ///
    /// Quantity positivity is the caller's contract; an all-zero size map is
    /// accepted and simply contributes nothing to the total.
    pub fn add_item(&mut self, req: AddItem) -> String {
        let print_locations = req.print_locations.unwrap_or(1);
        let unit_price = req.unit_price.unwrap_or(req.product.price);

        let (id, event) = if !req.customizations.is_empty() {
            let id = customized_batch_id();
            self.items.push(QuoteItem {
                id: id.clone(),
                product: Some(req.product),
                color: Some(req.color),
                sizes: req.sizes,
                unit_price: Some(unit_price),
                print_locations,
                logo: req.logo,
                design: req.design,
                customizations: req.customizations,
            });
            (id.clone(), QuoteEvent::ItemAdded { item_id: id })
        } else {
            let key = identity_key(&req.product.id, &req.color.name, print_locations);
            if let Some(existing) = self.items.iter_mut().find(|i| i.id == key) {
                let added_quantity = req.sizes.total();
                existing.sizes.merge(&req.sizes);
                // Latest price wins; pricing may be volume-dependent and the
                // most recent computation is authoritative.
                existing.unit_price = Some(unit_price);
                if req.logo.is_some() {
                    existing.logo = req.logo;
                }
                if req.design.is_some() {
                    existing.design = req.design;
                }
                (key.clone(), QuoteEvent::ItemMerged { item_id: key, added_quantity })
            } else {
                self.items.push(QuoteItem {
                    id: key.clone(),
                    product: Some(req.product),
                    color: Some(req.color),
                    sizes: req.sizes,
                    unit_price: Some(unit_price),
                    print_locations,
                    logo: req.logo,
                    design: req.design,
                    customizations: Vec::new(),
                });
                (key.clone(), QuoteEvent::ItemAdded { item_id: key })
            }
        };

        self.notify(event);
        self.persist();
        id
    }

    /// Remove by id. A miss is a no-op: nothing changes, nothing is raised.
    pub fn remove_item(&mut self, item_id: &str) {
        let before = self.items.len();
        self.items.retain(|i| i.id != item_id);
        if self.items.len() != before {
            self.notify(QuoteEvent::ItemRemoved { item_id: item_id.to_string() });
            self.persist();
        }
    }

    /// Empty the basket and the persisted snapshot.
    pub fn clear(&mut self) {
        self.items.clear();
        self.notify(QuoteEvent::Cleared);
        self.persist();
    }

    /// Called after the intake endpoint confirms a submission. Removes only
    /// the items that were part of the submitted payload; anything added
    /// while the submission was in flight stays queued for the next one.
    pub fn complete_submission(&mut self, reference: &str, submitted_ids: &[String]) {
        self.items.retain(|i| !submitted_ids.iter().any(|id| id == &i.id));
        self.notify(QuoteEvent::Submitted { reference: reference.to_string() });
        self.persist();
    }

    /// Sum of `unit_price × quantity` across items. Partially malformed
    /// items contribute zero rather than erroring.
    pub fn estimated_total(&self) -> Decimal {
        self.items.iter().fold(Decimal::ZERO, |acc, i| acc + i.line_total())
    }

    pub fn take_events(&mut self) -> Vec<QuoteEvent> {
        std::mem::take(&mut self.events)
    }

    fn notify(&mut self, event: QuoteEvent) {
        for subscriber in &self.subscribers {
            subscriber(&event);
        }
        self.events.push(event);
    }

    fn persist(&self) {
        if let Err(e) = self.storage.save(&self.items) {
            tracing::warn!(error = %e, "quote snapshot save failed, keeping in-memory state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn product(id: &str, price: i64) -> CatalogProduct {
        CatalogProduct {
            id: id.into(),
            name: format!("Product {id}"),
            collection_group: Some("Performance".into()),
            price: Decimal::from(price),
            colors: vec![],
            sizes: vec!["S".into(), "M".into(), "L".into()],
            customizable: true,
            moq: None,
        }
    }

    fn color(name: &str) -> ColorChoice {
        ColorChoice { name: name.into(), hex: "#123456".into() }
    }

    fn basket() -> QuoteBasket {
        QuoteBasket::new(Box::new(MemoryStorage::new()))
    }

    #[test]
    fn test_readding_same_configuration_merges_quantities() {
        let mut basket = basket();
        basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 2)])));
        basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 3)])));
        assert_eq!(basket.len(), 1);
        assert_eq!(basket.items()[0].sizes.get("M"), 5);
    }

    #[test]
    fn test_merge_takes_latest_unit_price() {
        let mut basket = basket();
        basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 2)])));
        let mut again = AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 10)]));
        again.unit_price = Some(Decimal::from(90));
        basket.add_item(again);
        assert_eq!(basket.items()[0].unit_price, Some(Decimal::from(90)));
    }

    #[test]
    fn test_print_location_count_separates_items() {
        let mut basket = basket();
        basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)])));
        let mut two_locations = AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)]));
        two_locations.print_locations = Some(2);
        basket.add_item(two_locations);
        assert_eq!(basket.len(), 2);
    }

    #[test]
    fn test_customized_batches_never_merge() {
        let mut basket = basket();
        let mut req = AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)]));
        req.customizations = vec![Customization { name: "SMITH".into(), number: "7".into(), size: "M".into() }];
        let first = basket.add_item(req.clone());
        let second = basket.add_item(req);
        assert_eq!(basket.len(), 2);
        assert_ne!(first, second);
    }

    #[test]
    fn test_merge_preserves_attachments_unless_replaced() {
        let logo = Attachment { filename: "logo.png".into(), content_type: "image/png".into(), bytes: vec![1, 2, 3] };
        let mut basket = basket();
        let mut with_logo = AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)]));
        with_logo.logo = Some(logo.clone());
        basket.add_item(with_logo);

        // Re-add without files: existing logo survives.
        basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)])));
        assert_eq!(basket.items()[0].logo, Some(logo));

        // Re-add with a new design file: it lands on the merged item.
        let design = Attachment { filename: "art.svg".into(), content_type: "image/svg+xml".into(), bytes: vec![9] };
        let mut with_design = AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)]));
        with_design.design = Some(design.clone());
        basket.add_item(with_design);
        assert_eq!(basket.items()[0].design, Some(design));
    }

    #[test]
    fn test_removing_unknown_id_is_a_noop() {
        let mut basket = basket();
        basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)])));
        basket.take_events();
        basket.remove_item("no-such-item");
        assert_eq!(basket.len(), 1);
        assert!(basket.take_events().is_empty());
    }

    #[test]
    fn test_estimated_total() {
        let mut basket = basket();
        basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("S", 1), ("M", 2)])));
        basket.add_item(AddItem::new(product("p2", 50), color("Red"), SizeQuantities::of(&[("L", 1)])));
        assert_eq!(basket.estimated_total(), Decimal::from(350));
    }

    #[test]
    fn test_malformed_item_contributes_zero() {
        let no_sizes = QuoteItem {
            id: "broken".into(),
            product: Some(product("p1", 100)),
            color: Some(color("Blue")),
            sizes: SizeQuantities::new(),
            unit_price: Some(Decimal::from(100)),
            print_locations: 1,
            logo: None,
            design: None,
            customizations: vec![],
        };
        assert_eq!(no_sizes.line_total(), Decimal::ZERO);

        let no_price = QuoteItem { unit_price: None, sizes: SizeQuantities::of(&[("M", 4)]), ..no_sizes };
        assert_eq!(no_price.line_total(), Decimal::ZERO);
    }

    #[test]
    fn test_clear_empties_memory_and_snapshot() {
        let storage = MemoryStorage::new();
        let mut basket = QuoteBasket::new(Box::new(storage.clone()));
        basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)])));
        assert_eq!(storage.stored().len(), 1);
        basket.clear();
        assert!(basket.is_empty());
        assert!(storage.stored().is_empty());
    }

    #[test]
    fn test_submission_keeps_items_added_while_in_flight() {
        let storage = MemoryStorage::new();
        let mut basket = QuoteBasket::new(Box::new(storage.clone()));
        basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)])));
        let submitted: Vec<String> = basket.items().iter().map(|i| i.id.clone()).collect();

        // A second add lands between the payload snapshot and the intake
        // confirmation; it must survive the post-confirmation removal.
        let late = basket.add_item(AddItem::new(product("p2", 50), color("Red"), SizeQuantities::of(&[("L", 2)])));

        basket.complete_submission("ORD-1724500000000", &submitted);
        assert_eq!(basket.len(), 1);
        assert_eq!(basket.items()[0].id, late);
        let persisted = storage.stored();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].id, late);
    }

    #[test]
    fn test_reload_strips_attachments_but_keeps_quantities() {
        let storage = MemoryStorage::new();
        let mut basket = QuoteBasket::new(Box::new(storage.clone()));
        let mut req = AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 2)]));
        req.logo = Some(Attachment { filename: "logo.png".into(), content_type: "image/png".into(), bytes: vec![1] });
        basket.add_item(req);

        let reloaded = QuoteBasket::load(Box::new(storage));
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.items()[0].sizes.get("M"), 2);
        assert_eq!(reloaded.items()[0].logo, None);
    }

    #[test]
    fn test_subscribers_and_events_see_every_mutation() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let mut basket = basket();
        basket.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let id = basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)])));
        basket.add_item(AddItem::new(product("p1", 100), color("Blue"), SizeQuantities::of(&[("M", 1)])));
        basket.remove_item(&id);
        basket.clear();
        assert_eq!(seen.load(Ordering::SeqCst), 4);

        let events = basket.take_events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[1], QuoteEvent::ItemMerged { item_id: id.clone(), added_quantity: 1 });
        assert_eq!(events[2], QuoteEvent::ItemRemoved { item_id: id });
        assert_eq!(events[3], QuoteEvent::Cleared);
        assert!(basket.take_events().is_empty());
    }

    #[test]
    fn test_normalize_drops_incomplete_rows() {
        let good = QuoteItem {
            id: "good".into(),
            product: Some(product("p1", 100)),
            color: Some(color("Blue")),
            sizes: SizeQuantities::of(&[("M", 1)]),
            unit_price: Some(Decimal::from(100)),
            print_locations: 1,
            logo: None,
            design: None,
            customizations: vec![],
        };
        let no_product = QuoteItem { product: None, id: "no-product".into(), ..good.clone() };
        let no_color = QuoteItem { color: None, id: "no-color".into(), ..good.clone() };
        let no_sizes = QuoteItem { sizes: SizeQuantities::new(), id: "no-sizes".into(), ..good.clone() };

        let kept = normalize_items(vec![no_product, good.clone(), no_color, no_sizes]);
        assert_eq!(kept, vec![good]);
    }
}
