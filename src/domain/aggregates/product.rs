//! Catalog entry snapshot.
//!
//! Quote items carry a full copy of the catalog entry as it looked when the
//! shopper confirmed the configuration. Later catalog edits never
//! retroactively change an already-queued item, and a queued item stays
//! renderable even if the entry is deleted.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::ColorChoice;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: String,
    pub name: String,
    /// Collection group used for navigation and as the product's URL path
    /// segment. Absent for entries not merchandised under any group.
    #[serde(default)]
    pub collection_group: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub colors: Vec<ColorChoice>,
    #[serde(default)]
    pub sizes: Vec<String>,
    /// Jersey-type goods accept per-unit name/number customization.
    #[serde(default)]
    pub customizable: bool,
    /// Minimum order quantity. Informational only; nothing in this
    /// subsystem enforces it.
    #[serde(default)]
    pub moq: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_tolerates_sparse_json() {
        let p: CatalogProduct =
            serde_json::from_str(r#"{"id":"tee-01","name":"Basic Tee","price":"45"}"#).unwrap();
        assert_eq!(p.collection_group, None);
        assert!(p.colors.is_empty());
        assert!(!p.customizable);
        assert_eq!(p.price, Decimal::from(45));
    }
}
