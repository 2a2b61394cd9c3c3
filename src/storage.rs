//! Persistence boundary for the quote basket.
//!
//! The original storefront kept the basket under a single browser-storage
//! key. Here the boundary is an explicit trait so a failed write is a
//! visible `Result` instead of a swallowed console line; the basket still
//! treats saves as best-effort. Attachments are serde-skipped and never
//! survive a save.

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::domain::aggregates::quote::QuoteItem;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] serde_json::Error),
}

pub trait QuoteStorage: Send + Sync {
    fn load(&self) -> Result<Vec<QuoteItem>, StorageError>;
    fn save(&self, items: &[QuoteItem]) -> Result<(), StorageError>;
}

/// One JSON array per basket, in a file. Loading a snapshot that was never
/// written yields an empty basket.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl QuoteStorage for JsonFileStorage {
    fn load(&self) -> Result<Vec<QuoteItem>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn save(&self, items: &[QuoteItem]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(items)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

/// In-process snapshot for tests and ephemeral sessions. Clones share the
/// underlying snapshot, so a test can hand one handle to a basket and keep
/// another to inspect what got persisted.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    snapshot: Arc<Mutex<Option<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Items currently persisted, for assertions.
    pub fn stored(&self) -> Vec<QuoteItem> {
        let guard = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        guard
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
            .unwrap_or_default()
    }
}

impl QuoteStorage for MemoryStorage {
    fn load(&self) -> Result<Vec<QuoteItem>, StorageError> {
        let guard = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_deref() {
            Some(raw) => Ok(serde_json::from_str(raw)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, items: &[QuoteItem]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(items)?;
        let mut guard = self.snapshot.lock().unwrap_or_else(|e| e.into_inner());
        *guard = Some(raw);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::product::CatalogProduct;
    use crate::domain::value_objects::{ColorChoice, SizeQuantities};
    use rust_decimal::Decimal;

    fn item(id: &str) -> QuoteItem {
        QuoteItem {
            id: id.into(),
            product: Some(CatalogProduct {
                id: "p1".into(),
                name: "Jersey".into(),
                collection_group: Some("Performance".into()),
                price: Decimal::from(100),
                colors: vec![],
                sizes: vec![],
                customizable: false,
                moq: None,
            }),
            color: Some(ColorChoice { name: "Blue".into(), hex: "#0000ff".into() }),
            sizes: SizeQuantities::of(&[("M", 2)]),
            unit_price: Some(Decimal::from(100)),
            print_locations: 1,
            logo: None,
            design: None,
            customizations: vec![],
        }
    }

    #[test]
    fn test_file_storage_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("quote-snapshot-{}.json", uuid::Uuid::new_v4().simple()));
        let storage = JsonFileStorage::new(&path);
        assert!(storage.load().unwrap().is_empty());

        storage.save(&[item("a"), item("b")]).unwrap();
        let loaded = storage.load().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, "a");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_file_storage_reports_corrupt_snapshot() {
        let path = std::env::temp_dir()
            .join(format!("quote-snapshot-{}.json", uuid::Uuid::new_v4().simple()));
        fs::write(&path, "{not json").unwrap();
        let storage = JsonFileStorage::new(&path);
        assert!(matches!(storage.load(), Err(StorageError::Corrupt(_))));
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_memory_storage_shares_snapshot_across_clones() {
        let storage = MemoryStorage::new();
        let handle = storage.clone();
        storage.save(&[item("a")]).unwrap();
        assert_eq!(handle.stored().len(), 1);
        assert_eq!(handle.load().unwrap()[0].id, "a");
    }
}
