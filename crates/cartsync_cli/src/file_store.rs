//! JSON file-backed item store.

use cartsync_engine::{Item, ItemId, ItemStore, StoreError, StoreResult, Watermark};
use chrono::Utc;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk layout of the data file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DataFile {
    #[serde(default)]
    last_sync_timestamp: Watermark,
    #[serde(default)]
    items: Vec<Item>,
}

/// Item store persisted as a single JSON document.
///
/// Holds the last successful watermark next to the items. Every mutation
/// rewrites the file through a temporary sibling and a rename; the
/// in-memory copy only changes once the write has succeeded.
pub struct FileItemStore {
    path: PathBuf,
    data: Mutex<DataFile>,
}

impl FileItemStore {
    /// Opens the data file at `path`, starting empty if it does not exist.
    pub fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let data = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
                StoreError::Backend(format!("{} is not a valid data file: {err}", path.display()))
            })?,
            Err(err) if err.kind() == ErrorKind::NotFound => DataFile::default(),
            Err(err) => {
                return Err(StoreError::Backend(format!(
                    "failed to read {}: {err}",
                    path.display()
                )))
            }
        };

        Ok(Self {
            path,
            data: Mutex::new(data),
        })
    }

    /// Returns the data file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the persisted watermark.
    pub fn watermark(&self) -> Watermark {
        self.data.lock().last_sync_timestamp
    }

    /// Persists a new watermark.
    pub fn set_watermark(&self, watermark: Watermark) -> StoreResult<()> {
        self.mutate(|data| {
            data.last_sync_timestamp = watermark;
            Ok(())
        })
    }

    /// Finds the single item whose id starts with `prefix`.
    pub fn resolve(&self, prefix: &str) -> StoreResult<Item> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(StoreError::InvalidInput("item id must not be empty".into()));
        }

        let data = self.data.lock();
        let mut matches = data
            .items
            .iter()
            .filter(|item| item.sync_id.as_str().starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(item), None) => Ok(item.clone()),
            (Some(_), Some(_)) => Err(StoreError::InvalidInput(format!(
                "id prefix {prefix:?} matches more than one item"
            ))),
            (None, _) => Err(StoreError::NotFound(prefix.to_string())),
        }
    }

    /// Applies `change` to a copy of the data, writes it, then commits it.
    fn mutate<F, R>(&self, change: F) -> StoreResult<R>
    where
        F: FnOnce(&mut DataFile) -> StoreResult<R>,
    {
        let mut data = self.data.lock();
        let mut updated = data.clone();
        let result = change(&mut updated)?;
        self.write(&updated)?;
        *data = updated;
        Ok(result)
    }

    fn write(&self, data: &DataFile) -> StoreResult<()> {
        let backend = |err: std::io::Error| {
            StoreError::Backend(format!("failed to write {}: {err}", self.path.display()))
        };

        let bytes = serde_json::to_vec_pretty(data)
            .map_err(|err| StoreError::Backend(format!("failed to encode data file: {err}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(backend)?;
        }
        let mut temp = self.path.clone().into_os_string();
        temp.push(".tmp");
        let temp = PathBuf::from(temp);
        fs::write(&temp, bytes).map_err(backend)?;
        fs::rename(&temp, &self.path).map_err(backend)?;

        debug!(path = %self.path.display(), items = data.items.len(), "data file written");
        Ok(())
    }

    fn modify_item<F>(&self, sync_id: &ItemId, change: F) -> StoreResult<Item>
    where
        F: FnOnce(&mut Item) -> StoreResult<()>,
    {
        self.mutate(|data| {
            let item = data
                .items
                .iter_mut()
                .find(|item| &item.sync_id == sync_id)
                .ok_or_else(|| StoreError::NotFound(sync_id.to_string()))?;
            change(item)?;
            Ok(item.clone())
        })
    }
}

impl ItemStore for FileItemStore {
    fn fetch_all(&self) -> StoreResult<Vec<Item>> {
        Ok(self.data.lock().items.clone())
    }

    fn create(&self, name: &str, quantity: u32, note: Option<&str>) -> StoreResult<Item> {
        self.create_with_id(&ItemId::generate(), name, quantity, note)
    }

    fn create_with_id(
        &self,
        sync_id: &ItemId,
        name: &str,
        quantity: u32,
        note: Option<&str>,
    ) -> StoreResult<Item> {
        let item = Item::new(sync_id.clone(), name, quantity, note, Utc::now())?;
        self.mutate(|data| {
            if data.items.iter().any(|existing| existing.sync_id == item.sync_id) {
                return Err(StoreError::AlreadyExists(item.sync_id.to_string()));
            }
            data.items.push(item.clone());
            Ok(item)
        })
    }

    fn update(
        &self,
        item: &Item,
        name: &str,
        quantity: u32,
        note: Option<&str>,
    ) -> StoreResult<Item> {
        self.modify_item(&item.sync_id, |stored| {
            stored.edit(name, quantity, note, Utc::now())
        })
    }

    fn delete(&self, item: &Item) -> StoreResult<()> {
        self.mutate(|data| {
            let before = data.items.len();
            data.items.retain(|existing| existing.sync_id != item.sync_id);
            if data.items.len() == before {
                return Err(StoreError::NotFound(item.sync_id.to_string()));
            }
            Ok(())
        })
    }

    fn set_bought(&self, item: &Item, bought: bool) -> StoreResult<Item> {
        self.modify_item(&item.sync_id, |stored| {
            stored.mark_bought(bought, Utc::now());
            Ok(())
        })
    }
}
