//! Durable snapshot persistence.
//!
//! The catalog survives restarts and failed refreshes as a single CSV file
//! (fixed column order = the `Shoe` fields). Saves are idempotent overwrites;
//! a missing file loads as an empty catalog. The write goes to a temp sibling
//! first and is renamed into place, so a torn write can never replace the
//! previous good snapshot.

use crate::error::{Error, Result};
use crate::models::Shoe;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

// ── Store contract ────────────────────────────────────────────────────────────

/// Last-known-good catalog persistence. Single writer (the refresh path);
/// the fallback-load path may read concurrently.
pub trait SnapshotStore: Send + Sync {
    fn save(&self, shoes: &[Shoe]) -> Result<()>;
    fn load(&self) -> Result<Vec<Shoe>>;
}

// ── CSV-backed store ──────────────────────────────────────────────────────────

pub struct CsvSnapshotStore {
    path: PathBuf,
}

impl CsvSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut p = self.path.clone().into_os_string();
        p.push(".tmp");
        PathBuf::from(p)
    }
}

impl SnapshotStore for CsvSnapshotStore {
    fn save(&self, shoes: &[Shoe]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .map_err(|e| Error::Store(format!("create dir {:?}: {}", parent, e)))?;
            }
        }

        let tmp = self.tmp_path();
        {
            let mut writer = csv::Writer::from_path(&tmp)
                .map_err(|e| Error::Store(format!("open {:?}: {}", tmp, e)))?;
            for shoe in shoes {
                writer
                    .serialize(shoe)
                    .map_err(|e| Error::Store(format!("serialize record: {}", e)))?;
            }
            writer
                .flush()
                .map_err(|e| Error::Store(format!("flush {:?}: {}", tmp, e)))?;
        }

        fs::rename(&tmp, &self.path)
            .map_err(|e| Error::Store(format!("rename {:?} -> {:?}: {}", tmp, self.path, e)))?;

        debug!("Snapshot saved: {} records -> {:?}", shoes.len(), self.path);
        Ok(())
    }

    fn load(&self) -> Result<Vec<Shoe>> {
        if !self.path.exists() {
            debug!("No snapshot at {:?}", self.path);
            return Ok(Vec::new());
        }

        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| Error::Store(format!("open {:?}: {}", self.path, e)))?;

        let mut shoes = Vec::new();
        for (i, row) in reader.deserialize::<Shoe>().enumerate() {
            match row {
                Ok(shoe) if !shoe.name.trim().is_empty() => shoes.push(shoe),
                Ok(_) => warn!("Row {} in {:?}: empty name, skipped", i + 1, self.path),
                Err(e) => warn!("Row {} in {:?}: {}", i + 1, self.path, e),
            }
        }

        debug!("Snapshot loaded: {} records from {:?}", shoes.len(), self.path);
        Ok(shoes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PRICE_UNKNOWN;

    fn shoe(name: &str, price: &str) -> Shoe {
        Shoe {
            name: name.to_string(),
            image_url: format!("https://img.example/{name}.jpg"),
            release_text: "01.03.2025 09:00".to_string(),
            price_text: price.to_string(),
        }
    }

    #[test]
    fn save_then_load_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSnapshotStore::new(dir.path().join("shoes.csv"));

        let shoes = vec![shoe("Nike Air Max", "169,95 €"), shoe("Adidas Samba", PRICE_UNKNOWN)];
        store.save(&shoes).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded, shoes);
    }

    #[test]
    fn load_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSnapshotStore::new(dir.path().join("nowhere.csv"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSnapshotStore::new(dir.path().join("shoes.csv"));

        store.save(&[shoe("Old", "100 €")]).unwrap();
        store.save(&[shoe("New", "200 €")]).unwrap();

        let loaded = store.load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "New");
        // the staging file never sticks around after a completed save
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvSnapshotStore::new(dir.path().join("deep/nested/shoes.csv"));
        store.save(&[shoe("Nike Dunk Low", "119,99 €")]).unwrap();
        assert_eq!(store.load().unwrap().len(), 1);
    }
}
