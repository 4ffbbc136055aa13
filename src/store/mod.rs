pub mod keys;
pub mod migrate;
pub mod operations;
pub mod trees;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::Db;
use thiserror::Error;

#[derive(Debug)]
pub struct Store {
    db: Db,
    pub review_records: sled::Tree,
    pub review_due_index: sled::Tree,
    pub review_items: sled::Tree,
    pub queue_snapshots: sled::Tree,
    pub config_versions: sled::Tree,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("migration error at version {version}: {message}")]
    Migration { version: u32, message: String },
}

impl Store {
    pub fn open(sled_path: &str) -> Result<Self, StoreError> {
        let db = sled::open(sled_path)?;
        let review_records = db.open_tree(trees::REVIEW_RECORDS)?;
        let review_due_index = db.open_tree(trees::REVIEW_DUE_INDEX)?;
        let review_items = db.open_tree(trees::REVIEW_ITEMS)?;
        let queue_snapshots = db.open_tree(trees::QUEUE_SNAPSHOTS)?;
        let config_versions = db.open_tree(trees::CONFIG_VERSIONS)?;

        Ok(Self {
            db,
            review_records,
            review_due_index,
            review_items,
            queue_snapshots,
            config_versions,
        })
    }

    pub fn run_migrations(&self) -> Result<(), StoreError> {
        migrate::run(self)
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }

    /// Cheap read used by the database health probe.
    pub fn ping(&self) -> Result<(), StoreError> {
        self.config_versions.get(b"_meta:version")?;
        Ok(())
    }

    pub(crate) fn serialize<T: Serialize>(value: &T) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(value)?)
    }

    pub(crate) fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
