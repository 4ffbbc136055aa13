use crate::store::{keys, operations::review_records::ReviewRecord};
use crate::store::{Store, StoreError};

const VERSION_KEY: &str = "_meta:version";

type MigrationFn = fn(&Store) -> Result<(), StoreError>;

fn migrations() -> Vec<(&'static str, MigrationFn)> {
    vec![
        ("001_initial", m001_initial),
        ("002_review_due_index", m002_review_due_index),
    ]
}

/// Applies every migration newer than the stored version.
///
/// Each migration must be idempotent: a crash between the migration body and
/// `set_version` re-runs it on the next start. The version is persisted after
/// every step and never moves backwards.
pub fn run(store: &Store) -> Result<(), StoreError> {
    let current = get_current_version(store)?;

    for (index, (name, func)) in migrations().iter().enumerate() {
        let version = (index + 1) as u32;
        if version > current {
            tracing::info!(version, name, "Running migration");
            func(store)?;
            set_version(store, version)?;
            tracing::info!(version, name, "Migration complete");
        } else {
            tracing::debug!(version, name, "Migration already applied, skipping");
        }
    }

    Ok(())
}

pub fn get_current_version(store: &Store) -> Result<u32, StoreError> {
    match store.config_versions.get(VERSION_KEY.as_bytes())? {
        Some(raw) => {
            let bytes: [u8; 4] = raw.as_ref().try_into().map_err(|_| StoreError::Migration {
                version: 0,
                message: format!("stored version has {} bytes, expected 4", raw.len()),
            })?;
            Ok(u32::from_be_bytes(bytes))
        }
        None => Ok(0),
    }
}

pub fn set_version(store: &Store, version: u32) -> Result<(), StoreError> {
    let current = get_current_version(store)?;
    if version < current {
        return Err(StoreError::Migration {
            version,
            message: format!("Refuse to downgrade from {} to {}", current, version),
        });
    }

    store
        .config_versions
        .insert(VERSION_KEY.as_bytes(), &version.to_be_bytes())?;
    Ok(())
}

fn m001_initial(_store: &Store) -> Result<(), StoreError> {
    Ok(())
}

fn m002_review_due_index(store: &Store) -> Result<(), StoreError> {
    for item in store.review_records.iter() {
        let (_, value) = item?;
        let record: ReviewRecord = Store::deserialize(&value)?;

        if let Some(next_review_at) = record.next_review_at {
            let due_index_key = keys::review_due_index_key(
                &record.learner_id,
                next_review_at.timestamp_millis(),
                &record.item_id,
            )?;
            store.review_due_index.insert(due_index_key.as_bytes(), &[])?;
        }
    }

    Ok(())
}
