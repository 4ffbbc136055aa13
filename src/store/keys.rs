use crate::store::StoreError;

const MAX_ID_LEN: usize = 128;

fn ensure_safe_id(kind: &str, value: &str) -> Result<(), StoreError> {
    if value.is_empty() {
        return Err(StoreError::Validation(format!("{kind} must not be empty")));
    }
    if value.len() > MAX_ID_LEN {
        return Err(StoreError::Validation(format!(
            "{kind} must be at most {MAX_ID_LEN} bytes"
        )));
    }
    if value.contains(':') {
        return Err(StoreError::Validation(format!(
            "{kind} must not contain ':'"
        )));
    }
    Ok(())
}

pub fn review_record_key(learner_id: &str, item_id: &str) -> Result<String, StoreError> {
    ensure_safe_id("learner_id", learner_id)?;
    ensure_safe_id("item_id", item_id)?;
    Ok(format!("{}:{}", learner_id, item_id))
}

pub fn review_record_prefix(learner_id: &str) -> Result<String, StoreError> {
    ensure_safe_id("learner_id", learner_id)?;
    Ok(format!("{}:", learner_id))
}

/// `{learner}:{due_ts_ms:020}:{item}`, so a prefix scan walks due dates in
/// ascending order.
pub fn review_due_index_key(
    learner_id: &str,
    due_ts_ms: i64,
    item_id: &str,
) -> Result<String, StoreError> {
    ensure_safe_id("learner_id", learner_id)?;
    ensure_safe_id("item_id", item_id)?;
    let ts = due_ts_ms.max(0) as u64;
    Ok(format!("{}:{:020}:{}", learner_id, ts, item_id))
}

pub fn review_due_index_prefix(learner_id: &str) -> Result<String, StoreError> {
    review_record_prefix(learner_id)
}

pub fn parse_due_index_item_key(key: &[u8]) -> Option<(i64, String)> {
    let text = std::str::from_utf8(key).ok()?;
    let mut parts = text.splitn(3, ':');
    let _learner = parts.next()?;
    let ts = parts.next()?.parse::<u64>().ok()?;
    let item_id = parts.next()?;
    if item_id.is_empty() {
        return None;
    }
    Some((i64::try_from(ts).ok()?, item_id.to_string()))
}

/// Learner id portion of a review record key.
pub fn learner_of_record_key(key: &[u8]) -> Option<&str> {
    let sep = key.iter().position(|b| *b == b':')?;
    std::str::from_utf8(&key[..sep]).ok()
}

pub fn review_item_key(item_id: &str) -> Result<String, StoreError> {
    ensure_safe_id("item_id", item_id)?;
    Ok(item_id.to_string())
}

pub fn queue_snapshot_key(learner_id: &str) -> Result<String, StoreError> {
    ensure_safe_id("learner_id", learner_id)?;
    Ok(learner_id.to_string())
}
