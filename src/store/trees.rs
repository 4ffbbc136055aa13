pub const REVIEW_RECORDS: &str = "review_records";
pub const REVIEW_DUE_INDEX: &str = "review_due_index";
pub const REVIEW_ITEMS: &str = "review_items";
pub const QUEUE_SNAPSHOTS: &str = "queue_snapshots";
pub const CONFIG_VERSIONS: &str = "config_versions";
