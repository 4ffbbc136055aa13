pub mod queue_snapshots;
pub mod review_items;
pub mod review_records;
