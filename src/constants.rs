/// Upper bound, in days, used when turning an interval into a due date.
/// Intervals themselves may grow past it; the due date just stops moving.
pub const MAX_SCHEDULE_DAYS: u32 = 36_500;

/// Maximum request body size: 256 KiB.
pub const MAX_BODY_SIZE: usize = 256 * 1024;
