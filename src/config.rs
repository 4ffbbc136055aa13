use std::env;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub enable_file_logs: bool,
    pub log_dir: String,
    pub sled_path: String,
    pub cors_origin: String,
    pub queue: QueueConfig,
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue length served when the caller does not ask for one.
    pub default_limit: usize,
    pub max_limit: usize,
    /// Upper bound on due records read per learner before ranking.
    pub max_due_scan: usize,
    /// Largest candidate list accepted by the stateless ranking endpoint.
    pub max_batch_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 200,
            max_due_scan: 5_000,
            max_batch_size: 1_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub is_leader: bool,
    pub enable_queue_snapshot: bool,
    pub queue_snapshot_cron: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            is_leader: true,
            enable_queue_snapshot: true,
            queue_snapshot_cron: "0 15 3 * * *".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let queue_defaults = QueueConfig::default();
        let worker_defaults = WorkerConfig::default();

        let mut queue = QueueConfig {
            default_limit: env_or_parse("QUEUE_DEFAULT_LIMIT", queue_defaults.default_limit),
            max_limit: env_or_parse("QUEUE_MAX_LIMIT", queue_defaults.max_limit),
            max_due_scan: env_or_parse("QUEUE_MAX_DUE_SCAN", queue_defaults.max_due_scan),
            max_batch_size: env_or_parse("MAX_BATCH_SIZE", queue_defaults.max_batch_size),
        };
        if queue.max_limit == 0 {
            tracing::warn!("QUEUE_MAX_LIMIT must be positive, using default");
            queue.max_limit = queue_defaults.max_limit;
        }
        queue.default_limit = queue.default_limit.clamp(1, queue.max_limit);

        Self {
            host: env_or_parse("HOST", IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))),
            port: env_or_parse("PORT", 3000_u16),
            log_level: env_or("RUST_LOG", "info"),
            enable_file_logs: env_or_bool("ENABLE_FILE_LOGS", false),
            log_dir: env_or("LOG_DIR", "./logs"),
            sled_path: env_or("SLED_PATH", "./data/review-scheduler.sled"),
            cors_origin: env_or("CORS_ORIGIN", "http://localhost:5173"),
            queue,
            worker: WorkerConfig {
                is_leader: env_or_bool("WORKER_LEADER", worker_defaults.is_leader),
                enable_queue_snapshot: env_or_bool(
                    "ENABLE_QUEUE_SNAPSHOT_WORKER",
                    worker_defaults.enable_queue_snapshot,
                ),
                queue_snapshot_cron: env_or(
                    "QUEUE_SNAPSHOT_CRON",
                    &worker_defaults.queue_snapshot_cron,
                ),
            },
        }
    }
}

pub fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

pub fn env_or_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy,
{
    match env::var(key) {
        Ok(raw) => match raw.parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!(
                    key,
                    value = %raw,
                    "Failed to parse env var, using default"
                );
                default
            }
        },
        Err(_) => default,
    }
}

pub fn env_or_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
