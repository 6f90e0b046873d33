use std::time::Duration;

pub const API_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const RETRY_MAX_ELAPSED: Duration = Duration::from_secs(120);
pub const LOG_LEVEL: &str = "INFO";

// Orion rejects request payloads above 1 MiB
pub const MAX_BATCH_BYTES: usize = 1024 * 1024;
pub const PAGE_LIMIT: usize = 1000;
pub const MAX_RESPONSE_BYTES: u64 = 256 * 1024 * 1024;

pub const GENERATED_ENTITY_TYPE: &str = "RandomMeasurement";
pub const GENERATED_MIN: i64 = 0;
pub const GENERATED_MAX: i64 = 100;
pub const GENERATED_COUNT: usize = 100;
