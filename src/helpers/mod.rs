mod backoff_retry;
mod load_dotenv;
mod time;

pub use backoff_retry::{backoff_retry, into_inner};
pub use load_dotenv::load_dotenv;
pub use time::{iso_millis, parse_iso};
