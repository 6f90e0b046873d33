pub mod fiware_api;

pub use fiware_api::{FiwareClient, FiwareError, OrionUploader};
