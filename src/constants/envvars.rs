pub const LOG_LEVEL: &str = "LOG_LEVEL";

pub const FIWARE_ENDPOINT: &str = "FIWARE_ENDPOINT";
pub const FIWARE_TOKEN: &str = "FIWARE_TOKEN";
pub const FIWARE_SERVICE: &str = "FIWARE_SERVICE";
