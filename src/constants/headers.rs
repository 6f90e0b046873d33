pub const AUTH_TOKEN: &str = "X-Auth-Token";
pub const FIWARE_SERVICE: &str = "fiware-service";
pub const CONTENT_TYPE_JSON: &str = "application/json";
