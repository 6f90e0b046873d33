use std::path::PathBuf;

use fiware_admin::data_mgmt::models::MeasurementRequest;

/// Options shared by every subcommand.
pub struct CommonArgs {
    pub config: PathBuf,
    pub service: Option<String>,
    pub entity_type: Option<String>,
    pub key_values: bool,
    pub max_bytes: usize,
}

pub struct UploadArgs {
    pub data_file: PathBuf,
    pub auto_batch: bool,
}

pub struct GenerateArgs {
    pub min: i64,
    pub max: i64,
    pub count: usize,
    pub metadata_file: Option<PathBuf>,
}

pub struct QueryArgs {
    pub request: MeasurementRequest,
}
