use std::fs;

use anyhow::{Context, Result};
use chrono::Utc;
use fiware_admin::constants::defaults;
use fiware_admin::data_mgmt::generate::{add_metadata, generate_time_series};
use fiware_admin::interfaces::FiwareClient;
use serde_json::{Map, Value};

use super::report::report_batches;
use crate::argsets::{CommonArgs, GenerateArgs};

pub fn generate(client: &FiwareClient, common: &CommonArgs, args: GenerateArgs) -> Result<()> {
    let entity_type = common
        .entity_type
        .as_deref()
        .unwrap_or(defaults::GENERATED_ENTITY_TYPE);
    let mut entities = generate_time_series(
        &mut rand::thread_rng(),
        entity_type,
        args.min,
        args.max,
        args.count,
        Utc::now(),
    )?;

    if let Some(path) = &args.metadata_file {
        let metadata_raw = fs::read_to_string(path)
            .with_context(|| format!("metadata file {} could not be read", path.display()))?;
        let metadata: Map<String, Value> = serde_json::from_str(&metadata_raw)
            .context("metadata file must contain a JSON object of attributes")?;
        add_metadata(&mut entities, &metadata)?;
    }

    println!("----------- Generated measurements -----------\n");
    println!("{}", serde_json::to_string_pretty(&entities)?);

    let results = client.batch_and_upload_entities(&entities, false, common.max_bytes)?;
    report_batches(&results)
}
