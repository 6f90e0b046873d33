use std::fs;

use anyhow::{anyhow, bail, Context, Result};
use fiware_admin::data_mgmt::GateOutcome;
use fiware_admin::interfaces::FiwareClient;
use serde_json::Value;

use super::report::report_batches;
use crate::argsets::{CommonArgs, UploadArgs};

pub fn upload(client: &FiwareClient, common: &CommonArgs, args: UploadArgs) -> Result<()> {
    let data_raw = fs::read_to_string(&args.data_file)
        .with_context(|| format!("data file {} could not be read", args.data_file.display()))?;
    let entities: Vec<Value> = serde_json::from_str(&data_raw)
        .context("data file must contain a JSON array of entities")?;

    if args.auto_batch {
        let results =
            client.batch_and_upload_entities(&entities, common.key_values, common.max_bytes)?;
        return report_batches(&results);
    }

    match client.upload_entities_with_size_check(&entities, common.key_values, common.max_bytes)? {
        GateOutcome::Uploaded(result) => {
            println!("Upload result: {result}");
            if !result.is_success() {
                bail!("upload failed with {result}");
            }
            Ok(())
        }
        GateOutcome::Rejected(rejection) => Err(anyhow!(
            "{rejection}; use --auto-batch to split the upload"
        )),
    }
}
