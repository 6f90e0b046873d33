use anyhow::Result;
use fiware_admin::interfaces::FiwareClient;

use super::report::report_batches;
use crate::argsets::CommonArgs;

pub fn delete(client: &FiwareClient, common: &CommonArgs) -> Result<()> {
    log::info!("Deleting entities...");
    let results = client.delete_all_entities(common.entity_type.as_deref(), common.max_bytes)?;
    report_batches(&results)
}
