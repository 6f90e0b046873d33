use anyhow::Result;
use fiware_admin::interfaces::FiwareClient;

use crate::argsets::CommonArgs;

pub fn fetch(client: &FiwareClient, common: &CommonArgs) -> Result<()> {
    log::info!("Fetching all entities...");
    let entities = client.get_all_entities(common.entity_type.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&entities)?);
    Ok(())
}

pub fn count(client: &FiwareClient, common: &CommonArgs) -> Result<()> {
    let count = client.count_entities(common.entity_type.as_deref())?;
    println!("Total entities in Orion: {count}");
    Ok(())
}
