use anyhow::{bail, Result};
use fiware_admin::helpers::iso_millis;
use fiware_admin::interfaces::FiwareClient;

use crate::argsets::QueryArgs;

pub fn query(client: &FiwareClient, args: QueryArgs) -> Result<()> {
    let Some(result) = client.query_entity(&args.request)? else {
        bail!(
            "No attribute '{}' found for entity '{}'",
            args.request.name,
            args.request.urn
        );
    };
    let timestamp = result
        .timestamp
        .map(iso_millis)
        .unwrap_or_else(|| "no timestamp".to_string());
    println!("{} {} = {} ({})", result.urn, result.name, result.value, timestamp);
    Ok(())
}
