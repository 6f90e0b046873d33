use anyhow::{bail, Result};
use fiware_admin::data_mgmt::BatchResult;

/// Prints one line per batch and fails if any of them was not accepted.
pub fn report_batches(results: &[BatchResult]) -> Result<()> {
    for result in results {
        println!("Batch {} result: {}", result.index + 1, result);
    }
    let failed = results.iter().filter(|r| !r.is_success()).count();
    if failed > 0 {
        bail!("{} of {} batches failed", failed, results.len());
    }
    Ok(())
}
