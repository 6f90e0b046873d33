use std::fmt;

use serde::Serialize;

use super::batch::{flush, Batch, BatchResult, Uploader};
use super::envelope::{kib, SerializationError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayloadTooLarge {
    pub size_bytes: usize,
    pub max_bytes: usize,
}

impl PayloadTooLarge {
    pub fn size_kib(&self) -> f64 {
        kib(self.size_bytes)
    }
}

impl fmt::Display for PayloadTooLarge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "payload size ({:.2} KB) exceeds maximum ({:.2} KB)",
            self.size_kib(),
            kib(self.max_bytes)
        )
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    Uploaded(BatchResult),
    Rejected(PayloadTooLarge),
}

/// Uploads `entities` as a single request, but only if the enveloped payload
/// fits in `budget` bytes. Nothing is split and nothing is sent otherwise.
pub fn upload_if_within_budget<E, U>(
    entities: &[E],
    budget: usize,
    uploader: &mut U,
) -> Result<GateOutcome, SerializationError>
where
    E: Serialize,
    U: Uploader<E>,
{
    let batch = Batch::whole(entities)?;
    if batch.size_bytes() > budget {
        let rejection = PayloadTooLarge {
            size_bytes: batch.size_bytes(),
            max_bytes: budget,
        };
        log::error!("Error: {}", rejection);
        return Ok(GateOutcome::Rejected(rejection));
    }

    log::info!(
        "Uploading {} entities ({:.2} KB)",
        batch.len(),
        kib(batch.size_bytes())
    );
    Ok(GateOutcome::Uploaded(flush(uploader, &batch)))
}
