//! Greedy, order-preserving packing of entities into size-bounded batches.
//!
//! Entities are taken in input order and appended to the current batch for as
//! long as the enveloped batch stays within the byte budget. A batch is only
//! closed when a non-empty batch would overflow, so an entity that is larger
//! than the budget on its own still ends up in a batch of its own and is
//! uploaded anyway.

use std::fmt;
use std::ops::Range;

use serde::Serialize;

use super::envelope::{kib, to_json, ActionType, Envelope, Frame, SerializationError};
use crate::constants::defaults;

pub const DEFAULT_MAX_BATCH_BYTES: usize = defaults::MAX_BATCH_BYTES;

/// A contiguous run of input entities together with its encoded envelope.
#[derive(Debug)]
pub struct Batch<'a, E> {
    index: usize,
    first_entity: usize,
    entities: &'a [E],
    payload: String,
}

impl<'a, E> Batch<'a, E> {
    /// Position of the batch in flush order.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Position of the first entity of the batch in the input sequence.
    pub fn first_entity(&self) -> usize {
        self.first_entity
    }

    pub fn entities(&self) -> &'a [E] {
        self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// The enveloped JSON request body, ready to be sent as is.
    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn size_bytes(&self) -> usize {
        self.payload.len()
    }
}

impl<'a, E: Serialize> Batch<'a, E> {
    /// All of `entities` as a single `append_strict` batch, whatever its size.
    pub fn whole(entities: &'a [E]) -> Result<Self, SerializationError> {
        Ok(Batch {
            index: 0,
            first_entity: 0,
            entities,
            payload: Envelope::append_strict(entities).encode()?,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadFailure {
    /// The broker answered with an error status (>= 400).
    Rejected { status: u16, body: String },
    /// No HTTP response was obtained.
    Transport(String),
}

impl UploadFailure {
    pub fn status(&self) -> Option<u16> {
        match self {
            UploadFailure::Rejected { status, .. } => Some(*status),
            UploadFailure::Transport(_) => None,
        }
    }
}

impl fmt::Display for UploadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UploadFailure::Rejected { status, body } => write!(f, "status {status}: {body}"),
            UploadFailure::Transport(msg) => write!(f, "transport error: {msg}"),
        }
    }
}

/// Status code of an accepted upload, or why it failed.
pub type UploadOutcome = Result<u16, UploadFailure>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchResult {
    pub index: usize,
    pub entity_count: usize,
    pub size_bytes: usize,
    pub outcome: UploadOutcome,
}

impl BatchResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn status_code(&self) -> Option<u16> {
        match &self.outcome {
            Ok(status) => Some(*status),
            Err(failure) => failure.status(),
        }
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            Ok(status) => write!(f, "{status}"),
            Err(UploadFailure::Rejected { status, .. }) => write!(f, "{status}"),
            Err(e) => write!(f, "{e}"),
        }
    }
}

/// Anything that can send one enveloped batch to the broker.
///
/// Implementations must send `batch.payload()` unchanged: the envelope has
/// already been applied by the packer.
pub trait Uploader<E> {
    fn upload(&mut self, batch: &Batch<'_, E>) -> UploadOutcome;
}

impl<E, F> Uploader<E> for F
where
    F: FnMut(&Batch<'_, E>) -> UploadOutcome,
{
    fn upload(&mut self, batch: &Batch<'_, E>) -> UploadOutcome {
        self(batch)
    }
}

/// Uploads one batch and records its outcome. Failures are logged and
/// returned as data.
pub(crate) fn flush<E, U: Uploader<E>>(uploader: &mut U, batch: &Batch<'_, E>) -> BatchResult {
    let outcome = uploader.upload(batch);
    if let Err(failure) = &outcome {
        log::error!("Batch {} failed: {}", batch.index() + 1, failure);
    }
    BatchResult {
        index: batch.index(),
        entity_count: batch.len(),
        size_bytes: batch.size_bytes(),
        outcome,
    }
}

#[derive(Clone, Copy, Debug)]
pub struct BatchPacker {
    budget: usize,
    action: ActionType,
}

impl Default for BatchPacker {
    fn default() -> Self {
        BatchPacker::new(DEFAULT_MAX_BATCH_BYTES)
    }
}

impl BatchPacker {
    pub fn new(budget: usize) -> Self {
        BatchPacker {
            budget,
            action: ActionType::AppendStrict,
        }
    }

    pub fn with_action(mut self, action: ActionType) -> Self {
        self.action = action;
        self
    }

    /// Splits `entities` into batches without uploading anything.
    ///
    /// All entities are encoded before the first batch is formed, so a
    /// serialization failure is reported before any batch exists.
    pub fn pack<'a, E: Serialize>(
        &self,
        entities: &'a [E],
    ) -> Result<Vec<Batch<'a, E>>, SerializationError> {
        let plan = self.plan(entities)?;
        Ok((0..plan.len()).map(|i| plan.batch(i, entities)).collect())
    }

    fn plan<E: Serialize>(&self, entities: &[E]) -> Result<Plan, SerializationError> {
        let frame = Frame::new(self.action)?;
        let encoded = entities
            .iter()
            .map(to_json)
            .collect::<Result<Vec<_>, _>>()?;

        let mut ranges = Vec::new();
        let mut start = 0;
        let mut current_size = frame.empty_len();

        for (i, entity) in encoded.iter().enumerate() {
            let batch_is_empty = i == start;
            // One comma separates the entity from its predecessor
            let separator = usize::from(!batch_is_empty);
            let candidate_size = current_size + separator + entity.len();

            if candidate_size > self.budget && !batch_is_empty {
                ranges.push(start..i);
                start = i;
                current_size = frame.empty_len() + entity.len();
            } else {
                current_size = candidate_size;
            }
        }
        if start < encoded.len() {
            ranges.push(start..encoded.len());
        }
        Ok(Plan {
            frame,
            encoded,
            ranges,
        })
    }

    /// Packs `entities` and uploads every batch in order, one at a time.
    ///
    /// Upload failures do not stop the run; each one is reported in its
    /// `BatchResult`.
    pub fn pack_and_upload<E, U>(
        &self,
        entities: &[E],
        uploader: &mut U,
    ) -> Result<Vec<BatchResult>, SerializationError>
    where
        E: Serialize,
        U: Uploader<E>,
    {
        log::info!("Total entities to upload: {}", entities.len());
        let plan = self.plan(entities)?;
        let total = plan.len();

        // Payloads are assembled one batch at a time, right before upload
        let results = (0..total)
            .map(|i| {
                let batch = plan.batch(i, entities);
                let label = if batch.index() + 1 == total { "final batch" } else { "batch" };
                log::info!(
                    "Uploading {} {} with {} entities ({:.2} KB)",
                    label,
                    batch.index() + 1,
                    batch.len(),
                    kib(batch.size_bytes())
                );
                flush(uploader, &batch)
            })
            .collect();
        Ok(results)
    }
}

/// Batch boundaries over entities that were all encoded up front.
struct Plan {
    frame: Frame,
    encoded: Vec<String>,
    ranges: Vec<Range<usize>>,
}

impl Plan {
    fn len(&self) -> usize {
        self.ranges.len()
    }

    fn batch<'a, E>(&self, index: usize, entities: &'a [E]) -> Batch<'a, E> {
        let range = self.ranges[index].clone();
        Batch {
            index,
            first_entity: range.start,
            entities: &entities[range.clone()],
            payload: self.frame.assemble(&self.encoded[range]),
        }
    }
}

/// Packs `entities` under `budget` bytes and uploads each batch in order.
pub fn pack_and_upload<E, U>(
    entities: &[E],
    budget: usize,
    uploader: &mut U,
) -> Result<Vec<BatchResult>, SerializationError>
where
    E: Serialize,
    U: Uploader<E>,
{
    BatchPacker::new(budget).pack_and_upload(entities, uploader)
}
