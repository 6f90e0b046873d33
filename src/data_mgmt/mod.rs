pub mod batch;
pub mod envelope;
mod finite;
pub mod gate;
pub mod generate;
pub mod models;

pub use batch::{
    pack_and_upload, Batch, BatchPacker, BatchResult, UploadFailure, UploadOutcome, Uploader,
    DEFAULT_MAX_BATCH_BYTES,
};
pub use envelope::{estimate_size, ActionType, Envelope, SerializationError};
pub use gate::{upload_if_within_budget, GateOutcome, PayloadTooLarge};
