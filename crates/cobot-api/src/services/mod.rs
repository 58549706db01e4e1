//! Business logic services.

pub mod intake;

pub use intake::{discard_staged, multipart_error, stage_field, StagedUpload};
