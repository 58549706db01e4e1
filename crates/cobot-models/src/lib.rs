//! Shared data models for the COBOT media pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Per-upload identifiers
//! - The media descriptor and its artifact naming scheme
//! - Job ids, pipeline states and job reports

pub mod identifier;
pub mod job;
pub mod media_set;

// Re-export common types
pub use identifier::{Identifier, IdentifierError, IDENTIFIER_BYTES};
pub use job::{JobId, JobReport, PipelineState, Stage, StageWarning};
pub use media_set::{
    destination_stem, staging_extension, timestamp_label, ArtifactKind, MediaSet, MediaSetError,
    DEFAULT_DESCRIPTION, PRODUCT_TAG, STAGING_PREFIX,
};
