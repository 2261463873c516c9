//! Batch pipelines driving the engine through a whole action.
//!
//! Each action is one pass: load or create the image, mount, run the batch,
//! unmount, and store the image when it was modified. Every failure is terminal
//! for the action; there is no continue-on-error mode and no retry.

pub mod extract;
pub mod ingest;
pub mod pipeline_error;
pub mod report;
