//! Error types for the mount session.
//!
//! Mount, format and unmount failures are signaled by the filesystem engine as I/O
//! errors; they are fatal to the invoking action and are never retried.

use std::io;
use thiserror::Error;

use crate::flash::flash_error::FlashError;

/// Errors that can occur during the mount lifecycle.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The engine refused to mount the image, typically because it holds no valid
    /// filesystem for the supplied geometry.
    #[error("Mount failed: `{0}`")]
    MountFailed(io::Error),

    /// The engine's low-level format failed. The pack action aborts before any
    /// files are written.
    #[error("Format failed: `{0}`")]
    FormatFailed(io::Error),

    /// The engine failed to flush its state back to the flash buffer.
    #[error("Unmount failed: `{0}`")]
    UnmountFailed(io::Error),

    /// An error raised by the flash buffer underneath the engine.
    #[error("Flash error: `{0}`")]
    Flash(FlashError),
}

/// Converts flash buffer errors into SessionError.
impl From<FlashError> for SessionError {
    fn from(err: FlashError) -> Self {
        SessionError::Flash(err)
    }
}
