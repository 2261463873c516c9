//! Error types for the batch pipelines.
//!
//! A batch aborts on its first failing file; files already transferred stay
//! committed (no rollback). The failing entry is always named so build logs point
//! at the culprit.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::flash::flash_error::FlashError;
use crate::session::session_error::SessionError;

/// Errors that can occur while running a pack/unpack/list/visualize action.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// The source directory of a pack action cannot be read.
    #[error("Can't read source directory `{path}`: {source}")]
    SourceDir { path: PathBuf, source: io::Error },

    /// The destination directory of an unpack action cannot be created.
    #[error("Can't create destination directory `{path}`: {source}")]
    DestDir { path: PathBuf, source: io::Error },

    /// One file of a pack batch failed; the batch stops here.
    #[error("Failed to add `{name}`: {source}")]
    Ingest { name: String, source: io::Error },

    /// One file of an unpack batch failed; the batch stops here.
    #[error("Failed to extract `{name}`: {source}")]
    Extract { name: String, source: io::Error },

    /// An error raised by the flash buffer or image serialization.
    #[error("Flash error: `{0}`")]
    Flash(FlashError),

    /// A mount, format or unmount failure from the session.
    #[error("Session error: `{0}`")]
    Session(SessionError),

    /// Other I/O errors, such as a failing directory iteration.
    #[error("IO Error: `{0}`")]
    IOError(io::Error),
}

/// Converts flash buffer errors into PipelineError.
impl From<FlashError> for PipelineError {
    fn from(err: FlashError) -> Self {
        PipelineError::Flash(err)
    }
}

/// Converts mount session errors into PipelineError.
impl From<SessionError> for PipelineError {
    fn from(err: SessionError) -> Self {
        PipelineError::Session(err)
    }
}

/// Converts standard I/O errors into PipelineError.
impl From<io::Error> for PipelineError {
    fn from(err: io::Error) -> Self {
        PipelineError::IOError(err)
    }
}
