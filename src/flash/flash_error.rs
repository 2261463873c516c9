//! Error types for flash geometry validation and flash buffer access.
//!
//! The geometry values mirror what the filesystem engine accepts: the page size is
//! the engine's sector size and the block size is its cluster/erase granularity.
//! This module defines errors for invalid geometry and for out-of-range accesses
//! through the HAL bridge.

use std::io;
use thiserror::Error;

/// Errors that can occur while validating geometry or accessing the flash buffer.
#[derive(Error, Debug)]
pub enum FlashError {
    /// The page size is the unit of data transfer and must be accepted by the engine.
    #[error("Invalid page size: `{0}`. Legal values: 512, 1024, 2048 or 4096")]
    InvalidPageSize(u32),

    /// The erase-block size must be a power-of-two multiple of the page size and
    /// must not exceed 32K, the engine's cluster size limit.
    #[error(
        "Invalid block size: `{0}`. It must be a power-of-two multiple of the page size, at most 32K"
    )]
    InvalidBlockSize(u32),

    /// The image size must hold a whole number of erase blocks.
    #[error("Invalid image size: `{0}`. It must be a non-zero multiple of the block size")]
    InvalidImageSize(u64),

    /// An access through the HAL bridge fell outside the flash buffer.
    /// Every read/write/erase validates `address + length <= size` before touching memory.
    #[error("Flash access out of range: address {addr} + length {len} exceeds image size {size}")]
    OutOfRange { addr: u64, len: u64, size: u64 },

    /// Underlying I/O errors that occur while loading or storing the image file.
    #[error("IO Error: `{0}`")]
    IOError(io::Error),
}

/// Converts standard I/O errors into FlashError.
impl From<io::Error> for FlashError {
    fn from(err: io::Error) -> Self {
        FlashError::IOError(err)
    }
}
