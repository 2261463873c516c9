//! HAL bridge between the filesystem engine and the emulated flash.
//!
//! The engine only ever touches storage through the three primitives of
//! [`FlashStorage`]. [`FlashDevice`] adapts that capability to the `Read`,
//! `Write` and `Seek` traits the engine consumes, keeping a cursor on the side.
//! The device is injected into the engine at mount time, so the bridge carries no
//! global state.

use std::io;
use std::io::{Read, Seek, SeekFrom, Write};

use super::flash_error::FlashError;

/// Device capability exposed to the filesystem engine.
///
/// All three operations are synchronous, validate their address range and have no
/// side effect beyond the buffer. `erase` fills the range with the erase value.
pub trait FlashStorage {
    /// Total addressable size in bytes.
    fn size(&self) -> u64;
    /// Reads `dst.len()` bytes starting at `addr`.
    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<(), FlashError>;
    /// Writes `src` starting at `addr`.
    fn write(&mut self, addr: u64, src: &[u8]) -> Result<(), FlashError>;
    /// Fills `len` bytes starting at `addr` with the erase value.
    fn erase(&mut self, addr: u64, len: u64) -> Result<(), FlashError>;
}

/// Stream adapter over a [`FlashStorage`] implementation.
///
/// Borrows the storage for the lifetime of one mount. Reads past the end of the
/// device are short, writes past the end fail instead of growing the device.
pub struct FlashDevice<'a, S: FlashStorage> {
    storage: &'a mut S,
    pos: u64,
}

impl<'a, S: FlashStorage> FlashDevice<'a, S> {
    pub fn new(storage: &'a mut S) -> Self {
        Self { storage, pos: 0 }
    }
}

impl<S: FlashStorage> Read for FlashDevice<'_, S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let remaining = self.storage.size().saturating_sub(self.pos);
        let count = (buf.len() as u64).min(remaining) as usize;
        if count == 0 {
            return Ok(0);
        }

        self.storage
            .read(self.pos, &mut buf[..count])
            .map_err(io::Error::other)?;
        self.pos += count as u64;
        Ok(count)
    }
}

impl<S: FlashStorage> Write for FlashDevice<'_, S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = self.storage.size().saturating_sub(self.pos);
        let count = (buf.len() as u64).min(remaining) as usize;
        if count == 0 && !buf.is_empty() {
            return Err(io::Error::other(FlashError::OutOfRange {
                addr: self.pos,
                len: buf.len() as u64,
                size: self.storage.size(),
            }));
        }

        self.storage
            .write(self.pos, &buf[..count])
            .map_err(io::Error::other)?;
        self.pos += count as u64;
        Ok(count)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<S: FlashStorage> Seek for FlashDevice<'_, S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(offset) => self.storage.size().checked_add_signed(offset),
            SeekFrom::Current(offset) => self.pos.checked_add_signed(offset),
        };

        match new_pos {
            Some(new_pos) => {
                self.pos = new_pos;
                Ok(new_pos)
            }
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            )),
        }
    }
}
