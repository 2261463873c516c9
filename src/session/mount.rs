//! Mount session: the lifecycle wrapper binding one flash image to one engine
//! instance.
//!
//! Exactly one session exists per run. Mounting borrows the image through the HAL
//! bridge, so the type system enforces what the tool needs from the lifecycle: a
//! session cannot be mounted twice concurrently and a mount cannot outlive its
//! session. Formatting is destructive and is only ever invoked by the pack action.

use fatfs::{FileSystem, FormatVolumeOptions, FsOptions};
use fscommon::BufStream;

use super::session_error::SessionError;
use crate::flash::hal::{FlashDevice, FlashStorage};
use crate::flash::image::FlashImage;

/// Stream the engine mounts: the HAL bridge wrapped in the engine's buffered
/// page cache.
pub type EngineStream<'a> = BufStream<FlashDevice<'a, FlashImage>>;

/// Binds one [`FlashImage`] to one filesystem engine instance.
pub struct MountSession {
    image: FlashImage,
}

impl MountSession {
    pub fn new(image: FlashImage) -> Self {
        Self { image }
    }

    /// Asks the engine to mount the image as-is.
    ///
    /// Does not mutate the buffer contents. Failure is fatal to the invoking
    /// action; there is no retry.
    ///
    /// # Errors
    /// - Returns `SessionError::MountFailed` if the engine rejects the image
    pub fn try_mount(&mut self) -> Result<Mounted<'_>, SessionError> {
        let device = FlashDevice::new(&mut self.image);
        let fs = FileSystem::new(BufStream::new(device), FsOptions::new())
            .map_err(SessionError::MountFailed)?;

        Ok(Mounted { fs })
    }

    /// Erases the whole image, runs the engine's low-level format with the session
    /// geometry, then mounts the fresh filesystem.
    ///
    /// Destroys any previous content, so this must never be called on an image the
    /// caller intends to preserve.
    ///
    /// # Errors
    /// - Returns `SessionError::Flash` if the erase fails
    /// - Returns `SessionError::FormatFailed` if the engine cannot format
    /// - Returns `SessionError::MountFailed` if the remount fails
    pub fn format(&mut self) -> Result<Mounted<'_>, SessionError> {
        let geometry = *self.image.geometry();
        self.image.erase(0, *geometry.size())?;

        {
            let mut device = FlashDevice::new(&mut self.image);
            fatfs::format_volume(
                &mut device,
                FormatVolumeOptions::new()
                    .bytes_per_sector(*geometry.page_size() as u16)
                    .bytes_per_cluster(*geometry.block_size()),
            )
            .map_err(SessionError::FormatFailed)?;
        }

        self.try_mount()
    }

    /// Releases the session and hands the flash buffer back for serialization.
    pub fn into_image(self) -> FlashImage {
        self.image
    }
}

/// A mounted filesystem, borrowing the session's image until unmounted or dropped.
pub struct Mounted<'a> {
    fs: FileSystem<EngineStream<'a>>,
}

impl<'a> Mounted<'a> {
    /// Returns the engine handle for file and directory operations.
    pub fn fs(&self) -> &FileSystem<EngineStream<'a>> {
        &self.fs
    }

    /// Flushes the engine state back into the flash buffer and releases the mount.
    ///
    /// Dropping a `Mounted` also flushes, but swallows errors; pipelines call this
    /// explicitly so flush failures reach the caller.
    pub fn unmount(self) -> Result<(), SessionError> {
        self.fs.unmount().map_err(SessionError::UnmountFailed)
    }
}
