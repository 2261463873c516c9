//! Flash image buffer and geometry.
//!
//! The image buffer is an owned byte array standing in for a physical flash chip's
//! address space. It starts out fully erased (`0xFF`), is mutated only through the
//! checked read/write/erase primitives of the HAL bridge, and is serialized to and
//! from host files byte-for-byte.

use getset::Getters;
use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use super::flash_error::FlashError;
use super::hal::FlashStorage;
use crate::traits::LayoutDisplay;

/// The value a flash cell holds after an erase cycle.
pub const ERASED_BYTE: u8 = 0xFF;

/// Stride granularity of image load/store, in bytes.
///
/// Host image files are transferred in whole strides: a trailing partial stride is
/// silently ignored on load, leaving the buffer at its erase value there. Kept for
/// bit-exact compatibility with images produced by earlier versions of the tool.
const IO_STRIDE: usize = 4;

/// Page sizes accepted by the filesystem engine.
const LEGAL_PAGE_SIZES: [u32; 4] = [512, 1024, 2048, 4096];

/// Largest erase-block size the engine supports as a cluster.
const MAX_BLOCK_SIZE: u32 = 32 * 1024;

/// Geometry of a flash image.
///
/// The image carries no self-describing header, so the same geometry must be
/// supplied on every subsequent open of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Getters)]
pub struct FlashGeometry {
    /// Total image size in bytes.
    #[get = "pub"]
    size: u64,
    /// Logical page size in bytes (the engine's sector size).
    #[get = "pub"]
    page_size: u32,
    /// Erase-block size in bytes (the engine's cluster size).
    #[get = "pub"]
    block_size: u32,
}

impl FlashGeometry {
    /// Validates and builds a flash geometry.
    ///
    /// # Parameters
    /// - `size`: Total image size in bytes
    /// - `page_size`: Logical page size in bytes
    /// - `block_size`: Erase-block size in bytes
    ///
    /// # Errors
    /// - Returns `FlashError::InvalidPageSize` if the page size is not one the engine accepts
    /// - Returns `FlashError::InvalidBlockSize` if the block size is not a power-of-two
    ///   multiple of the page size or exceeds 32K
    /// - Returns `FlashError::InvalidImageSize` if the size is zero or not block-aligned
    pub fn new(size: u64, page_size: u32, block_size: u32) -> Result<Self, FlashError> {
        if !LEGAL_PAGE_SIZES.contains(&page_size) {
            return Err(FlashError::InvalidPageSize(page_size));
        }
        if block_size < page_size
            || block_size > MAX_BLOCK_SIZE
            || block_size % page_size != 0
            || !(block_size / page_size).is_power_of_two()
        {
            return Err(FlashError::InvalidBlockSize(block_size));
        }
        if size == 0 || size % block_size as u64 != 0 {
            return Err(FlashError::InvalidImageSize(size));
        }

        Ok(Self {
            size,
            page_size,
            block_size,
        })
    }

    /// Returns the number of erase blocks in the image.
    pub fn block_count(&self) -> u64 {
        self.size / self.block_size as u64
    }

    /// Returns the number of pages per erase block.
    pub fn pages_per_block(&self) -> u32 {
        self.block_size / self.page_size
    }
}

/// In-memory flash image.
///
/// Owns the byte buffer for the whole address space of the emulated chip. The
/// buffer is exclusively owned by the process for the run's duration; the mount
/// session borrows it through the HAL bridge.
#[derive(Debug, Getters)]
pub struct FlashImage {
    /// The geometry the buffer was sized from.
    #[get = "pub"]
    geometry: FlashGeometry,
    data: Vec<u8>,
}

impl FlashImage {
    /// Creates a fully erased image for the given geometry.
    pub fn new(geometry: FlashGeometry) -> Self {
        Self {
            geometry,
            data: vec![ERASED_BYTE; *geometry.size() as usize],
        }
    }

    /// Loads an image from a host file.
    ///
    /// The buffer is filled in whole [`IO_STRIDE`] units: if the host file's length
    /// is not a multiple of the stride, the trailing partial stride is not read and
    /// the buffer keeps its erase value there. A file longer than the image only
    /// fills the buffer.
    ///
    /// # Errors
    /// - Returns `FlashError::IOError` if the file cannot be opened or read
    pub fn load(path: &Path, geometry: FlashGeometry) -> Result<Self, FlashError> {
        let mut image = Self::new(geometry);

        let mut file = File::open(path)?;
        let file_len = file.metadata()?.len() as usize;
        let usable = (file_len / IO_STRIDE * IO_STRIDE).min(image.data.len());
        file.read_exact(&mut image.data[..usable])?;

        Ok(image)
    }

    /// Stores the image to a host file, truncating any previous content.
    ///
    /// The same stride convention as [`FlashImage::load`] applies; geometry
    /// validation guarantees the buffer length is stride-aligned, so the written
    /// file is exactly the configured image size.
    ///
    /// # Errors
    /// - Returns `FlashError::IOError` if the file cannot be created or written
    pub fn store(&self, path: &Path) -> Result<(), FlashError> {
        let aligned = self.data.len() / IO_STRIDE * IO_STRIDE;

        let mut file = File::create(path)?;
        file.write_all(&self.data[..aligned])?;
        file.flush()?;

        Ok(())
    }

    /// Checks whether every byte of a page is at the erase value.
    fn is_page_erased(&self, page_start: usize) -> bool {
        let page_size = *self.geometry.page_size() as usize;
        self.data[page_start..page_start + page_size]
            .iter()
            .all(|byte| *byte == ERASED_BYTE)
    }

    /// Validates that `addr + len` lies within the buffer.
    fn check_range(&self, addr: u64, len: u64) -> Result<(), FlashError> {
        let size = *self.geometry.size();
        match addr.checked_add(len) {
            Some(end) if end <= size => Ok(()),
            _ => Err(FlashError::OutOfRange { addr, len, size }),
        }
    }
}

impl FlashStorage for FlashImage {
    fn size(&self) -> u64 {
        *self.geometry.size()
    }

    fn read(&self, addr: u64, dst: &mut [u8]) -> Result<(), FlashError> {
        self.check_range(addr, dst.len() as u64)?;

        let start = addr as usize;
        dst.copy_from_slice(&self.data[start..start + dst.len()]);
        Ok(())
    }

    fn write(&mut self, addr: u64, src: &[u8]) -> Result<(), FlashError> {
        self.check_range(addr, src.len() as u64)?;

        let start = addr as usize;
        self.data[start..start + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn erase(&mut self, addr: u64, len: u64) -> Result<(), FlashError> {
        self.check_range(addr, len)?;

        let start = addr as usize;
        self.data[start..start + len as usize].fill(ERASED_BYTE);
        Ok(())
    }
}

/// Implements the LayoutDisplay trait for FlashImage.
///
/// Renders the geometry followed by a per-block page-occupancy map built from the
/// raw buffer: `.` marks a fully erased page, `#` a programmed one.
impl LayoutDisplay for FlashImage {
    fn display_layout(&self, indent: u8) -> Result<String, std::fmt::Error> {
        let mut out = String::from("");
        let indent = " ".repeat(indent.into());

        writeln!(out, "{}┌{:─^42}┐", indent, " Flash Image Layout ")?;
        writeln!(out, "{}├{:^20}┬{:^21}┤", indent, "Property", "Value")?;
        writeln!(out, "{}├{:─<20}┼{:─<21}┤", indent, "", "")?;
        writeln!(
            out,
            "{}│{:<20}│{:<21}│",
            indent,
            "Image size",
            self.geometry.size()
        )?;
        writeln!(
            out,
            "{}│{:<20}│{:<21}│",
            indent,
            "Page size",
            self.geometry.page_size()
        )?;
        writeln!(
            out,
            "{}│{:<20}│{:<21}│",
            indent,
            "Block size",
            self.geometry.block_size()
        )?;
        writeln!(
            out,
            "{}│{:<20}│{:<21}│",
            indent,
            "Blocks",
            self.geometry.block_count()
        )?;
        writeln!(out, "{}└{:─<20}┴{:─<21}┘", indent, "", "")?;

        let block_size = *self.geometry.block_size() as usize;
        let page_size = *self.geometry.page_size() as usize;
        for block in 0..self.geometry.block_count() as usize {
            let mut pages = String::from("");
            for page in 0..self.geometry.pages_per_block() as usize {
                let page_start = block * block_size + page * page_size;
                pages.push(if self.is_page_erased(page_start) {
                    '.'
                } else {
                    '#'
                });
            }
            writeln!(out, "{}block {:>6}: [{}]", indent, block, pages)?;
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn small_geometry() -> FlashGeometry {
        FlashGeometry::new(0x10000, 512, 4096).unwrap()
    }

    #[test]
    fn geometry_rejects_odd_page_size() {
        assert!(matches!(
            FlashGeometry::new(0x10000, 256, 4096),
            Err(FlashError::InvalidPageSize(256))
        ));
    }

    #[test]
    fn geometry_rejects_non_power_of_two_block() {
        assert!(matches!(
            FlashGeometry::new(0x10000, 512, 3 * 512),
            Err(FlashError::InvalidBlockSize(_))
        ));
        assert!(matches!(
            FlashGeometry::new(0x10000, 1024, 512),
            Err(FlashError::InvalidBlockSize(512))
        ));
        assert!(matches!(
            FlashGeometry::new(0x100000, 512, 64 * 1024),
            Err(FlashError::InvalidBlockSize(_))
        ));
    }

    #[test]
    fn geometry_rejects_unaligned_size() {
        assert!(matches!(
            FlashGeometry::new(0x10001, 512, 4096),
            Err(FlashError::InvalidImageSize(0x10001))
        ));
        assert!(matches!(
            FlashGeometry::new(0, 512, 4096),
            Err(FlashError::InvalidImageSize(0))
        ));
    }

    #[test]
    fn new_image_is_fully_erased() {
        let image = FlashImage::new(small_geometry());
        assert!((0..image.geometry().block_count())
            .all(|block| image.is_page_erased(block as usize * 4096)));
    }

    #[test]
    fn write_then_read_round_trips() {
        let mut image = FlashImage::new(small_geometry());
        image.write(4096, b"abcd").unwrap();

        let mut buf = [0u8; 4];
        image.read(4096, &mut buf).unwrap();
        assert_eq!(&buf, b"abcd");
    }

    #[test]
    fn erase_restores_the_erase_value() {
        let mut image = FlashImage::new(small_geometry());
        image.write(0, &[0u8; 4096]).unwrap();
        assert!(!image.is_page_erased(0));

        image.erase(0, 4096).unwrap();
        assert!(image.is_page_erased(0));
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let mut image = FlashImage::new(small_geometry());
        let mut buf = [0u8; 8];

        assert!(matches!(
            image.read(0x10000 - 4, &mut buf),
            Err(FlashError::OutOfRange { .. })
        ));
        assert!(matches!(
            image.write(u64::MAX, b"xx"),
            Err(FlashError::OutOfRange { .. })
        ));
        assert!(matches!(
            image.erase(0x10000, 1),
            Err(FlashError::OutOfRange { .. })
        ));
    }

    #[test]
    fn load_ignores_a_trailing_partial_stride() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.bin");
        fs::write(&path, [0u8; 10]).unwrap();

        let image = FlashImage::load(&path, small_geometry()).unwrap();
        let mut buf = [0u8; 12];
        image.read(0, &mut buf).unwrap();

        // 8 bytes transferred, the 2-byte remainder stays erased.
        assert_eq!(&buf[..8], &[0u8; 8]);
        assert_eq!(&buf[8..], &[ERASED_BYTE; 4]);
    }

    #[test]
    fn load_caps_an_oversize_host_file_at_the_image_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oversize.bin");
        fs::write(&path, vec![0x5Au8; 0x10000 + 512]).unwrap();

        let image = FlashImage::load(&path, small_geometry()).unwrap();
        let mut buf = [0u8; 4];
        image.read(0x10000 - 4, &mut buf).unwrap();
        assert_eq!(&buf, &[0x5Au8; 4]);
        assert!(matches!(
            image.read(0x10000, &mut buf),
            Err(FlashError::OutOfRange { .. })
        ));
    }

    #[test]
    fn store_writes_exactly_the_image_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.bin");

        let image = FlashImage::new(small_geometry());
        image.store(&path).unwrap();

        assert_eq!(fs::metadata(&path).unwrap().len(), 0x10000);
    }

    #[test]
    fn load_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.bin");

        let mut image = FlashImage::new(small_geometry());
        image.write(0x2000, b"flashpack").unwrap();
        image.store(&path).unwrap();

        let reloaded = FlashImage::load(&path, small_geometry()).unwrap();
        let mut buf = [0u8; 9];
        reloaded.read(0x2000, &mut buf).unwrap();
        assert_eq!(&buf, b"flashpack");
    }
}
