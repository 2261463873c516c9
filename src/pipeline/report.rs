//! Listing and visualization of an existing image.
//!
//! Listing prints one `<size>\t/<name>` line per root entry. Visualization dumps
//! the flash layout with a per-block page-occupancy map, then reports total and
//! used capacity as seen by the engine.

use fatfs::FileAttributes;
use getset::Getters;
use std::path::Path;

use super::pipeline_error::PipelineError;
use crate::flash::image::{FlashGeometry, FlashImage};
use crate::session::mount::{Mounted, MountSession};
use crate::traits::LayoutDisplay;

/// One root-directory record, transient to the iteration that produced it.
#[derive(Debug, Getters)]
pub struct RootEntry {
    /// Entry name, without the `/` namespace prefix.
    #[get = "pub"]
    name: String,
    /// Size in bytes (0 for directories).
    #[get = "pub"]
    size: u64,
    /// Whether the entry is a directory.
    #[get = "pub"]
    is_dir: bool,
}

/// Collects the root-directory entries of a mounted filesystem.
///
/// Volume-label entries are engine bookkeeping and are not part of the namespace.
pub fn entries(mounted: &Mounted<'_>) -> Result<Vec<RootEntry>, PipelineError> {
    let mut entries = vec![];

    for entry in mounted.fs().root_dir().iter() {
        let entry = entry?;
        if entry.attributes().contains(FileAttributes::VOLUME_ID) {
            continue;
        }

        entries.push(RootEntry {
            name: entry.file_name(),
            size: entry.len(),
            is_dir: entry.is_dir(),
        });
    }

    Ok(entries)
}

/// Runs the list action: print one line per root entry, nothing for an empty
/// filesystem.
pub fn list(geometry: FlashGeometry, image_path: &Path) -> Result<(), PipelineError> {
    let image = FlashImage::load(image_path, geometry)?;
    let mut session = MountSession::new(image);

    let mounted = session.try_mount()?;
    let outcome = entries(&mounted);
    mounted.unmount()?;

    for entry in outcome? {
        println!("{}\t/{}", entry.size(), entry.name());
    }

    Ok(())
}

/// Capacity as reported by the engine: total bytes of the data area and bytes
/// currently allocated.
pub fn capacity(mounted: &Mounted<'_>) -> Result<(u64, u64), PipelineError> {
    let stats = mounted.fs().stats()?;

    let cluster_size = stats.cluster_size() as u64;
    let total = stats.total_clusters() as u64 * cluster_size;
    let used = (stats.total_clusters() - stats.free_clusters()) as u64 * cluster_size;
    Ok((total, used))
}

/// Runs the visualize action: dump the block/page occupancy map and the capacity
/// usage of the image.
pub fn visualize(geometry: FlashGeometry, image_path: &Path) -> Result<(), PipelineError> {
    let image = FlashImage::load(image_path, geometry)?;

    let layout = image
        .display_layout(0)
        .map_err(|err| PipelineError::IOError(std::io::Error::other(err)))?;
    print!("{layout}");

    let mut session = MountSession::new(image);
    let mounted = session.try_mount()?;
    let outcome = capacity(&mounted);
    mounted.unmount()?;

    let (total, used) = outcome?;
    println!("total: {total}, used: {used}");

    Ok(())
}
