//! Extraction pipeline: unpack an image into a host directory.
//!
//! Iterates the mounted filesystem's root directory and writes each file entry to
//! the destination directory. Extraction is binary safe: exactly the byte length
//! reported by the directory entry is read and written, so content with embedded
//! zero bytes round-trips unchanged.

use fatfs::FileAttributes;
use log::info;
use std::fs;
use std::io::Read;
use std::path::Path;

use super::pipeline_error::PipelineError;
use crate::flash::image::{FlashGeometry, FlashImage};
use crate::session::mount::{Mounted, MountSession};

/// Runs the unpack action: load the image, mount it and extract every file of the
/// root directory into `dest_dir`.
///
/// # Parameters
/// - `geometry`: Geometry the image was created with
/// - `image_path`: Path of the image file to read
/// - `dest_dir`: Host directory receiving the extracted files
///
/// # Errors
/// - Returns `PipelineError::Flash` if the image file cannot be loaded
/// - Returns `PipelineError::Session` if the image does not mount
/// - Returns `PipelineError::DestDir` if the destination cannot be created
/// - Returns `PipelineError::Extract` naming the first file that failed
pub fn unpack(
    geometry: FlashGeometry,
    image_path: &Path,
    dest_dir: &Path,
) -> Result<(), PipelineError> {
    let image = FlashImage::load(image_path, geometry)?;
    let mut session = MountSession::new(image);

    let mounted = session.try_mount()?;
    let outcome = extract_root(&mounted, dest_dir);
    mounted.unmount()?;

    outcome
}

/// Extracts every file entry of the root directory into `dest_dir`.
fn extract_root(mounted: &Mounted<'_>, dest_dir: &Path) -> Result<(), PipelineError> {
    create_dest_dir(dest_dir)?;

    for entry in mounted.fs().root_dir().iter() {
        let entry = entry?;
        if !entry.is_file() || entry.attributes().contains(FileAttributes::VOLUME_ID) {
            continue;
        }

        let name = entry.file_name();
        let size = entry.len();
        let fail = |err: std::io::Error| PipelineError::Extract {
            name: name.clone(),
            source: err,
        };

        let dest = dest_dir.join(&name);
        // Reported before the transfer, so a failing file is still named in the
        // progress stream.
        info!("unpacking /{name} > {} ({size} bytes)", dest.display());

        // Exact-length transfer: the entry's reported size, not a scan for a
        // terminator, decides how many bytes reach the host file.
        let mut content = vec![0u8; size as usize];
        let mut file = entry.to_file();
        file.read_exact(&mut content).map_err(fail)?;
        drop(file);

        fs::write(&dest, &content).map_err(fail)?;
    }

    Ok(())
}

/// Ensures the destination directory exists, creating it with mode `0o755` when
/// absent.
#[cfg(unix)]
fn create_dest_dir(dest_dir: &Path) -> Result<(), PipelineError> {
    use std::os::unix::fs::DirBuilderExt;

    if dest_dir.is_dir() {
        return Ok(());
    }

    fs::DirBuilder::new()
        .mode(0o755)
        .create(dest_dir)
        .map_err(|err| PipelineError::DestDir {
            path: dest_dir.to_path_buf(),
            source: err,
        })
}

/// Ensures the destination directory exists.
#[cfg(not(unix))]
fn create_dest_dir(dest_dir: &Path) -> Result<(), PipelineError> {
    if dest_dir.is_dir() {
        return Ok(());
    }

    fs::create_dir(dest_dir).map_err(|err| PipelineError::DestDir {
        path: dest_dir.to_path_buf(),
        source: err,
    })
}
