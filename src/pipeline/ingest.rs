//! Ingest pipeline: pack a host directory into a fresh image.
//!
//! Walks the source directory in name order, skips dotfiles and anything that is
//! not a regular file, and streams every remaining file into the mounted
//! filesystem under a `/`-prefixed name. The first file that fails to read or
//! write aborts the whole batch; files already written stay committed in the
//! image.

use log::{info, warn};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;

use super::pipeline_error::PipelineError;
use crate::flash::image::{FlashGeometry, FlashImage};
use crate::session::mount::{Mounted, MountSession};

/// Chunk size used when streaming host files into the filesystem.
const COPY_CHUNK: usize = 4096;

/// Runs the pack action: format a fresh image, ingest the source directory and
/// store the result.
///
/// The image file is written even when the batch aborted halfway, so the
/// committed files remain inspectable; the error is still propagated and the
/// action exits nonzero.
///
/// # Parameters
/// - `geometry`: Geometry of the image to create
/// - `image_path`: Where the image file is stored
/// - `src_dir`: Host directory to pack
///
/// # Errors
/// - Returns `PipelineError::Session` if format or unmount fails (nothing is stored)
/// - Returns `PipelineError::SourceDir` if the source directory cannot be read
/// - Returns `PipelineError::Ingest` naming the first file that failed
pub fn pack(
    geometry: FlashGeometry,
    image_path: &Path,
    src_dir: &Path,
) -> Result<(), PipelineError> {
    let mut session = MountSession::new(FlashImage::new(geometry));

    let mounted = session.format()?;
    let outcome = ingest_dir(&mounted, src_dir);
    let flushed = mounted.unmount();

    // The first failing file is the error to surface; a flush failure on top of
    // an aborted batch must not mask its name.
    if outcome.is_ok() {
        flushed?;
    }

    session.into_image().store(image_path)?;
    outcome
}

/// Writes every eligible file of `src_dir` into the mounted filesystem.
fn ingest_dir(mounted: &Mounted<'_>, src_dir: &Path) -> Result<(), PipelineError> {
    let mut entries: Vec<_> = fs::read_dir(src_dir)
        .map_err(|err| PipelineError::SourceDir {
            path: src_dir.to_path_buf(),
            source: err,
        })?
        .filter_map(Result::ok)
        .collect();
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let file_name = entry.file_name();
        let name = match file_name.to_str() {
            Some(name) => name,
            None => {
                warn!("skipping entry with a non-UTF-8 name");
                continue;
            }
        };

        if name.starts_with('.') {
            continue;
        }

        // stat() semantics: follow symlinks when deciding what is a regular file.
        let is_file = fs::metadata(entry.path())
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            warn!("skipping {name}");
            continue;
        }

        info!("adding /{name}");
        ingest_file(mounted, name, &entry.path())?;
    }

    Ok(())
}

/// Streams one host file into the filesystem entry `/name`.
///
/// Both handles are scoped to this function, so they are closed on every exit
/// path; the engine's open-file table is bounded and must not leak.
fn ingest_file(mounted: &Mounted<'_>, name: &str, path: &Path) -> Result<(), PipelineError> {
    let fail = |err: std::io::Error| PipelineError::Ingest {
        name: name.to_string(),
        source: err,
    };

    let mut src = File::open(path).map_err(fail)?;
    let mut dst = mounted.fs().root_dir().create_file(name).map_err(fail)?;
    dst.truncate().map_err(fail)?;

    let mut chunk = vec![0u8; COPY_CHUNK];
    loop {
        let count = src.read(&mut chunk).map_err(fail)?;
        if count == 0 {
            break;
        }
        dst.write_all(&chunk[..count]).map_err(fail)?;
    }
    dst.flush().map_err(fail)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    fn geometry() -> FlashGeometry {
        FlashGeometry::new(0x100000, 512, 4096).unwrap()
    }

    fn write_src_file(dir: &Path, name: &str, content: &[u8]) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn dotfiles_and_directories_are_skipped() {
        let src = tempfile::tempdir().unwrap();
        write_src_file(src.path(), "kept.txt", b"kept");
        write_src_file(src.path(), ".hidden", b"nope");
        fs::create_dir(src.path().join("subdir")).unwrap();

        let mut session = MountSession::new(FlashImage::new(geometry()));
        let mounted = session.format().unwrap();
        ingest_dir(&mounted, src.path()).unwrap();

        let names: Vec<String> = mounted
            .fs()
            .root_dir()
            .iter()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec!["kept.txt".to_string()]);
        mounted.unmount().unwrap();
    }

    #[test]
    fn ingested_bytes_round_trip_through_the_engine() {
        let src = tempfile::tempdir().unwrap();
        let content: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
        write_src_file(src.path(), "blob.bin", &content);

        let mut session = MountSession::new(FlashImage::new(geometry()));
        let mounted = session.format().unwrap();
        ingest_dir(&mounted, src.path()).unwrap();

        let mut file = mounted.fs().root_dir().open_file("blob.bin").unwrap();
        let mut read_back = Vec::new();
        file.read_to_end(&mut read_back).unwrap();
        drop(file);
        assert_eq!(read_back, content);
        mounted.unmount().unwrap();
    }

    #[test]
    fn missing_source_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no_such_dir");

        let mut session = MountSession::new(FlashImage::new(geometry()));
        let mounted = session.format().unwrap();
        assert!(matches!(
            ingest_dir(&mounted, &missing),
            Err(PipelineError::SourceDir { .. })
        ));
    }

    #[test]
    fn pack_names_the_failing_file_and_still_stores_the_image() {
        let src = tempfile::tempdir().unwrap();
        let small = FlashGeometry::new(0x40000, 512, 4096).unwrap();
        write_src_file(src.path(), "huge.bin", &vec![0xA5u8; 0x100000]);
        let out = tempfile::tempdir().unwrap();
        let image_path = out.path().join("fs.bin");

        assert!(matches!(
            pack(small, &image_path, src.path()),
            Err(PipelineError::Ingest { name, .. }) if name == "huge.bin"
        ));
        assert_eq!(fs::metadata(&image_path).unwrap().len(), 0x40000);
    }

    #[test]
    fn over_capacity_content_fails_deterministically() {
        let src = tempfile::tempdir().unwrap();
        // A 256 KiB filesystem cannot hold 1 MiB of payload.
        let small = FlashGeometry::new(0x40000, 512, 4096).unwrap();
        write_src_file(src.path(), "huge.bin", &vec![0xA5u8; 0x100000]);

        let mut session = MountSession::new(FlashImage::new(small));
        let mounted = session.format().unwrap();
        assert!(matches!(
            ingest_dir(&mounted, src.path()),
            Err(PipelineError::Ingest { name, .. }) if name == "huge.bin"
        ));
    }
}
