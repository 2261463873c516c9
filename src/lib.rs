//!
//! flashpack: A library and CLI for building, inspecting and extracting flash
//! filesystem images for firmware builds.
//!
//! This crate provides tools for:
//! - Emulating a raw flash chip in memory and bridging it to a filesystem engine
//! - Packing a host directory into a fixed-size filesystem image
//! - Listing and unpacking the files stored in an existing image
//! - Visualizing block/page occupancy and capacity usage
//!
//! The on-flash filesystem itself is provided by the external `fatfs` engine; this
//! crate only drives it through its mount/format/file/directory contract and never
//! interprets the on-disk layout on its own.
//!
//! # Re-exports
//! - [`FlashGeometry`]: image geometry (total size, page size, erase-block size)
//! - [`FlashImage`]: the in-memory flash image buffer
//! - [`MountSession`]: lifecycle wrapper binding one image to one engine instance

pub mod cli;
pub mod flash;
pub mod pipeline;
pub mod session;
pub mod traits;

/// Image geometry (see [`flash::image::FlashGeometry`]).
pub use crate::flash::image::FlashGeometry;
/// In-memory flash image buffer (see [`flash::image::FlashImage`]).
pub use crate::flash::image::FlashImage;
/// Mount lifecycle wrapper (see [`session::mount::MountSession`]).
pub use crate::session::mount::MountSession;
