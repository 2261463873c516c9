//! Emulated flash storage.
//!
//! This module provides:
//! - The in-memory flash image buffer and its geometry
//! - The HAL bridge through which the filesystem engine accesses the buffer
//! - Image serialization to and from host files

pub mod flash_error;
pub mod hal;
pub mod image;
