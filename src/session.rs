//! Mount lifecycle around the filesystem engine.

pub mod mount;
pub mod session_error;
