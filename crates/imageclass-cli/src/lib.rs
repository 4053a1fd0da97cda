//! imageclass CLI library
//!
//! Argument handling and the directory-backed frame source used by the
//! `imageclass` binary, exported for testing.

pub mod args;
pub mod frames;

pub use args::Args;
pub use frames::DirectoryFrameSource;
