//! `tinyfs` — a block-structured file system living inside a single host file.
//!
//! The crate is layered bottom-up: [`block`] is a pure byte-array-in-blocks abstraction over
//! a host file, [`volume`] owns the on-disk layout (superblock, inodes, free-block
//! accounting), [`file`] is the byte-granular read/write/seek/delete engine plus the
//! in-memory open-file table, and [`api`] is the thin façade that routes calls to whichever
//! single volume is currently mounted.
//!
//! The core is single-threaded: at most one volume is mounted per process at a time, and no
//! operation here spawns a thread or suspends.

pub mod api;
pub mod block;
pub mod error;
pub mod file;
pub mod volume;

pub use error::Error;
pub use error::Result;

/// Magic byte stored at byte 1 of every block on a valid volume.
pub const MAGIC: u8 = 0x45;

/// Default backing file size used when none is specified: 40 blocks of 256 bytes.
pub const DEFAULT_DISK_SIZE: u64 = 40 * block::BLOCKSIZE as u64;
