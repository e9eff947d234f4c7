//! The block device: a pure byte-array-in-blocks abstraction over a host file.
//!
//! This layer has no knowledge of superblocks, inodes, or extents. It only knows how to
//! translate a logical block number into a byte offset and perform exact-sized reads and
//! writes, which keeps the volume layer's format/verify logic testable against a disk that
//! is nothing more than a file on disk.

use crate::error::Error;
use crate::error::Result;
use std::cell::RefCell;
use std::fs::File;
use std::fs::OpenOptions;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

/// Fixed size of every block on every volume, in bytes.
pub const BLOCKSIZE: usize = 256;

/// A handle identifying an open disk within the process-wide disk registry.
pub type DiskHandle = i32;

struct DiskEntry {
	file: File,
	path: PathBuf,
	capacity: u64,
	open: bool,
}

thread_local! {
	static DISKS: RefCell<Vec<DiskEntry>> = RefCell::new(Vec::new());
}

/// Opens a host file as an emulated disk of `n_bytes` bytes.
///
/// If `n_bytes > 0`, the file is created (or overwritten) and sized to exactly `n_bytes`. If
/// `n_bytes == 0`, an existing file is opened without truncation, for mounting a previously
/// formatted volume.
///
/// Returns a small non-negative handle on success.
pub fn open_disk(path: &Path, n_bytes: u64) -> Result<DiskHandle> {
	if n_bytes > 0 && n_bytes % BLOCKSIZE as u64 != 0 {
		return Err(Error::InvalidArgument("disk size must be a multiple of BLOCKSIZE"));
	}

	let (file, capacity) = if n_bytes > 0 {
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(true)
			.open(path)?;
		file.set_len(n_bytes)?;
		(file, n_bytes)
	} else {
		let file = OpenOptions::new().read(true).write(true).open(path)?;
		let capacity = file.metadata()?.len();
		(file, capacity)
	};

	let entry = DiskEntry {
		file,
		path: path.to_path_buf(),
		capacity,
		open: true,
	};

	DISKS.with(|disks| {
		let mut disks = disks.borrow_mut();
		disks.push(entry);
		Ok((disks.len() - 1) as DiskHandle)
	})
}

/// Reads exactly [`BLOCKSIZE`] bytes at logical block `b_num` on `handle` into `buf`.
pub fn read_block(handle: DiskHandle, b_num: u64, buf: &mut [u8; BLOCKSIZE]) -> Result<()> {
	with_disk(handle, |entry| {
		let offset = checked_offset(entry, b_num)?;
		entry.file.seek(SeekFrom::Start(offset))?;
		entry.file.read_exact(buf)?;
		Ok(())
	})
}

/// Writes exactly [`BLOCKSIZE`] bytes from `buf` at logical block `b_num` on `handle`.
pub fn write_block(handle: DiskHandle, b_num: u64, buf: &[u8; BLOCKSIZE]) -> Result<()> {
	with_disk(handle, |entry| {
		let offset = checked_offset(entry, b_num)?;
		entry.file.seek(SeekFrom::Start(offset))?;
		entry.file.write_all(buf)?;
		Ok(())
	})
}

/// Flushes and closes `handle`. Idempotent: closing an already-closed handle succeeds.
pub fn close_disk(handle: DiskHandle) -> Result<()> {
	DISKS.with(|disks| {
		let mut disks = disks.borrow_mut();
		let Some(entry) = disks.get_mut(handle as usize) else {
			return Err(Error::NotFound);
		};
		if entry.open {
			entry.file.flush()?;
			entry.open = false;
		}
		Ok(())
	})
}

/// Returns the capacity in bytes of `handle`, for volume layer bookkeeping.
pub fn disk_capacity(handle: DiskHandle) -> Result<u64> {
	with_disk(handle, |entry| Ok(entry.capacity))
}

/// Returns the host path backing `handle`.
pub fn disk_path(handle: DiskHandle) -> Result<PathBuf> {
	with_disk(handle, |entry| Ok(entry.path.clone()))
}

/// Finds the handle of an already-open disk backed by `path`, if any.
pub fn find_by_path(path: &Path) -> Option<DiskHandle> {
	DISKS.with(|disks| {
		disks
			.borrow()
			.iter()
			.position(|e| e.open && e.path == path)
			.map(|i| i as DiskHandle)
	})
}

fn checked_offset(entry: &DiskEntry, b_num: u64) -> Result<u64> {
	let offset = b_num
		.checked_mul(BLOCKSIZE as u64)
		.ok_or(Error::OutOfBounds)?;
	if offset + BLOCKSIZE as u64 > entry.capacity {
		return Err(Error::OutOfBounds);
	}
	Ok(offset)
}

fn with_disk<T>(handle: DiskHandle, f: impl FnOnce(&mut DiskEntry) -> Result<T>) -> Result<T> {
	DISKS.with(|disks| {
		let mut disks = disks.borrow_mut();
		let entry = disks
			.get_mut(handle as usize)
			.ok_or(Error::NotFound)?;
		if !entry.open {
			return Err(Error::DeviceClosed);
		}
		f(entry)
	})
}

#[cfg(test)]
mod test {
	use super::*;
	use std::env::temp_dir;

	fn temp_path(name: &str) -> PathBuf {
		let mut p = temp_dir();
		p.push(format!("tinyfs-block-test-{name}-{:?}", std::thread::current().id()));
		p
	}

	#[test]
	fn open_rejects_non_multiple_size() {
		let path = temp_path("bad-size");
		assert!(matches!(
			open_disk(&path, 100),
			Err(Error::InvalidArgument(_))
		));
	}

	#[test]
	fn write_then_read_round_trips() {
		let path = temp_path("roundtrip");
		let handle = open_disk(&path, BLOCKSIZE as u64 * 4).unwrap();

		let mut buf = [0u8; BLOCKSIZE];
		buf[0] = 0xAB;
		buf[BLOCKSIZE - 1] = 0xCD;
		write_block(handle, 2, &buf).unwrap();

		let mut out = [0u8; BLOCKSIZE];
		read_block(handle, 2, &mut out).unwrap();
		assert_eq!(buf, out);

		close_disk(handle).unwrap();
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn read_past_capacity_fails() {
		let path = temp_path("oob");
		let handle = open_disk(&path, BLOCKSIZE as u64 * 2).unwrap();
		let mut buf = [0u8; BLOCKSIZE];
		assert!(matches!(read_block(handle, 5, &mut buf), Err(Error::OutOfBounds)));
		close_disk(handle).unwrap();
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn closed_handle_rejects_io() {
		let path = temp_path("closed");
		let handle = open_disk(&path, BLOCKSIZE as u64 * 2).unwrap();
		close_disk(handle).unwrap();

		let mut buf = [0u8; BLOCKSIZE];
		assert!(matches!(read_block(handle, 0, &mut buf), Err(Error::DeviceClosed)));
		// Idempotent.
		assert!(close_disk(handle).is_ok());
		let _ = std::fs::remove_file(&path);
	}
}
