//! The API façade: routes every operation to the single process-wide mounted volume.
//!
//! This module holds no state of its own beyond "which volume, if any, is currently
//! mounted" plus the registry of formatted-but-maybe-unmounted volumes a path can be
//! remounted from. Single-threaded by contract (see the crate's concurrency notes), so the
//! registry lives in a `thread_local!` cell rather than behind a `Mutex`.

use crate::error::Error;
use crate::error::Result;
use crate::file;
use crate::file::Fd;
use crate::file::FileInfo;
use crate::volume::inode::Permission;
use crate::volume::Volume;
use std::cell::RefCell;
use std::path::Path;
use std::path::PathBuf;

struct Registry {
	volumes: Vec<Volume>,
	mounted: Option<usize>,
}

impl Registry {
	const fn new() -> Self {
		Self {
			volumes: Vec::new(),
			mounted: None,
		}
	}
}

thread_local! {
	static REGISTRY: RefCell<Registry> = RefCell::new(Registry::new());
}

fn with_mounted<T>(f: impl FnOnce(&mut Volume) -> Result<T>) -> Result<T> {
	REGISTRY.with(|r| {
		let mut r = r.borrow_mut();
		let idx = r.mounted.ok_or(Error::InvalidArgument("no volume is mounted"))?;
		f(&mut r.volumes[idx])
	})
}

/// Formats a brand-new volume of `n_bytes` bytes at `path` and registers it, unmounted.
pub fn mkfs(path: &Path, n_bytes: u64) -> Result<()> {
	let volume = Volume::format(path, n_bytes)?;
	REGISTRY.with(|r| r.borrow_mut().volumes.push(volume));
	Ok(())
}

/// Mounts the volume registered at `path`, unmounting any currently mounted volume first.
pub fn mount(path: &Path) -> Result<()> {
	REGISTRY.with(|r| {
		let mut r = r.borrow_mut();

		if let Some(idx) = r.mounted.take() {
			r.volumes[idx].unmount()?;
		}

		let idx = r
			.volumes
			.iter()
			.position(|v| v.path() == path)
			.ok_or(Error::NotFound)?;
		r.volumes[idx].mount()?;
		r.mounted = Some(idx);
		Ok(())
	})
}

/// Unmounts the currently mounted volume.
pub fn unmount() -> Result<()> {
	REGISTRY.with(|r| {
		let mut r = r.borrow_mut();
		let idx = r.mounted.take().ok_or(Error::InvalidArgument("no volume is mounted"))?;
		r.volumes[idx].unmount()
	})
}

/// Returns the path of the currently mounted volume, if any.
pub fn mounted_path() -> Option<PathBuf> {
	REGISTRY.with(|r| {
		let r = r.borrow();
		r.mounted.map(|idx| r.volumes[idx].path().to_path_buf())
	})
}

/// Opens `name` on the mounted volume.
pub fn open_file(name: &str) -> Result<Fd> {
	with_mounted(|v| file::open(v, name))
}

/// Closes `fd` on the mounted volume.
pub fn close_file(fd: Fd) -> Result<()> {
	with_mounted(|v| file::close(v, fd))
}

/// Rewrites the whole file behind `fd` with `buffer`.
pub fn write_file(fd: Fd, buffer: &[u8]) -> Result<()> {
	with_mounted(|v| file::write_file(v, fd, buffer))
}

/// Reads one byte at `fd`'s current seek offset.
pub fn read_byte(fd: Fd) -> Result<u8> {
	with_mounted(|v| file::read_byte(v, fd))
}

/// Overwrites one byte at `fd`'s current seek offset.
pub fn write_byte(fd: Fd, data: u8) -> Result<()> {
	with_mounted(|v| file::write_byte(v, fd, data))
}

/// Truncates the file behind `fd` to zero length.
pub fn delete_file(fd: Fd) -> Result<()> {
	with_mounted(|v| file::delete_file(v, fd))
}

/// Moves `fd`'s seek offset to `offset`.
pub fn seek(fd: Fd, offset: usize) -> Result<()> {
	with_mounted(|v| file::seek(v, fd, offset))
}

/// Renames `old_name` to `new_name` on the mounted volume.
pub fn rename(old_name: &str, new_name: &str) -> Result<()> {
	with_mounted(|v| file::rename(v, old_name, new_name))
}

/// Marks `name` read-only.
pub fn make_ro(name: &str) -> Result<()> {
	with_mounted(|v| file::set_permission(v, name, Permission::ReadOnly))
}

/// Marks `name` read-write.
pub fn make_rw(name: &str) -> Result<()> {
	with_mounted(|v| file::set_permission(v, name, Permission::ReadWrite))
}

/// Lists every non-root filename on the mounted volume.
pub fn readdir() -> Result<Vec<String>> {
	with_mounted(|v| file::readdir(v))
}

/// Reads back the metadata of the file behind `fd`.
pub fn read_file_info(fd: Fd) -> Result<FileInfo> {
	with_mounted(|v| file::read_file_info(v, fd))
}

#[cfg(test)]
mod test {
	use super::*;
	use std::env::temp_dir;

	fn temp_path(name: &str) -> PathBuf {
		let mut p = temp_dir();
		p.push(format!("tinyfs-api-test-{name}-{:?}", std::thread::current().id()));
		p
	}

	#[test]
	fn mkfs_mount_unmount_round_trip() {
		let path = temp_path("mkfs-mount");
		mkfs(&path, 4096).unwrap();
		mount(&path).unwrap();
		assert_eq!(mounted_path().as_deref(), Some(path.as_path()));
		unmount().unwrap();
		assert_eq!(mounted_path(), None);
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn operations_fail_without_mount() {
		assert!(matches!(open_file("foo"), Err(Error::InvalidArgument(_))));
	}

	#[test]
	fn mounting_another_volume_unmounts_the_first() {
		let path_a = temp_path("mount-a");
		let path_b = temp_path("mount-b");
		mkfs(&path_a, 4096).unwrap();
		mkfs(&path_b, 4096).unwrap();

		mount(&path_a).unwrap();
		mount(&path_b).unwrap();
		assert_eq!(mounted_path().as_deref(), Some(path_b.as_path()));

		unmount().unwrap();
		let _ = std::fs::remove_file(&path_a);
		let _ = std::fs::remove_file(&path_b);
	}
}
