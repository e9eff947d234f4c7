//! The file layer: the dynamic resource (open-file) table and the byte-granular
//! read/write/seek/delete/rename/permission/listing engine.
//!
//! Every extent block spends its first two bytes on a tag and a magic byte, so the
//! logical-to-physical translation always divides by [`PAYLOAD_STRIDE`] (254), not
//! [`BLOCKSIZE`] (256).

use crate::block::BLOCKSIZE;
use crate::error::Error;
use crate::error::Result;
use crate::volume::inode::Permission;
use crate::volume::inode::ROOT_NAME;
use crate::volume::Volume;
use tinyfs_util::get_timestamp;

/// Usable payload bytes per extent block, after the 2-byte tag+magic header.
pub const PAYLOAD_STRIDE: usize = BLOCKSIZE - 2;

/// A file descriptor. Drawn from the volume's `open_count`, strictly monotonic for the
/// volume's entire lifetime (not just while mounted) so a descriptor is never handed out
/// twice, even across an unmount/remount cycle.
pub type Fd = i32;

/// An in-memory open-file handle: a descriptor's name (for diagnostics), seek offset, and a
/// back-reference to its inode's block number.
pub struct DynamicResource {
	pub name: String,
	pub seek: usize,
	pub inode_block: u32,
}

/// A snapshot of an inode's metadata, returned by [`read_file_info`].
pub struct FileInfo {
	pub name: String,
	pub size: i32,
	pub permission: Permission,
	pub created: u64,
	pub modified: u64,
	pub accessed: u64,
}

fn resource<'a>(volume: &'a Volume, fd: Fd) -> Result<&'a DynamicResource> {
	volume.resources.get(&fd).ok_or(Error::NotFound)
}

fn resource_mut<'a>(volume: &'a mut Volume, fd: Fd) -> Result<&'a mut DynamicResource> {
	volume.resources.get_mut(&fd).ok_or(Error::NotFound)
}

/// Opens `name` on `volume`, creating a fresh zero-length inode if none exists yet.
///
/// Each open yields a distinct descriptor even when the name is already open elsewhere; all
/// descriptors on the same name share the same backing inode block but keep independent seek
/// offsets. The root is never opened as a user file.
pub fn open(volume: &mut Volume, name: &str) -> Result<Fd> {
	if name == ROOT_NAME {
		return Err(Error::InvalidArgument("the root cannot be opened as a user file"));
	}
	if name.len() > tinyfs_util::NAME_MAX {
		return Err(Error::InvalidArgument("name longer than 8 characters"));
	}

	let inode_block = match volume.find_by_name(name)? {
		Some(b) => b,
		None => {
			let block_num = volume.alloc_block()?;
			let inode = crate::volume::inode::Inode::new(name, Permission::ReadWrite)?;
			volume.write_inode(block_num, &inode)?;
			block_num
		}
	};

	let fd = volume.open_count;
	volume.open_count += 1;
	volume.resources.insert(
		fd,
		DynamicResource {
			name: name.to_string(),
			seek: 0,
			inode_block,
		},
	);

	Ok(fd)
}

/// Closes `fd`, stamping the backing inode's modification timestamp first.
pub fn close(volume: &mut Volume, fd: Fd) -> Result<()> {
	let inode_block = resource(volume, fd)?.inode_block;
	let mut inode = volume.read_inode(inode_block)?;
	inode.mtime = get_timestamp().as_secs();
	volume.write_inode(inode_block, &inode)?;

	volume.resources.remove(&fd);
	Ok(())
}

/// Rewrites the whole file behind `fd` with `buffer`, truncating any previous content first.
pub fn write_file(volume: &mut Volume, fd: Fd, buffer: &[u8]) -> Result<()> {
	let inode_block = resource(volume, fd)?.inode_block;

	delete_inode_data(volume, inode_block)?;

	let mut inode = volume.read_inode(inode_block)?;
	if inode.permission == Permission::ReadOnly {
		return Err(Error::PermissionDenied);
	}

	let mut written = 0usize;
	if !buffer.is_empty() {
		let mut current = volume.alloc_block()?;
		inode.extents.push(current);

		while written < buffer.len() {
			let block_off = written % PAYLOAD_STRIDE;
			let chunk_len = (PAYLOAD_STRIDE - block_off).min(buffer.len() - written);
			volume.write_extent(current, block_off, &buffer[written..written + chunk_len])?;
			written += chunk_len;

			if written < buffer.len() {
				current = volume.alloc_block()?;
				inode.extents.push(current);
			}
		}
	}

	inode.size = written as i32;
	inode.mtime = get_timestamp().as_secs();
	volume.write_inode(inode_block, &inode)?;

	resource_mut(volume, fd)?.seek = 0;
	Ok(())
}

/// Reads one byte at the descriptor's current seek offset, advancing it by one.
///
/// Fails at end-of-file without advancing the seek offset.
pub fn read_byte(volume: &mut Volume, fd: Fd) -> Result<u8> {
	let (inode_block, seek) = {
		let r = resource(volume, fd)?;
		(r.inode_block, r.seek)
	};

	let mut inode = volume.read_inode(inode_block)?;
	if seek >= inode.size as usize {
		return Err(Error::OutOfBounds);
	}

	let extent_index = seek / PAYLOAD_STRIDE;
	let within = seek % PAYLOAD_STRIDE;
	let extent = *inode
		.extents
		.get(extent_index)
		.ok_or(Error::Corruption)?;

	let mut byte = [0u8; 1];
	volume.read_extent(extent, within, &mut byte)?;

	inode.atime = get_timestamp().as_secs();
	volume.write_inode(inode_block, &inode)?;
	resource_mut(volume, fd)?.seek += 1;

	Ok(byte[0])
}

/// Overwrites one byte at the descriptor's current seek offset, advancing it by one.
///
/// This never extends the file: the offset must already be within the current size.
pub fn write_byte(volume: &mut Volume, fd: Fd, data: u8) -> Result<()> {
	let (inode_block, seek) = {
		let r = resource(volume, fd)?;
		(r.inode_block, r.seek)
	};

	let mut inode = volume.read_inode(inode_block)?;
	if inode.permission == Permission::ReadOnly {
		return Err(Error::PermissionDenied);
	}
	if seek >= inode.size as usize {
		return Err(Error::OutOfBounds);
	}

	inode.mtime = get_timestamp().as_secs();
	volume.write_inode(inode_block, &inode)?;

	let extent_index = seek / PAYLOAD_STRIDE;
	let within = seek % PAYLOAD_STRIDE;
	let extent = *inode
		.extents
		.get(extent_index)
		.ok_or(Error::Corruption)?;
	volume.write_extent(extent, within, &[data])?;

	resource_mut(volume, fd)?.seek += 1;
	Ok(())
}

/// Frees every data block backing `fd`'s file and resets its size to 0, preserving the inode
/// itself (`ftruncate(fd, 0)` semantics).
pub fn delete_file(volume: &mut Volume, fd: Fd) -> Result<()> {
	let inode_block = resource(volume, fd)?.inode_block;
	let inode = volume.read_inode(inode_block)?;
	if inode.permission == Permission::ReadOnly {
		return Err(Error::PermissionDenied);
	}
	delete_inode_data(volume, inode_block)
}

fn delete_inode_data(volume: &mut Volume, inode_block: u32) -> Result<()> {
	let mut inode = volume.read_inode(inode_block)?;
	let extents = std::mem::take(&mut inode.extents);
	for extent in extents {
		volume.release_extent(extent)?;
	}
	inode.size = 0;
	inode.mtime = get_timestamp().as_secs();
	volume.write_inode(inode_block, &inode)
}

/// Moves `fd`'s seek offset to `offset`. `offset == size` is permitted; `offset > size` is
/// rejected.
pub fn seek(volume: &mut Volume, fd: Fd, offset: usize) -> Result<()> {
	let inode_block = resource(volume, fd)?.inode_block;
	let inode = volume.read_inode(inode_block)?;
	if offset > inode.size as usize {
		return Err(Error::OutOfBounds);
	}
	resource_mut(volume, fd)?.seek = offset;
	Ok(())
}

/// Renames `old_name` to `new_name`, updating every open descriptor's cached name.
pub fn rename(volume: &mut Volume, old_name: &str, new_name: &str) -> Result<()> {
	if new_name.len() > tinyfs_util::NAME_MAX {
		return Err(Error::InvalidArgument("name longer than 8 characters"));
	}
	if old_name == ROOT_NAME {
		return Err(Error::InvalidArgument("the root cannot be renamed"));
	}

	let inode_block = volume.find_by_name(old_name)?.ok_or(Error::NotFound)?;
	let mut inode = volume.read_inode(inode_block)?;
	inode.name = new_name.to_string();
	volume.write_inode(inode_block, &inode)?;

	for r in volume.resources.values_mut() {
		if r.inode_block == inode_block {
			r.name = new_name.to_string();
		}
	}

	Ok(())
}

/// Sets the permission of the file named `name`.
pub fn set_permission(volume: &mut Volume, name: &str, permission: Permission) -> Result<()> {
	let inode_block = volume.find_by_name(name)?.ok_or(Error::NotFound)?;
	let mut inode = volume.read_inode(inode_block)?;
	inode.permission = permission;
	inode.mtime = get_timestamp().as_secs();
	volume.write_inode(inode_block, &inode)
}

/// Lists every non-root filename on the volume.
pub fn readdir(volume: &Volume) -> Result<Vec<String>> {
	volume.list_names()
}

/// Reads back the metadata of the file behind `fd`.
pub fn read_file_info(volume: &Volume, fd: Fd) -> Result<FileInfo> {
	let inode_block = resource(volume, fd)?.inode_block;
	let inode = volume.read_inode(inode_block)?;
	Ok(FileInfo {
		name: inode.name,
		size: inode.size,
		permission: inode.permission,
		created: inode.ctime,
		modified: inode.mtime,
		accessed: inode.atime,
	})
}
