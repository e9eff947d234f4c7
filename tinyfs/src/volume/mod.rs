//! The volume layer: on-disk layout (superblock, root inode, free-block accounting) and
//! mount-time verification.

pub mod inode;
pub mod superblock;

use crate::block;
use crate::block::BLOCKSIZE;
use crate::error::Error;
use crate::error::Result;
use crate::file::DynamicResource;
use crate::file::Fd;
use inode::Inode;
use inode::Permission;
use inode::ROOT_BLOCK;
use inode::ROOT_NAME;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use superblock::Superblock;

/// The one-byte type tag stored at byte 0 of every block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlockTag {
	Superblock = 1,
	Inode = 2,
	FileExtent = 3,
	Free = 4,
}

impl BlockTag {
	fn from_u8(v: u8) -> Result<Self> {
		match v {
			1 => Ok(Self::Superblock),
			2 => Ok(Self::Inode),
			3 => Ok(Self::FileExtent),
			4 => Ok(Self::Free),
			_ => Err(Error::Corruption),
		}
	}
}

/// A mounted (or mountable) volume: the in-memory state the file layer operates against.
pub struct Volume {
	pub(crate) path: PathBuf,
	pub(crate) size: u64,
	pub(crate) disk: block::DiskHandle,
	/// Source of new descriptors: strictly monotonic for the volume's lifetime (invariant 6),
	/// never reset by `unmount`, so a descriptor handed out before an unmount is never handed
	/// out again after a remount.
	pub(crate) open_count: Fd,
	pub(crate) mounted: bool,
	pub(crate) superblock: Superblock,
	pub(crate) resources: HashMap<Fd, DynamicResource>,
}

impl Volume {
	fn total_blocks(&self) -> u32 {
		(self.size / BLOCKSIZE as u64) as u32
	}

	/// Formats a brand-new volume of `n_bytes` bytes at `path` and returns its in-memory
	/// handle, unmounted.
	pub fn format(path: &Path, n_bytes: u64) -> Result<Self> {
		if n_bytes == 0 || n_bytes % BLOCKSIZE as u64 != 0 {
			return Err(Error::InvalidArgument("size must be a positive multiple of BLOCKSIZE"));
		}
		let disk = block::open_disk(path, n_bytes)?;
		let total_blocks = (n_bytes / BLOCKSIZE as u64) as u32;

		let free_block = [BlockTag::Free as u8, crate::MAGIC];
		let mut free_image = [0u8; BLOCKSIZE];
		free_image[..2].copy_from_slice(&free_block);
		for b in 0..total_blocks as u64 {
			block::write_block(disk, b, &free_image)?;
		}

		let superblock = Superblock::new(total_blocks)?;
		block::write_block(disk, 0, &superblock.to_block())?;

		let root = Inode::new(ROOT_NAME, Permission::ReadWrite)?;
		block::write_block(disk, ROOT_BLOCK as u64, &root.to_block()?)?;

		Ok(Self {
			path: path.to_path_buf(),
			size: n_bytes,
			disk,
			open_count: 0,
			mounted: false,
			superblock,
			resources: HashMap::new(),
		})
	}

	/// Opens an already-formatted volume from `path` without reformatting it, loading its
	/// cached superblock. The volume starts unmounted.
	pub fn open_existing(path: &Path) -> Result<Self> {
		let disk = block::open_disk(path, 0)?;
		let size = block::disk_capacity(disk)?;

		let mut block = [0u8; BLOCKSIZE];
		block::read_block(disk, 0, &mut block)?;
		let superblock = Superblock::from_block(&block)?;

		Ok(Self {
			path: path.to_path_buf(),
			size,
			disk,
			open_count: 0,
			mounted: false,
			superblock,
			resources: HashMap::new(),
		})
	}

	/// Verifies the magic invariant on every block of the volume.
	pub fn verify(&self) -> Result<()> {
		let mut block = [0u8; BLOCKSIZE];
		for b in 0..self.total_blocks() as u64 {
			block::read_block(self.disk, b, &mut block)?;
			if block[1] != crate::MAGIC {
				return Err(Error::Corruption);
			}
		}
		Ok(())
	}

	/// Marks this volume mounted. Callers are responsible for unmounting any previously
	/// mounted volume first (the API façade enforces the single-mount-slot rule).
	pub fn mount(&mut self) -> Result<()> {
		self.verify()?;
		self.mounted = true;
		Ok(())
	}

	/// Clears the mounted flag and drops every dynamic resource: descriptors do not survive
	/// an unmount. The underlying block device handle is left open — closing it is a
	/// separate, explicit block-device operation, not implied by unmounting.
	pub fn unmount(&mut self) -> Result<()> {
		if !self.mounted {
			return Err(Error::InvalidArgument("volume is not mounted"));
		}
		self.mounted = false;
		self.resources.clear();
		Ok(())
	}

	/// Closes the volume's underlying block device handle. After this, the volume can no
	/// longer be mounted without reformatting; callers normally only do this at process
	/// shutdown.
	pub fn close_disk(&self) -> Result<()> {
		block::close_disk(self.disk)
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Reads the inode stored at `block_num`.
	pub fn read_inode(&self, block_num: u32) -> Result<Inode> {
		let mut block = [0u8; BLOCKSIZE];
		block::read_block(self.disk, block_num as u64, &mut block)?;
		if BlockTag::from_u8(block[0])? != BlockTag::Inode {
			return Err(Error::Corruption);
		}
		Inode::from_block(&block)
	}

	/// Persists `inode` at `block_num`.
	pub fn write_inode(&self, block_num: u32, inode: &Inode) -> Result<()> {
		block::write_block(self.disk, block_num as u64, &inode.to_block()?)
	}

	/// Reads the raw 254-byte payload of the extent block `block_num` starting at its
	/// logical byte offset `within`, copying up to `buf.len()` bytes.
	pub fn read_extent(&self, block_num: u32, within: usize, buf: &mut [u8]) -> Result<()> {
		let mut block = [0u8; BLOCKSIZE];
		block::read_block(self.disk, block_num as u64, &mut block)?;
		let start = 2 + within;
		buf.copy_from_slice(&block[start..start + buf.len()]);
		Ok(())
	}

	/// Writes `data` into the extent block `block_num` at logical byte offset `within`,
	/// tagging the block [`BlockTag::FileExtent`].
	pub fn write_extent(&self, block_num: u32, within: usize, data: &[u8]) -> Result<()> {
		let mut block = [0u8; BLOCKSIZE];
		block::read_block(self.disk, block_num as u64, &mut block)?;
		block[0] = BlockTag::FileExtent as u8;
		block[1] = crate::MAGIC;
		let start = 2 + within;
		block[start..start + data.len()].copy_from_slice(data);
		block::write_block(self.disk, block_num as u64, &block)
	}

	/// Overwrites `block_num` with a fresh free-block image and returns it to the bitmap.
	pub fn release_extent(&mut self, block_num: u32) -> Result<()> {
		let mut image = [0u8; BLOCKSIZE];
		image[0] = BlockTag::Free as u8;
		image[1] = crate::MAGIC;
		block::write_block(self.disk, block_num as u64, &image)?;
		self.superblock.free_block(block_num);
		block::write_block(self.disk, 0, &self.superblock.to_block())
	}

	/// Allocates a free block, persisting the updated superblock bitmap.
	pub fn alloc_block(&mut self) -> Result<u32> {
		let b = self.superblock.alloc_block()?;
		block::write_block(self.disk, 0, &self.superblock.to_block())?;
		Ok(b)
	}

	/// Number of blocks currently free (for diagnostics and tests).
	pub fn free_count(&self) -> u32 {
		self.superblock.free_count()
	}

	/// Scans every block for an inode whose name matches `name`, returning its block number.
	pub fn find_by_name(&self, name: &str) -> Result<Option<u32>> {
		let mut block = [0u8; BLOCKSIZE];
		for b in 0..self.total_blocks() as u64 {
			block::read_block(self.disk, b, &mut block)?;
			if block[0] == BlockTag::Inode as u8 {
				let inode = Inode::from_block(&block)?;
				if inode.name == name {
					return Ok(Some(b as u32));
				}
			}
		}
		Ok(None)
	}

	/// Lists every inode's name, excluding the root at [`ROOT_BLOCK`].
	pub fn list_names(&self) -> Result<Vec<String>> {
		let mut names = Vec::new();
		let mut block = [0u8; BLOCKSIZE];
		for b in 0..self.total_blocks() as u64 {
			if b as u32 == ROOT_BLOCK {
				continue;
			}
			block::read_block(self.disk, b, &mut block)?;
			if block[0] == BlockTag::Inode as u8 {
				names.push(Inode::from_block(&block)?.name);
			}
		}
		Ok(names)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use std::env::temp_dir;

	fn temp_path(name: &str) -> PathBuf {
		let mut p = temp_dir();
		p.push(format!("tinyfs-volume-test-{name}-{:?}", std::thread::current().id()));
		p
	}

	#[test]
	fn format_then_verify() {
		let path = temp_path("format-verify");
		let volume = Volume::format(&path, BLOCKSIZE as u64 * 10).unwrap();
		assert!(volume.verify().is_ok());
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn format_rejects_non_multiple() {
		let path = temp_path("format-bad-size");
		assert!(Volume::format(&path, 100).is_err());
	}

	#[test]
	fn root_inode_present_after_format() {
		let path = temp_path("root-inode");
		let volume = Volume::format(&path, BLOCKSIZE as u64 * 10).unwrap();
		let root = volume.read_inode(ROOT_BLOCK).unwrap();
		assert_eq!(root.name, ROOT_NAME);
		assert_eq!(root.size, 0);
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn find_by_name_misses_on_fresh_volume() {
		let path = temp_path("find-miss");
		let volume = Volume::format(&path, BLOCKSIZE as u64 * 10).unwrap();
		assert_eq!(volume.find_by_name("nope").unwrap(), None);
		let _ = std::fs::remove_file(&path);
	}

	#[test]
	fn alloc_and_release_round_trip_free_count() {
		let path = temp_path("alloc-release");
		let mut volume = Volume::format(&path, BLOCKSIZE as u64 * 10).unwrap();
		let before = volume.free_count();
		let b = volume.alloc_block().unwrap();
		assert_eq!(volume.free_count(), before - 1);
		volume.release_extent(b).unwrap();
		assert_eq!(volume.free_count(), before);
		let _ = std::fs::remove_file(&path);
	}
}
