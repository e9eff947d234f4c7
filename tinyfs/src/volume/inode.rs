//! The on-disk inode: a file's metadata plus its ordered extent chain.

use crate::block::BLOCKSIZE;
use crate::error::Error;
use crate::error::Result;
use crate::volume::BlockTag;
use tinyfs_util::format_timestamp;
use tinyfs_util::get_timestamp;
use tinyfs_util::pack_name;
use tinyfs_util::parse_timestamp;
use tinyfs_util::unpack_name;
use tinyfs_util::NAME_FIELD_WIDTH;
use tinyfs_util::TIMESTAMP_WIDTH;

const PAYLOAD_OFFSET: usize = 2;

const NAME_OFF: usize = PAYLOAD_OFFSET;
const SIZE_OFF: usize = NAME_OFF + NAME_FIELD_WIDTH;
const PERM_OFF: usize = SIZE_OFF + 4;
const COUNT_OFF: usize = PERM_OFF + 1;
const TS_OFF: usize = COUNT_OFF + 2;
const CTIME_OFF: usize = TS_OFF;
const MTIME_OFF: usize = CTIME_OFF + TIMESTAMP_WIDTH;
const ATIME_OFF: usize = MTIME_OFF + TIMESTAMP_WIDTH;
const EXTENTS_OFF: usize = ATIME_OFF + TIMESTAMP_WIDTH;

/// Number of direct extent-chain slots an inode's payload can hold.
pub const MAX_EXTENTS: usize = (BLOCKSIZE - EXTENTS_OFF) / 2;

/// Name reserved for the root inode, which lives permanently at block 1.
pub const ROOT_NAME: &str = "/";
/// Block number of the root inode.
pub const ROOT_BLOCK: u32 = 1;

/// A file's (or the root's) permission tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
	ReadWrite = 0,
	ReadOnly = 1,
}

impl Permission {
	fn from_u8(v: u8) -> Result<Self> {
		match v {
			0 => Ok(Self::ReadWrite),
			1 => Ok(Self::ReadOnly),
			_ => Err(Error::Corruption),
		}
	}
}

/// In-memory view of an inode block.
pub struct Inode {
	pub name: String,
	pub size: i32,
	pub permission: Permission,
	pub extents: Vec<u32>,
	pub ctime: u64,
	pub mtime: u64,
	pub atime: u64,
}

impl Inode {
	/// Builds a fresh, empty inode for `name`, timestamped now.
	pub fn new(name: &str, permission: Permission) -> Result<Self> {
		if name.len() > tinyfs_util::NAME_MAX && name != ROOT_NAME {
			return Err(Error::InvalidArgument("name longer than 8 characters"));
		}
		let now = get_timestamp().as_secs();
		Ok(Self {
			name: name.to_string(),
			size: 0,
			permission,
			extents: Vec::new(),
			ctime: now,
			mtime: now,
			atime: now,
		})
	}

	/// Serializes into a full block image tagged [`BlockTag::Inode`].
	pub fn to_block(&self) -> Result<[u8; BLOCKSIZE]> {
		if self.extents.len() > MAX_EXTENTS {
			return Err(Error::OutOfSpace);
		}
		let name_field = pack_name(&self.name).ok_or(Error::InvalidArgument("name too long"))?;

		let mut block = [0u8; BLOCKSIZE];
		block[0] = BlockTag::Inode as u8;
		block[1] = crate::MAGIC;
		block[NAME_OFF..NAME_OFF + NAME_FIELD_WIDTH].copy_from_slice(&name_field);
		block[SIZE_OFF..SIZE_OFF + 4].copy_from_slice(&self.size.to_le_bytes());
		block[PERM_OFF] = self.permission as u8;
		block[COUNT_OFF..COUNT_OFF + 2].copy_from_slice(&(self.extents.len() as u16).to_le_bytes());

		block[CTIME_OFF..CTIME_OFF + TIMESTAMP_WIDTH]
			.copy_from_slice(&format_timestamp(std::time::Duration::from_secs(self.ctime)));
		block[MTIME_OFF..MTIME_OFF + TIMESTAMP_WIDTH]
			.copy_from_slice(&format_timestamp(std::time::Duration::from_secs(self.mtime)));
		block[ATIME_OFF..ATIME_OFF + TIMESTAMP_WIDTH]
			.copy_from_slice(&format_timestamp(std::time::Duration::from_secs(self.atime)));

		for (i, &extent) in self.extents.iter().enumerate() {
			let off = EXTENTS_OFF + i * 2;
			let extent: u16 = extent
				.try_into()
				.map_err(|_| Error::InvalidArgument("block number exceeds 16 bits"))?;
			block[off..off + 2].copy_from_slice(&extent.to_le_bytes());
		}

		Ok(block)
	}

	/// Parses an inode back out of a raw block image.
	pub fn from_block(block: &[u8; BLOCKSIZE]) -> Result<Self> {
		if block[0] != BlockTag::Inode as u8 || block[1] != crate::MAGIC {
			return Err(Error::Corruption);
		}

		let mut name_field = [0u8; NAME_FIELD_WIDTH];
		name_field.copy_from_slice(&block[NAME_OFF..NAME_OFF + NAME_FIELD_WIDTH]);
		let name = unpack_name(&name_field);

		let mut size_bytes = [0u8; 4];
		size_bytes.copy_from_slice(&block[SIZE_OFF..SIZE_OFF + 4]);
		let size = i32::from_le_bytes(size_bytes);

		let permission = Permission::from_u8(block[PERM_OFF])?;

		let mut count_bytes = [0u8; 2];
		count_bytes.copy_from_slice(&block[COUNT_OFF..COUNT_OFF + 2]);
		let count = u16::from_le_bytes(count_bytes) as usize;
		if count > MAX_EXTENTS {
			return Err(Error::Corruption);
		}

		let mut ctime_field = [0u8; TIMESTAMP_WIDTH];
		ctime_field.copy_from_slice(&block[CTIME_OFF..CTIME_OFF + TIMESTAMP_WIDTH]);
		let mut mtime_field = [0u8; TIMESTAMP_WIDTH];
		mtime_field.copy_from_slice(&block[MTIME_OFF..MTIME_OFF + TIMESTAMP_WIDTH]);
		let mut atime_field = [0u8; TIMESTAMP_WIDTH];
		atime_field.copy_from_slice(&block[ATIME_OFF..ATIME_OFF + TIMESTAMP_WIDTH]);

		let mut extents = Vec::with_capacity(count);
		for i in 0..count {
			let off = EXTENTS_OFF + i * 2;
			let mut extent_bytes = [0u8; 2];
			extent_bytes.copy_from_slice(&block[off..off + 2]);
			extents.push(u16::from_le_bytes(extent_bytes) as u32);
		}

		Ok(Self {
			name,
			size,
			permission,
			extents,
			ctime: parse_timestamp(&ctime_field),
			mtime: parse_timestamp(&mtime_field),
			atime: parse_timestamp(&atime_field),
		})
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn round_trips_through_block_image() {
		let mut inode = Inode::new("foo", Permission::ReadWrite).unwrap();
		inode.extents = vec![2, 3, 4];
		inode.size = 500;
		let block = inode.to_block().unwrap();
		let back = Inode::from_block(&block).unwrap();

		assert_eq!(back.name, "foo");
		assert_eq!(back.size, 500);
		assert_eq!(back.extents, vec![2, 3, 4]);
		assert_eq!(back.permission, Permission::ReadWrite);
	}

	#[test]
	fn rejects_name_too_long() {
		assert!(Inode::new("this_is_too_long", Permission::ReadWrite).is_err());
	}

	#[test]
	fn extent_chain_bounded() {
		let mut inode = Inode::new("big", Permission::ReadWrite).unwrap();
		inode.extents = vec![2; MAX_EXTENTS + 1];
		assert!(matches!(inode.to_block(), Err(Error::OutOfSpace)));
	}

	#[test]
	fn corrupt_magic_rejected() {
		let inode = Inode::new("foo", Permission::ReadWrite).unwrap();
		let mut block = inode.to_block().unwrap();
		block[1] = 0;
		assert!(matches!(Inode::from_block(&block), Err(Error::Corruption)));
	}
}
