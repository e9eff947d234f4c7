//! The closed error taxonomy shared by every operation in the core.

use std::fmt;
use std::io;

/// An error produced by any `tinyfs` operation.
///
/// Every core operation returns one of these kinds rather than a raw `io::Error`, so that
/// callers (and the demo binary, which maps these to the spec's negative return codes) can
/// match on *why* an operation failed without parsing a message.
#[derive(Debug)]
pub enum Error {
	/// A name, handle, or volume lookup missed.
	NotFound,
	/// A supplied argument violates a documented constraint (bad size, name too long, rename
	/// of the root).
	InvalidArgument(&'static str),
	/// The free-block list is empty, or an inode's direct extent chain is full.
	OutOfSpace,
	/// The target inode is `READONLY`.
	PermissionDenied,
	/// A seek, read, or write went past the bounds the operation allows.
	OutOfBounds,
	/// A block's magic byte did not match during mount verification.
	Corruption,
	/// The operation targeted a disk handle that has been closed.
	DeviceClosed,
	/// The underlying host file I/O failed.
	Io(io::Error),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::NotFound => write!(f, "not found"),
			Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
			Self::OutOfSpace => write!(f, "out of space"),
			Self::PermissionDenied => write!(f, "permission denied"),
			Self::OutOfBounds => write!(f, "out of bounds"),
			Self::Corruption => write!(f, "corrupt volume: magic mismatch"),
			Self::DeviceClosed => write!(f, "device closed"),
			Self::Io(e) => write!(f, "I/O error: {e}"),
		}
	}
}

impl std::error::Error for Error {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Self {
		Self::Io(e)
	}
}

/// A `Result` specialized to [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
