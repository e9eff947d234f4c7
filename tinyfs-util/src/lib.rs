//! Small helpers shared between the `tinyfs` core and its demo binary.

use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// Returns the current timestamp since the Unix epoch.
pub fn get_timestamp() -> Duration {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System clock panic!")
}

/// Divides `a` by `b`, rounding up.
pub fn ceil_div(a: usize, b: usize) -> usize {
	(a + b - 1) / b
}

/// The fixed width of a timestamp field as stored on disk.
pub const TIMESTAMP_WIDTH: usize = 30;

/// Renders a timestamp as a fixed-width, NUL-padded ASCII string suitable for an on-disk
/// field of [`TIMESTAMP_WIDTH`] bytes.
///
/// The format is not `asctime`'s locale-dependent one; it is a fixed-width decimal rendering
/// of seconds-since-epoch, which is all the on-disk contract requires (a fixed-width textual
/// slot, per the original design notes).
pub fn format_timestamp(ts: Duration) -> [u8; TIMESTAMP_WIDTH] {
	let mut buf = [0u8; TIMESTAMP_WIDTH];
	let text = ts.as_secs().to_string();
	let len = text.len().min(TIMESTAMP_WIDTH);
	buf[..len].copy_from_slice(&text.as_bytes()[..len]);
	buf
}

/// Parses a fixed-width timestamp field back into seconds-since-epoch.
///
/// Returns `0` for an all-zero (never-set) field rather than failing, since a freshly
/// formatted disk legitimately has no modification/access time yet.
pub fn parse_timestamp(field: &[u8; TIMESTAMP_WIDTH]) -> u64 {
	let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
	std::str::from_utf8(&field[..end])
		.ok()
		.and_then(|s| s.parse().ok())
		.unwrap_or(0)
}

/// Packs a name (at most [`NAME_MAX`] bytes) into a fixed-width, NUL-terminated field.
pub const NAME_MAX: usize = 8;
/// The on-disk width of a name field: [`NAME_MAX`] characters plus a NUL terminator.
pub const NAME_FIELD_WIDTH: usize = NAME_MAX + 1;

/// Packs `name` into a [`NAME_FIELD_WIDTH`]-byte NUL-terminated field.
///
/// Returns `None` if `name` is longer than [`NAME_MAX`] bytes.
pub fn pack_name(name: &str) -> Option<[u8; NAME_FIELD_WIDTH]> {
	if name.len() > NAME_MAX {
		return None;
	}
	let mut buf = [0u8; NAME_FIELD_WIDTH];
	buf[..name.len()].copy_from_slice(name.as_bytes());
	Some(buf)
}

/// Unpacks a fixed-width NUL-terminated name field back into a `String`.
pub fn unpack_name(field: &[u8; NAME_FIELD_WIDTH]) -> String {
	let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
	String::from_utf8_lossy(&field[..end]).into_owned()
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn ceil_div_exact() {
		assert_eq!(ceil_div(254, 254), 1);
		assert_eq!(ceil_div(0, 254), 0);
	}

	#[test]
	fn ceil_div_rounds_up() {
		assert_eq!(ceil_div(524, 254), 3);
		assert_eq!(ceil_div(255, 254), 2);
	}

	#[test]
	fn name_round_trip() {
		let packed = pack_name("foo").unwrap();
		assert_eq!(unpack_name(&packed), "foo");
	}

	#[test]
	fn name_too_long_rejected() {
		assert!(pack_name("this_is_too_long").is_none());
	}

	#[test]
	fn name_max_length_accepted() {
		let packed = pack_name("12345678").unwrap();
		assert_eq!(unpack_name(&packed), "12345678");
	}

	#[test]
	fn timestamp_round_trip() {
		let ts = Duration::from_secs(1_700_000_000);
		let field = format_timestamp(ts);
		assert_eq!(parse_timestamp(&field), 1_700_000_000);
	}

	#[test]
	fn timestamp_zero_field_parses_as_zero() {
		let field = [0u8; TIMESTAMP_WIDTH];
		assert_eq!(parse_timestamp(&field), 0);
	}
}
