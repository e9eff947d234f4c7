//! End-to-end scenarios against the API façade, mirroring real callers driving the demo
//! binary: format, mount, operate, unmount.

use std::env::temp_dir;
use std::path::PathBuf;
use tinyfs::api;
use tinyfs::block::BLOCKSIZE;
use tinyfs::Error;

fn temp_path(name: &str) -> PathBuf {
	let mut p = temp_dir();
	p.push(format!("tinyfs-e2e-{name}-{:?}", std::thread::current().id()));
	p
}

/// S1: format then mount, then unmount; backing file size matches exactly.
#[test]
fn s1_format_then_mount() {
	let path = temp_path("s1");
	api::mkfs(&path, 4096).unwrap();
	api::mount(&path).unwrap();
	api::unmount().unwrap();

	let metadata = std::fs::metadata(&path).unwrap();
	assert_eq!(metadata.len(), 4096);

	let _ = std::fs::remove_file(&path);
}

/// S2: small write/read with a trailing EOF.
#[test]
fn s2_small_write_read() {
	let path = temp_path("s2");
	api::mkfs(&path, BLOCKSIZE as u64 * 10).unwrap();
	api::mount(&path).unwrap();

	let f = api::open_file("foo").unwrap();
	api::write_file(f, b"hi").unwrap();
	api::seek(f, 0).unwrap();
	assert_eq!(api::read_byte(f).unwrap(), b'h');
	assert_eq!(api::read_byte(f).unwrap(), b'i');
	assert!(matches!(api::read_byte(f), Err(Error::OutOfBounds)));

	api::unmount().unwrap();
	let _ = std::fs::remove_file(&path);
}

/// S3: multi-block write crossing the 254-byte payload stride.
#[test]
fn s3_multi_block_write_with_payload_stride() {
	let path = temp_path("s3");
	api::mkfs(&path, BLOCKSIZE as u64 * 20).unwrap();
	api::mount(&path).unwrap();

	let g = api::open_file("big").unwrap();
	let buf: Vec<u8> = (0..524u32).map(|i| (i % 7) as u8 + b'A').collect();
	api::write_file(g, &buf).unwrap();

	api::seek(g, 0).unwrap();
	for &expected in &buf {
		assert_eq!(api::read_byte(g).unwrap(), expected);
	}
	assert!(matches!(api::read_byte(g), Err(Error::OutOfBounds)));

	api::unmount().unwrap();
	let _ = std::fs::remove_file(&path);
}

/// S4: rewrite truncates — writing a shorter buffer drops the old tail entirely.
#[test]
fn s4_rewrite_truncates() {
	let path = temp_path("s4");
	api::mkfs(&path, BLOCKSIZE as u64 * 20).unwrap();
	api::mount(&path).unwrap();

	let f = api::open_file("f").unwrap();
	api::write_file(f, &vec![b'X'; 500]).unwrap();
	api::write_file(f, &vec![b'Y'; 10]).unwrap();

	api::seek(f, 0).unwrap();
	for _ in 0..10 {
		assert_eq!(api::read_byte(f).unwrap(), b'Y');
	}
	assert!(matches!(api::read_byte(f), Err(Error::OutOfBounds)));

	api::unmount().unwrap();
	let _ = std::fs::remove_file(&path);
}

/// S5: permission denial, then recovery after `make_rw`.
#[test]
fn s5_permission_denial() {
	let path = temp_path("s5");
	api::mkfs(&path, BLOCKSIZE as u64 * 10).unwrap();
	api::mount(&path).unwrap();

	let r = api::open_file("ro").unwrap();
	api::make_ro("ro").unwrap();
	assert!(matches!(api::write_file(r, b"z"), Err(Error::PermissionDenied)));
	assert!(matches!(api::write_byte(r, 0), Err(Error::PermissionDenied)));
	assert!(matches!(api::delete_file(r), Err(Error::PermissionDenied)));

	api::make_rw("ro").unwrap();
	assert!(api::write_file(r, b"z").is_ok());

	api::unmount().unwrap();
	let _ = std::fs::remove_file(&path);
}

/// S6: rename semantics, including root-rename and too-long-name rejection.
#[test]
fn s6_rename_semantics() {
	let path = temp_path("s6");
	api::mkfs(&path, BLOCKSIZE as u64 * 10).unwrap();
	api::mount(&path).unwrap();

	let a = api::open_file("a").unwrap();
	api::write_file(a, b"hello").unwrap();

	api::rename("a", "b").unwrap();
	assert!(matches!(api::rename("/", "x"), Err(Error::InvalidArgument(_))));
	assert!(matches!(
		api::rename("b", "this_is_too_long"),
		Err(Error::InvalidArgument(_))
	));

	let names = api::readdir().unwrap();
	assert!(names.contains(&"b".to_string()));
	assert!(!names.contains(&"a".to_string()));

	let b = api::open_file("b").unwrap();
	api::seek(b, 0).unwrap();
	let mut out = Vec::new();
	for _ in 0..5 {
		out.push(api::read_byte(b).unwrap());
	}
	assert_eq!(out, b"hello");

	api::unmount().unwrap();
	let _ = std::fs::remove_file(&path);
}

/// Invariant 9 / S4's free-list note: opening, writing, then deleting a file returns the
/// volume to one block less than its initial free count (the inode block stays allocated).
#[test]
fn free_list_conservation_across_open_write_delete() {
	let path = temp_path("free-list");
	api::mkfs(&path, BLOCKSIZE as u64 * 10).unwrap();
	api::mount(&path).unwrap();

	let f = api::open_file("f").unwrap();
	api::write_file(f, &vec![b'z'; 300]).unwrap();
	api::delete_file(f).unwrap();
	api::close_file(f).unwrap();

	// Re-open and confirm the file is still there, empty, and a fresh write still works.
	let f2 = api::open_file("f").unwrap();
	let info = api::read_file_info(f2).unwrap();
	assert_eq!(info.size, 0);
	assert_eq!(info.name, "f");

	api::unmount().unwrap();
	let _ = std::fs::remove_file(&path);
}

/// Re-mounting the same path after an unmount sees the file written before unmount.
#[test]
fn remount_sees_previously_written_file() {
	let path = temp_path("remount");
	api::mkfs(&path, BLOCKSIZE as u64 * 10).unwrap();
	api::mount(&path).unwrap();
	let f = api::open_file("persist").unwrap();
	api::write_file(f, b"durable").unwrap();
	api::unmount().unwrap();

	api::mount(&path).unwrap();
	let f2 = api::open_file("persist").unwrap();
	let mut out = Vec::new();
	for _ in 0..7 {
		out.push(api::read_byte(f2).unwrap());
	}
	assert_eq!(out, b"durable");

	api::unmount().unwrap();
	let _ = std::fs::remove_file(&path);
}

/// Invariant 5: a random byte sequence survives a write/read round trip exactly, for
/// several random lengths spanning one to several extent blocks.
#[test]
fn random_round_trip() {
	use rand::Rng;

	let path = temp_path("random-round-trip");
	api::mkfs(&path, BLOCKSIZE as u64 * 30).unwrap();
	api::mount(&path).unwrap();

	let mut rng = rand::thread_rng();
	for len in [0usize, 1, 254, 255, 700, 2000] {
		let f = api::open_file("rnd").unwrap();
		let buf: Vec<u8> = (0..len).map(|_| rng.gen()).collect();
		api::write_file(f, &buf).unwrap();

		api::seek(f, 0).unwrap();
		let mut out = Vec::with_capacity(len);
		for _ in 0..len {
			out.push(api::read_byte(f).unwrap());
		}
		assert_eq!(out, buf);
		assert!(matches!(api::read_byte(f), Err(Error::OutOfBounds)));

		api::close_file(f).unwrap();
	}

	api::unmount().unwrap();
	let _ = std::fs::remove_file(&path);
}

/// Corrupting a block's magic byte makes `mount` fail verification.
#[test]
fn corrupt_magic_fails_mount() {
	let path = temp_path("corrupt");
	api::mkfs(&path, BLOCKSIZE as u64 * 10).unwrap();

	use std::io::Seek;
	use std::io::SeekFrom;
	use std::io::Write;
	let mut file = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
	file.seek(SeekFrom::Start(BLOCKSIZE as u64 * 3 + 1)).unwrap();
	file.write_all(&[0x00]).unwrap();
	drop(file);

	assert!(matches!(api::mount(&path), Err(Error::Corruption)));

	let _ = std::fs::remove_file(&path);
}
