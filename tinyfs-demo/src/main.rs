//! `tinyfs-demo` is a thin interactive driver for the `tinyfs` library: it formats or mounts
//! a backing file given on the command line, then reads one command per line from stdin and
//! prints the result, converting `tinyfs::Error` into the spec's named negative-code
//! convention at this boundary only — the library itself returns `Result`.

use std::env;
use std::io;
use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;
use tinyfs::api;
use tinyfs::Error;

/// Structure storing command line arguments.
#[derive(Default)]
struct Args {
	/// The name of the current program used in command line.
	prog: String,

	/// If true, print command line help.
	help: bool,

	/// The path to the backing file to format or mount.
	disk_path: Option<PathBuf>,

	/// If present, `mkfs` the disk to this many bytes before mounting.
	format_size: Option<u64>,
}

fn parse_args() -> Args {
	let mut args: Args = Default::default();
	let mut iter = env::args();
	args.prog = iter.next().unwrap_or("tinyfs-demo".to_owned());

	while let Some(arg) = iter.next() {
		match arg.as_str() {
			"-h" | "--help" => args.help = true,
			"-n" | "--new" => {
				let size = iter.next().unwrap_or_else(|| {
					eprintln!("{}: -n requires a size in bytes", args.prog);
					exit(1);
				});
				args.format_size = Some(size.parse().unwrap_or_else(|_| {
					eprintln!("{}: invalid size `{}`", args.prog, size);
					exit(1);
				}));
			},

			// TODO accept multiple backing files and a mount target

			_ => args.disk_path = Some(arg.into()),
		}
	}

	args
}

fn print_usage(prog: &str) {
	eprintln!("{}: bad usage", prog);
	eprintln!("Try '{} --help' for more information.", prog);
}

fn print_help(prog: &str) {
	println!();
	println!("Usage:");
	println!(" {} [-n SIZE] <disk-file>", prog);
	println!();
	println!("Mounts <disk-file> as a tinyfs volume and drives it from stdin commands.");
	println!("With -n SIZE, formats a fresh SIZE-byte volume first.");
	println!();
	println!("Commands (one per line on stdin):");
	println!("  open NAME            open or create NAME, prints its FD");
	println!("  close FD             close FD");
	println!("  write FD TEXT        rewrite the whole file behind FD with TEXT");
	println!("  readbyte FD          read one byte at FD's seek offset");
	println!("  seek FD OFFSET       move FD's seek offset");
	println!("  delete FD            truncate FD to zero length");
	println!("  rename OLD NEW       rename a file");
	println!("  chmod ro|rw NAME     toggle a file's permission");
	println!("  stat FD              print FD's metadata");
	println!("  ls                   list files");
	println!("  quit                 unmount and exit");
	println!();
}

/// The spec's closed per-operation negative-code convention, applied only at this boundary.
fn failure_code(op: &str, err: &Error) -> i32 {
	eprintln!("{op}: {err}");
	match op {
		"mkfs" => -1,
		"mount" => -2,
		"open" => -3,
		"close" => -4,
		"write" => -5,
		"readbyte" => -6,
		"writebyte" => -7,
		"seek" => -8,
		"delete" => -9,
		"rename" => -10,
		"readdir" => -11,
		"chmod" => -12,
		"stat" => -13,
		_ => -127,
	}
}

fn main() {
	let args = parse_args();
	if args.help {
		print_help(&args.prog);
		exit(0);
	}

	let Some(disk_path) = args.disk_path else {
		print_usage(&args.prog);
		exit(1);
	};

	if let Some(size) = args.format_size {
		if let Err(e) = api::mkfs(&disk_path, size) {
			exit(failure_code("mkfs", &e));
		}
	}

	if let Err(e) = api::mount(&disk_path) {
		exit(failure_code("mount", &e));
	}
	println!("mounted {}", disk_path.display());

	run_repl();

	if let Err(e) = api::unmount() {
		eprintln!("unmount: {e}");
	}
}

fn run_repl() {
	let stdin = io::stdin();
	loop {
		print!("tinyfs> ");
		let _ = io::stdout().flush();

		let mut line = String::new();
		if stdin.lock().read_line(&mut line).unwrap_or(0) == 0 {
			break;
		}
		let line = line.trim();
		if line.is_empty() {
			continue;
		}

		let mut parts = line.splitn(3, ' ');
		let cmd = parts.next().unwrap_or("");
		match cmd {
			"quit" | "exit" => break,
			"help" => print_help("tinyfs-demo"),
			"ls" => run_ls(),
			"open" => run_open(parts.next()),
			"close" => run_close(parts.next()),
			"write" => run_write(parts.next(), parts.next()),
			"readbyte" => run_readbyte(parts.next()),
			"seek" => run_seek(parts.next(), parts.next()),
			"delete" => run_delete(parts.next()),
			"rename" => run_rename(parts.next(), parts.next()),
			"chmod" => run_chmod(parts.next(), parts.next()),
			"stat" => run_stat(parts.next()),
			_ => eprintln!("unknown command `{cmd}`; type `help`"),
		}
	}
}

fn parse_fd(arg: Option<&str>, op: &str) -> Option<i32> {
	match arg.and_then(|s| s.parse().ok()) {
		Some(fd) => Some(fd),
		None => {
			eprintln!("{op}: expected a file descriptor");
			None
		},
	}
}

fn run_ls() {
	match api::readdir() {
		Ok(names) => {
			for name in names {
				println!("{name}");
			}
		},
		Err(e) => {
			failure_code("readdir", &e);
		},
	}
}

fn run_open(name: Option<&str>) {
	let Some(name) = name else {
		eprintln!("open: expected a name");
		return;
	};
	match api::open_file(name) {
		Ok(fd) => println!("fd {fd}"),
		Err(e) => {
			failure_code("open", &e);
		},
	}
}

fn run_close(fd: Option<&str>) {
	let Some(fd) = parse_fd(fd, "close") else { return };
	if let Err(e) = api::close_file(fd) {
		failure_code("close", &e);
	}
}

fn run_write(fd: Option<&str>, text: Option<&str>) {
	let Some(fd) = parse_fd(fd, "write") else { return };
	let text = text.unwrap_or("");
	if let Err(e) = api::write_file(fd, text.as_bytes()) {
		failure_code("write", &e);
	}
}

fn run_readbyte(fd: Option<&str>) {
	let Some(fd) = parse_fd(fd, "readbyte") else { return };
	match api::read_byte(fd) {
		Ok(b) => println!("{}", b as char),
		Err(e) => {
			failure_code("readbyte", &e);
		},
	}
}

fn run_seek(fd: Option<&str>, offset: Option<&str>) {
	let Some(fd) = parse_fd(fd, "seek") else { return };
	let Some(offset) = offset.and_then(|s| s.parse().ok()) else {
		eprintln!("seek: expected an offset");
		return;
	};
	if let Err(e) = api::seek(fd, offset) {
		failure_code("seek", &e);
	}
}

fn run_delete(fd: Option<&str>) {
	let Some(fd) = parse_fd(fd, "delete") else { return };
	if let Err(e) = api::delete_file(fd) {
		failure_code("delete", &e);
	}
}

fn run_rename(old: Option<&str>, new: Option<&str>) {
	let (Some(old), Some(new)) = (old, new) else {
		eprintln!("rename: expected OLD NEW");
		return;
	};
	if let Err(e) = api::rename(old, new) {
		failure_code("rename", &e);
	}
}

fn run_chmod(mode: Option<&str>, name: Option<&str>) {
	let (Some(mode), Some(name)) = (mode, name) else {
		eprintln!("chmod: expected ro|rw NAME");
		return;
	};
	let result = match mode {
		"ro" => api::make_ro(name),
		"rw" => api::make_rw(name),
		_ => {
			eprintln!("chmod: mode must be `ro` or `rw`");
			return;
		},
	};
	if let Err(e) = result {
		failure_code("chmod", &e);
	}
}

fn run_stat(fd: Option<&str>) {
	let Some(fd) = parse_fd(fd, "stat") else { return };
	match api::read_file_info(fd) {
		Ok(info) => {
			println!("name: {}", info.name);
			println!("size: {}", info.size);
			println!("permission: {:?}", info.permission);
			println!("created:  {}", info.created);
			println!("modified: {}", info.modified);
			println!("accessed: {}", info.accessed);
		},
		Err(e) => {
			failure_code("stat", &e);
		},
	}
}
