// Strict-mode detection of DAX-capable mounts via /proc/self/mounts.
// Detection is a pure function over the mounts table so tests can feed
// synthetic tables without touching real devices.
use std::path::Path;

use crate::core::error::{Error, ErrorKind};

const MOUNTS_PATH: &str = "/proc/self/mounts";

/// Whether `path` lives on a filesystem mounted with the `dax` option.
///
/// Only the mount table is consulted; the file itself does not need to
/// exist yet (pool creation checks the target directory's mount).
pub fn path_is_dax(path: &Path) -> Result<bool, Error> {
    let mounts = std::fs::read_to_string(MOUNTS_PATH).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read mount table for pmem detection")
            .with_path(MOUNTS_PATH)
            .with_source(err)
    })?;
    Ok(mount_is_dax(&mounts, path))
}

/// Longest-prefix match of `path` against the mount table, then a `dax`
/// option check on the winning entry.
fn mount_is_dax(mounts: &str, path: &Path) -> bool {
    let mut best_len = 0usize;
    let mut best_dax = false;

    for line in mounts.lines() {
        let mut fields = line.split_whitespace();
        let _device = fields.next();
        let Some(mount_point) = fields.next() else {
            continue;
        };
        let _fs_type = fields.next();
        let Some(options) = fields.next() else {
            continue;
        };

        let mount_point = unescape_mount_point(mount_point);
        if !path_has_prefix(path, Path::new(&mount_point)) {
            continue;
        }
        if mount_point.len() >= best_len {
            best_len = mount_point.len();
            best_dax = options_have_dax(options);
        }
    }

    best_dax
}

fn options_have_dax(options: &str) -> bool {
    options
        .split(',')
        .any(|opt| opt == "dax" || opt == "dax=always" || opt == "dax=inode")
}

fn path_has_prefix(path: &Path, mount_point: &Path) -> bool {
    path.starts_with(mount_point)
}

// /proc/self/mounts escapes spaces and tabs octally in mount points.
fn unescape_mount_point(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let digits: String = chars.by_ref().take(3).collect();
        match u8::from_str_radix(&digits, 8) {
            Ok(byte) => out.push(byte as char),
            Err(_) => {
                out.push('\\');
                out.push_str(&digits);
            }
        }
    }
    out
}
