//! Linux mount table
//!
//! `/proc/self/mountinfo` lines look like
//! `36 35 98:0 /mnt1 /mnt/parent rw,noatime master:1 - ext3 /dev/root rw`.
//! The third field is the device and the fifth the mount point, with
//! spaces and other special characters escaped as `\ooo` octal.

use crate::mount::{MountEntry, MountSnapshot};
use std::ffi::OsString;
use std::fs;
use std::io;
use std::os::unix::ffi::OsStringExt;
use std::path::PathBuf;

const MOUNTINFO: &str = "/proc/self/mountinfo";

pub fn read_mount_table() -> io::Result<MountSnapshot> {
    let text = fs::read_to_string(MOUNTINFO)?;
    Ok(parse_mountinfo(&text))
}

/// Parse mountinfo text, skipping malformed lines
pub fn parse_mountinfo(text: &str) -> MountSnapshot {
    text.lines().filter_map(parse_line).collect()
}

fn parse_line(line: &str) -> Option<MountEntry> {
    let mut fields = line.split_ascii_whitespace();
    let device = fields.nth(2)?;
    let mount_point = fields.nth(1)?;

    Some(MountEntry::new(device, unescape(mount_point)))
}

/// Decode `\ooo` octal escapes
fn unescape(field: &str) -> PathBuf {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 3 < bytes.len() && is_octal(&bytes[i + 1..i + 4]) {
            let value = bytes[i + 1..i + 4]
                .iter()
                .fold(0u32, |acc, b| acc * 8 + u32::from(b - b'0'));
            if let Ok(byte) = u8::try_from(value) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    PathBuf::from(OsString::from_vec(out))
}

fn is_octal(digits: &[u8]) -> bool {
    digits.len() == 3 && digits.iter().all(|b| (b'0'..=b'7').contains(b))
}
