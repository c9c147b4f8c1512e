//! Logged-in user sessions from the utmp database.
//!
//! Records follow the glibc `struct utmpx` layout (384 bytes on Linux).

use serde::Serialize;
use std::fs;
use std::path::Path;

pub const UTMP_PATH: &str = "/var/run/utmp";

const RECORD_SIZE: usize = 384;
const USER_PROCESS: i16 = 7;

const OFF_TYPE: usize = 0;
const OFF_PID: usize = 4;
const OFF_LINE: usize = 8;
const LEN_LINE: usize = 32;
const OFF_USER: usize = 44;
const LEN_USER: usize = 32;
const OFF_HOST: usize = 76;
const LEN_HOST: usize = 256;
const OFF_TV_SEC: usize = 340;

/// A logged-in session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserSession {
    pub name: String,
    pub terminal: Option<String>,
    pub host: Option<String>,
    /// Login time, seconds since epoch.
    pub started: f64,
    pub pid: Option<u32>,
}

/// Reads active user sessions; an unreadable utmp yields none.
pub fn read_sessions(path: &Path) -> Vec<UserSession> {
    fs::read(path)
        .map(|bytes| parse_utmp(&bytes))
        .unwrap_or_default()
}

/// Parses raw utmp records, keeping only `USER_PROCESS` entries.
pub fn parse_utmp(bytes: &[u8]) -> Vec<UserSession> {
    bytes
        .chunks_exact(RECORD_SIZE)
        .filter_map(parse_record)
        .collect()
}

fn parse_record(record: &[u8]) -> Option<UserSession> {
    let ut_type = i16::from_ne_bytes([record[OFF_TYPE], record[OFF_TYPE + 1]]);
    if ut_type != USER_PROCESS {
        return None;
    }

    let name = c_field(&record[OFF_USER..OFF_USER + LEN_USER]);
    if name.is_empty() {
        return None;
    }

    let pid = read_i32(record, OFF_PID);
    let started = read_i32(record, OFF_TV_SEC);

    Some(UserSession {
        name,
        terminal: non_empty(c_field(&record[OFF_LINE..OFF_LINE + LEN_LINE])),
        host: non_empty(c_field(&record[OFF_HOST..OFF_HOST + LEN_HOST])),
        started: f64::from(started),
        pid: u32::try_from(pid).ok().filter(|p| *p > 0),
    })
}

fn read_i32(record: &[u8], offset: usize) -> i32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&record[offset..offset + 4]);
    i32::from_ne_bytes(buf)
}

/// Decodes a NUL-padded C string field.
fn c_field(raw: &[u8]) -> String {
    let end = raw.iter().position(|b| *b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
