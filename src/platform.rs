//! Platform identification
//!
//! OS ids follow the table convention: "linux", "darwin", "windows", or any
//! other lower-case token. Flag vocabularies only distinguish two families.

use serde::{Deserialize, Serialize};

/// Current OS id in table form
pub fn detect_os() -> String {
    match std::env::consts::OS {
        "macos" => "darwin".to_string(),
        other => other.to_string(),
    }
}

/// Shell flag vocabulary family
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsFamily {
    Posix,
    Windows,
}

impl OsFamily {
    pub fn from_os_id(os: &str) -> Self {
        if os.eq_ignore_ascii_case("windows") {
            OsFamily::Windows
        } else {
            OsFamily::Posix
        }
    }

    pub fn current() -> Self {
        Self::from_os_id(&detect_os())
    }

    /// Program and flag used to run a command line
    pub fn shell(&self) -> (&'static str, &'static str) {
        match self {
            OsFamily::Posix => ("sh", "-c"),
            OsFamily::Windows => ("cmd", "/C"),
        }
    }

    /// Directory listing verb
    pub fn list_dir(&self) -> &'static str {
        match self {
            OsFamily::Posix => "ls",
            OsFamily::Windows => "dir",
        }
    }

    /// Flag that makes a listing verbose / long
    pub fn detail_flag(&self) -> &'static str {
        match self {
            OsFamily::Posix => "-l",
            OsFamily::Windows => "/q",
        }
    }

    /// Flag that orders a listing by size, largest first
    pub fn size_sort_flag(&self) -> &'static str {
        match self {
            OsFamily::Posix => "-S",
            OsFamily::Windows => "/o:-s",
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsFamily::Posix => write!(f, "posix"),
            OsFamily::Windows => write!(f, "windows"),
        }
    }
}
