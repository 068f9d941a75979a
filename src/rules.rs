//! Rule sources: `:`-separated path and port lists from the environment
//!
//! Every list is read exactly once. The variable is copied, then removed from
//! the environment, so neither the sandboxed command nor a second read can
//! observe it.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use crate::error::SandboxError;

pub const ENV_FS_RO_NAME: &str = "LL_FS_RO";
pub const ENV_FS_RW_NAME: &str = "LL_FS_RW";
pub const ENV_TCP_BIND_NAME: &str = "LL_TCP_BIND";
pub const ENV_TCP_CONNECT_NAME: &str = "LL_TCP_CONNECT";
pub const ENV_DELIMITER: u8 = b':';

/// Source of the named inputs
pub trait Environment {
    /// Copy the variable out, then erase it
    fn take(&mut self, name: &str) -> Option<OsString>;
}

/// The real process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl Environment for ProcessEnv {
    fn take(&mut self, name: &str) -> Option<OsString> {
        let value = std::env::var_os(name)?;
        std::env::remove_var(name);
        Some(value)
    }
}

impl Environment for HashMap<String, OsString> {
    fn take(&mut self, name: &str) -> Option<OsString> {
        self.remove(name)
    }
}

/// Ordered raw entries of one list. Empty for an explicitly empty input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSourceList {
    entries: Vec<OsString>,
}

impl RuleSourceList {
    pub fn parse(raw: &OsStr) -> Self {
        if raw.is_empty() {
            return Self::default();
        }
        let entries = raw
            .as_bytes()
            .split(|b| *b == ENV_DELIMITER)
            .map(|entry| OsStr::from_bytes(entry).to_os_string())
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &OsStr> {
        self.entries.iter().map(OsString::as_os_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.iter().map(Path::new)
    }
}

impl<'a> FromIterator<&'a str> for RuleSourceList {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(OsString::from).collect(),
        }
    }
}

/// Read a mandatory path list. Absence is an error.
pub fn read_path_rules<E: Environment>(
    env: &mut E,
    name: &str,
) -> Result<RuleSourceList, SandboxError> {
    let raw = env.take(name).ok_or_else(|| SandboxError::MissingInput {
        name: name.to_string(),
    })?;
    Ok(RuleSourceList::parse(&raw))
}

/// Read an optional port list. `None` when the variable is not set.
pub fn read_port_rules<E: Environment>(
    env: &mut E,
    name: &str,
) -> Result<Option<Vec<u16>>, SandboxError> {
    let raw = match env.take(name) {
        Some(raw) => raw,
        None => return Ok(None),
    };
    RuleSourceList::parse(&raw)
        .iter()
        .map(|entry| parse_port(name, entry))
        .collect::<Result<Vec<_>, _>>()
        .map(Some)
}

fn parse_port(name: &str, entry: &OsStr) -> Result<u16, SandboxError> {
    let malformed = |reason: &str| SandboxError::MalformedInput {
        name: name.to_string(),
        entry: entry.to_string_lossy().into_owned(),
        reason: reason.to_string(),
    };

    let text = entry.to_str().ok_or_else(|| malformed("not valid UTF-8"))?;
    if text.is_empty() {
        return Err(malformed("empty port"));
    }
    if !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed("not a decimal port number"));
    }
    text.parse::<u16>()
        .map_err(|_| malformed("port out of range 0-65535"))
}

/// Everything the sandbox needs from the environment, read up front
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SandboxInputs {
    pub read_only: RuleSourceList,
    pub read_write: RuleSourceList,
    pub bind_ports: Option<Vec<u16>>,
    pub connect_ports: Option<Vec<u16>>,
}

impl SandboxInputs {
    /// Consume the four variables. Mandatory lists are checked first.
    pub fn take_from<E: Environment>(env: &mut E) -> Result<Self, SandboxError> {
        Ok(Self {
            read_only: read_path_rules(env, ENV_FS_RO_NAME)?,
            read_write: read_path_rules(env, ENV_FS_RW_NAME)?,
            bind_ports: read_port_rules(env, ENV_TCP_BIND_NAME)?,
            connect_ports: read_port_rules(env, ENV_TCP_CONNECT_NAME)?,
        })
    }
}
