//! Ruleset construction: turns rule lists into attached Landlock rules

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsFd;
use std::path::Path;

use tracing::debug;

use crate::access::{FsAccess, NetAccess, RulesetAttr, FILE_ONLY};
use crate::error::SandboxError;
use crate::rules::RuleSourceList;
use crate::sys::{Landlock, NetPort, PathBeneath, Rule};

/// A created ruleset being populated. Dropping it closes the ruleset.
pub struct RulesetBuilder<'l, L: Landlock> {
    sys: &'l L,
    ruleset: L::Ruleset,
    fs_rules: usize,
    net_rules: usize,
}

/// Open `path` as an `O_PATH` reference: no read permission is needed and the
/// content is never accessed.
fn open_path(path: &Path) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.read(true);
    #[cfg(target_os = "linux")]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.custom_flags(libc::O_PATH);
    }
    options.open(path)
}

/// Narrow `access` to the rights valid on the given kind of file
pub fn access_for(access: FsAccess, is_dir: bool) -> FsAccess {
    if is_dir {
        access
    } else {
        access & FILE_ONLY
    }
}

impl<'l, L: Landlock> RulesetBuilder<'l, L> {
    /// Create a ruleset handling `attr`
    pub fn create(sys: &'l L, attr: &RulesetAttr) -> Result<Self, SandboxError> {
        let ruleset = sys
            .create_ruleset(attr)
            .map_err(|source| SandboxError::RulesetCreateFailed { source })?;
        debug!(
            handled_fs = ?attr.handled_access_fs,
            handled_net = ?attr.handled_access_net,
            "Created ruleset"
        );
        Ok(Self {
            sys,
            ruleset,
            fs_rules: 0,
            net_rules: 0,
        })
    }

    /// Allow `access` beneath every path of `list`. Stops at the first failure.
    pub fn add_paths(
        &mut self,
        list: &RuleSourceList,
        access: FsAccess,
    ) -> Result<usize, SandboxError> {
        for path in list.paths() {
            self.add_path(path, access)?;
        }
        Ok(list.len())
    }

    fn add_path(&mut self, path: &Path, access: FsAccess) -> Result<(), SandboxError> {
        let unavailable = |source| SandboxError::PathUnavailable {
            path: path.to_path_buf(),
            source,
        };

        // Closed when `parent` goes out of scope, on every return path
        let parent = open_path(path).map_err(unavailable)?;
        let metadata = parent.metadata().map_err(unavailable)?;
        let allowed_access = access_for(access, metadata.is_dir());

        let rule = Rule::PathBeneath(PathBeneath {
            parent: parent.as_fd(),
            path,
            allowed_access,
        });
        self.sys
            .add_rule(&self.ruleset, &rule)
            .map_err(|source| SandboxError::RuleRejected {
                target: format!("\"{}\"", path.display()),
                source,
            })?;

        debug!(path = %path.display(), access = ?allowed_access, "Added path rule");
        self.fs_rules += 1;
        Ok(())
    }

    /// Allow `access` on every port of `ports`, in order
    pub fn add_ports(&mut self, ports: &[u16], access: NetAccess) -> Result<usize, SandboxError> {
        for &port in ports {
            let rule = Rule::NetPort(NetPort {
                port,
                allowed_access: access,
            });
            self.sys
                .add_rule(&self.ruleset, &rule)
                .map_err(|source| SandboxError::RuleRejected {
                    target: format!("port \"{}\"", port),
                    source,
                })?;
            debug!(port, access = ?access, "Added port rule");
            self.net_rules += 1;
        }
        Ok(ports.len())
    }

    pub fn fs_rules(&self) -> usize {
        self.fs_rules
    }

    pub fn net_rules(&self) -> usize {
        self.net_rules
    }

    /// Hand the populated ruleset over for enforcement
    pub fn finish(self) -> L::Ruleset {
        self.ruleset
    }
}
