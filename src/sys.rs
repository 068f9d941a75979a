//! Landlock kernel primitives
//!
//! The enforcement sequence only talks to the kernel through [`Landlock`], so
//! it can be driven by a recording implementation in tests. [`Kernel`] issues
//! the real syscalls.

use std::io;
use std::os::fd::{BorrowedFd, OwnedFd};
use std::path::Path;

use crate::access::{FsAccess, NetAccess, RulesetAttr};

/// A rule to attach to a ruleset
#[derive(Debug)]
pub enum Rule<'a> {
    PathBeneath(PathBeneath<'a>),
    NetPort(NetPort),
}

/// Grants `allowed_access` beneath the file hierarchy of `parent`
#[derive(Debug)]
pub struct PathBeneath<'a> {
    pub parent: BorrowedFd<'a>,
    /// Path `parent` was opened from, kept for diagnostics only
    pub path: &'a Path,
    pub allowed_access: FsAccess,
}

/// Grants `allowed_access` on a single TCP port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetPort {
    pub port: u16,
    pub allowed_access: NetAccess,
}

/// The four Landlock enforcement primitives plus the version probe
pub trait Landlock {
    /// Ruleset handle; dropping it closes the ruleset
    type Ruleset;

    /// Highest ABI version supported by the running kernel
    fn abi_version(&self) -> io::Result<i32>;

    fn create_ruleset(&self, attr: &RulesetAttr) -> io::Result<Self::Ruleset>;

    fn add_rule(&self, ruleset: &Self::Ruleset, rule: &Rule<'_>) -> io::Result<()>;

    /// Set `PR_SET_NO_NEW_PRIVS`, required before [`Landlock::restrict_self`]
    fn set_no_new_privs(&self) -> io::Result<()>;

    /// Enforce the ruleset on the calling thread and its future children.
    /// WARNING: This is IRREVOCABLE.
    fn restrict_self(&self, ruleset: &Self::Ruleset) -> io::Result<()>;
}

/// Syscall-backed implementation
#[derive(Debug, Default, Clone, Copy)]
pub struct Kernel;

#[cfg(target_os = "linux")]
mod linux_impl {
    use super::*;
    use std::mem::size_of_val;
    use std::os::fd::{AsRawFd, FromRawFd};
    use std::ptr;

    const LANDLOCK_CREATE_RULESET_VERSION: libc::c_uint = 1 << 0;
    const LANDLOCK_RULE_PATH_BENEATH: libc::c_uint = 1;
    const LANDLOCK_RULE_NET_PORT: libc::c_uint = 2;

    #[allow(non_camel_case_types, dead_code)]
    #[repr(C)]
    struct landlock_ruleset_attr {
        handled_access_fs: u64,
        handled_access_net: u64,
    }

    #[allow(non_camel_case_types, dead_code)]
    #[repr(C, packed)]
    struct landlock_path_beneath_attr {
        allowed_access: u64,
        parent_fd: i32,
    }

    #[allow(non_camel_case_types, dead_code)]
    #[repr(C, packed)]
    struct landlock_net_port_attr {
        allowed_access: u64,
        port: u64,
    }

    fn check(ret: libc::c_long) -> io::Result<libc::c_long> {
        if ret < 0 {
            Err(io::Error::last_os_error())
        } else {
            Ok(ret)
        }
    }

    impl Landlock for Kernel {
        type Ruleset = OwnedFd;

        fn abi_version(&self) -> io::Result<i32> {
            let ret = unsafe {
                libc::syscall(
                    libc::SYS_landlock_create_ruleset,
                    ptr::null::<landlock_ruleset_attr>(),
                    0usize,
                    LANDLOCK_CREATE_RULESET_VERSION,
                )
            };
            check(ret).map(|abi| abi as i32)
        }

        fn create_ruleset(&self, attr: &RulesetAttr) -> io::Result<OwnedFd> {
            // Older kernels accept the larger struct as long as the
            // trailing network mask is zero.
            let raw = landlock_ruleset_attr {
                handled_access_fs: attr.handled_access_fs.bits(),
                handled_access_net: attr.handled_access_net.bits(),
            };
            let fd = check(unsafe {
                libc::syscall(
                    libc::SYS_landlock_create_ruleset,
                    &raw as *const landlock_ruleset_attr,
                    size_of_val(&raw),
                    0 as libc::c_uint,
                )
            })?;
            Ok(unsafe { OwnedFd::from_raw_fd(fd as libc::c_int) })
        }

        fn add_rule(&self, ruleset: &OwnedFd, rule: &Rule<'_>) -> io::Result<()> {
            let ret = match rule {
                Rule::PathBeneath(rule) => {
                    let raw = landlock_path_beneath_attr {
                        allowed_access: rule.allowed_access.bits(),
                        parent_fd: rule.parent.as_raw_fd(),
                    };
                    unsafe {
                        libc::syscall(
                            libc::SYS_landlock_add_rule,
                            ruleset.as_raw_fd(),
                            LANDLOCK_RULE_PATH_BENEATH,
                            &raw as *const landlock_path_beneath_attr,
                            0 as libc::c_uint,
                        )
                    }
                }
                Rule::NetPort(rule) => {
                    let raw = landlock_net_port_attr {
                        allowed_access: rule.allowed_access.bits(),
                        port: u64::from(rule.port),
                    };
                    unsafe {
                        libc::syscall(
                            libc::SYS_landlock_add_rule,
                            ruleset.as_raw_fd(),
                            LANDLOCK_RULE_NET_PORT,
                            &raw as *const landlock_net_port_attr,
                            0 as libc::c_uint,
                        )
                    }
                }
            };
            check(ret).map(drop)
        }

        fn set_no_new_privs(&self) -> io::Result<()> {
            match unsafe { libc::prctl(libc::PR_SET_NO_NEW_PRIVS, 1, 0, 0, 0) } {
                0 => Ok(()),
                _ => Err(io::Error::last_os_error()),
            }
        }

        fn restrict_self(&self, ruleset: &OwnedFd) -> io::Result<()> {
            let ret = unsafe {
                libc::syscall(
                    libc::SYS_landlock_restrict_self,
                    ruleset.as_raw_fd(),
                    0 as libc::c_uint,
                )
            };
            check(ret).map(drop)
        }
    }
}

// Non-Linux stub: Landlock does not exist there
#[cfg(not(target_os = "linux"))]
impl Landlock for Kernel {
    type Ruleset = OwnedFd;

    fn abi_version(&self) -> io::Result<i32> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    fn create_ruleset(&self, _attr: &RulesetAttr) -> io::Result<OwnedFd> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    fn add_rule(&self, _ruleset: &OwnedFd, _rule: &Rule<'_>) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    fn set_no_new_privs(&self) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }

    fn restrict_self(&self, _ruleset: &OwnedFd) -> io::Result<()> {
        Err(io::Error::from_raw_os_error(libc::ENOSYS))
    }
}
