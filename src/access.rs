//! Landlock access rights and the ruleset attribute set
//!
//! Individual rights are the `landlock` crate's flag enums. Masks are
//! `BitFlags` over them, whose bits match `include/uapi/linux/landlock.h`.

pub use landlock::{make_bitflags, AccessFs, AccessNet, BitFlags};

/// Set of filesystem rights
pub type FsAccess = BitFlags<AccessFs>;
/// Set of network rights
pub type NetAccess = BitFlags<AccessNet>;

pub const ROUGHLY_READ: FsAccess = make_bitflags!(AccessFs::{Execute | ReadFile | ReadDir});

pub const ROUGHLY_WRITE: FsAccess = make_bitflags!(AccessFs::{
    WriteFile
        | RemoveDir
        | RemoveFile
        | MakeChar
        | MakeDir
        | MakeReg
        | MakeSock
        | MakeFifo
        | MakeBlock
        | MakeSym
        | Refer
        | Truncate
});

/// Rights the kernel accepts on a rule whose parent is not a directory
pub const FILE_ONLY: FsAccess =
    make_bitflags!(AccessFs::{Execute | WriteFile | ReadFile | Truncate});

/// Every filesystem right up to ABI 4. Newer rights (e.g. ioctl on
/// devices) are left unhandled.
pub const HANDLED_FS: FsAccess = make_bitflags!(AccessFs::{
    Execute
        | WriteFile
        | ReadFile
        | ReadDir
        | RemoveDir
        | RemoveFile
        | MakeChar
        | MakeDir
        | MakeReg
        | MakeSock
        | MakeFifo
        | MakeBlock
        | MakeSym
        | Refer
        | Truncate
});

pub const HANDLED_NET: NetAccess = make_bitflags!(AccessNet::{BindTcp | ConnectTcp});

/// Access the ruleset declares as handled; anything handled but not granted
/// by a rule is denied once enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RulesetAttr {
    pub handled_access_fs: FsAccess,
    pub handled_access_net: NetAccess,
}

impl Default for RulesetAttr {
    fn default() -> Self {
        Self {
            handled_access_fs: HANDLED_FS,
            handled_access_net: HANDLED_NET,
        }
    }
}

impl RulesetAttr {
    pub fn without_fs(self, access: impl Into<FsAccess>) -> Self {
        let access: FsAccess = access.into();
        Self {
            handled_access_fs: self.handled_access_fs & !access,
            ..self
        }
    }

    pub fn without_net(self, access: impl Into<NetAccess>) -> Self {
        let access: NetAccess = access.into();
        Self {
            handled_access_net: self.handled_access_net & !access,
            ..self
        }
    }
}
