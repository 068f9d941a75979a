//! Landlock ABI negotiation
//!
//! Each ABI version adds access rights. When the running kernel is older than
//! [`ABI_LAST`], the rights it does not know about are removed from the
//! requested ruleset attributes so that the ruleset can still be created
//! (best-effort security).

use std::fmt;

use tracing::{debug, warn};

use crate::access::{
    make_bitflags, AccessFs, AccessNet, BitFlags, FsAccess, NetAccess, RulesetAttr,
};
use crate::error::SandboxError;
use crate::sys::Landlock;

/// Landlock ABI version reported by the kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AbiLevel(u32);

/// Newest ABI version this sandboxer knows how to use
pub const ABI_LAST: AbiLevel = AbiLevel(4);

impl AbiLevel {
    /// `None` for versions the kernel can never report
    pub fn new(version: i32) -> Option<Self> {
        u32::try_from(version).ok().filter(|v| *v >= 1).map(AbiLevel)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for AbiLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rights that do not exist on kernels older than `since`
#[derive(Debug, Clone, Copy)]
pub struct Degradation {
    pub since: AbiLevel,
    pub fs: FsAccess,
    pub net: NetAccess,
    pub feature: &'static str,
}

/// Ordered by ascending `since`. Applied cumulatively: a kernel older than an
/// entry is also older than every later entry.
pub const DEGRADATIONS: &[Degradation] = &[
    Degradation {
        since: AbiLevel(2),
        fs: make_bitflags!(AccessFs::{Refer}),
        net: BitFlags::EMPTY,
        feature: "file reparenting (refer)",
    },
    Degradation {
        since: AbiLevel(3),
        fs: make_bitflags!(AccessFs::{Truncate}),
        net: BitFlags::EMPTY,
        feature: "file truncation",
    },
    Degradation {
        since: AbiLevel(4),
        fs: BitFlags::EMPTY,
        net: make_bitflags!(AccessNet::{BindTcp | ConnectTcp}),
        feature: "TCP bind and connect",
    },
];

/// Tiers missing from a kernel running `abi`
pub fn missing_tiers(abi: AbiLevel) -> impl Iterator<Item = &'static Degradation> {
    DEGRADATIONS.iter().filter(move |d| abi < d.since)
}

/// Every right unavailable at `abi`
pub fn stripped_for(abi: AbiLevel) -> (FsAccess, NetAccess) {
    missing_tiers(abi).fold((BitFlags::empty(), BitFlags::empty()), |(fs, net), d| {
        (fs | d.fs, net | d.net)
    })
}

/// Narrow `requested` to what `abi` supports. Never widens.
pub fn downgrade(abi: AbiLevel, requested: RulesetAttr) -> RulesetAttr {
    let (fs, net) = stripped_for(abi);
    requested.without_fs(fs).without_net(net)
}

/// Result of a successful negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    pub abi: AbiLevel,
    pub attr: RulesetAttr,
}

/// Probe the running kernel and narrow `requested` to what it supports
pub fn negotiate<L: Landlock>(
    sys: &L,
    requested: RulesetAttr,
) -> Result<Negotiated, SandboxError> {
    let version = sys.abi_version().map_err(SandboxError::from_probe)?;
    let abi = AbiLevel::new(version).ok_or_else(|| SandboxError::UnsupportedPlatform {
        source: std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            format!("kernel reported Landlock ABI version {}", version),
        ),
    })?;
    debug!(abi = abi.get(), "Landlock ABI detected");

    if abi > ABI_LAST {
        warn!(
            "Hint: You should check for updates of sandboxer to possibly leverage \
             Landlock features provided by ABI version {} (instead of {}).",
            abi, ABI_LAST
        );
    }
    for tier in missing_tiers(abi) {
        warn!(
            "Hint: You should update the running kernel to leverage Landlock features \
             provided by ABI version {} (instead of {}): {} is unavailable.",
            ABI_LAST, abi, tier.feature
        );
    }

    Ok(Negotiated {
        abi,
        attr: downgrade(abi, requested),
    })
}
