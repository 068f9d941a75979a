//! Sandbox orchestrator - coordinates ABI negotiation, ruleset construction
//! and enforcement for the current process.
//!
//! Security flow:
//! 1. Probe the Landlock ABI and drop the rights the kernel does not know
//! 2. Drop the network rights whose port list was not requested
//! 3. Create the ruleset
//! 4. Add read-only, then read-write path rules
//! 5. Add bind, then connect port rules, each with its full category right
//! 6. Set NO_NEW_PRIVS and restrict the process (IRREVOCABLE)
//!
//! Any failure after step 3 closes the ruleset and returns before anything
//! is enforced.

use tracing::warn;

use crate::abi::{negotiate, AbiLevel};
use crate::access::{AccessNet, BitFlags, FsAccess, RulesetAttr, ROUGHLY_READ, ROUGHLY_WRITE};
use crate::enforce::enforce;
use crate::error::SandboxError;
use crate::rules::{SandboxInputs, ENV_TCP_BIND_NAME, ENV_TCP_CONNECT_NAME};
use crate::ruleset::RulesetBuilder;
use crate::sys::Landlock;

/// Final attributes and per-category masks, fixed before the ruleset exists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxPlan {
    pub attr: RulesetAttr,
    pub read_only_access: FsAccess,
    pub read_write_access: FsAccess,
}

impl SandboxPlan {
    /// Narrow the negotiated attributes to the categories actually requested
    pub fn new(negotiated: RulesetAttr, inputs: &SandboxInputs) -> Self {
        let mut attr = negotiated;
        if inputs.bind_ports.is_none() {
            attr = attr.without_net(AccessNet::BindTcp);
        }
        if inputs.connect_ports.is_none() {
            attr = attr.without_net(AccessNet::ConnectTcp);
        }

        let handled_fs = attr.handled_access_fs;
        Self {
            attr,
            read_only_access: ROUGHLY_READ & handled_fs,
            read_write_access: (ROUGHLY_READ | ROUGHLY_WRITE) & handled_fs,
        }
    }
}

/// What was enforced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxReport {
    /// `None` when the version probe failed
    pub abi: Option<AbiLevel>,
    pub attr: RulesetAttr,
    pub fs_rules: usize,
    pub net_rules: usize,
}

/// Applies a Landlock sandbox to the current process
pub struct Sandbox<'l, L: Landlock> {
    sys: &'l L,
}

impl<'l, L: Landlock> Sandbox<'l, L> {
    pub fn new(sys: &'l L) -> Self {
        Self { sys }
    }

    /// Negotiate the ABI. Recoverable probe failures are reported and the
    /// requested attributes are kept as-is (best-effort).
    pub fn negotiate(&self) -> Result<(Option<AbiLevel>, RulesetAttr), SandboxError> {
        let requested = RulesetAttr::default();
        match negotiate(self.sys, requested) {
            Ok(negotiated) => Ok((Some(negotiated.abi), negotiated.attr)),
            Err(e) if e.is_recoverable() => {
                warn!("{}", e);
                if let Some(hint) = e.hint() {
                    warn!("Hint: {}", hint);
                }
                Ok((None, requested))
            }
            Err(e) => Err(e),
        }
    }

    /// Build and enforce the ruleset described by `inputs`
    pub fn apply(&self, inputs: &SandboxInputs) -> Result<SandboxReport, SandboxError> {
        let (abi, negotiated) = self.negotiate()?;
        let plan = SandboxPlan::new(negotiated, inputs);

        let mut builder = RulesetBuilder::create(self.sys, &plan.attr)?;

        builder.add_paths(&inputs.read_only, plan.read_only_access)?;
        builder.add_paths(&inputs.read_write, plan.read_write_access)?;

        let port_lists = [
            (ENV_TCP_BIND_NAME, &inputs.bind_ports, AccessNet::BindTcp),
            (ENV_TCP_CONNECT_NAME, &inputs.connect_ports, AccessNet::ConnectTcp),
        ];
        for (name, ports, access) in port_lists {
            let Some(ports) = ports else { continue };
            // Kept even when unhandled, so the kernel rejects the first port
            if !ports.is_empty() && !plan.attr.handled_access_net.contains(access) {
                warn!("{} needs Landlock ABI version 4 or later", name);
            }
            builder.add_ports(ports, BitFlags::from(access))?;
        }

        let report = SandboxReport {
            abi,
            attr: plan.attr,
            fs_rules: builder.fs_rules(),
            net_rules: builder.net_rules(),
        };

        enforce(self.sys, builder.finish())?;
        Ok(report)
    }
}
