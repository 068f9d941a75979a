//! Final, irrevocable restriction of the current process

use tracing::{debug, info};

use crate::error::SandboxError;
use crate::sys::Landlock;

/// Lock out privilege escalation, then enforce `ruleset` on this process.
///
/// The ruleset is consumed: it is closed when this returns, whether the
/// restriction was committed or not, and no rule can be added afterwards.
pub fn enforce<L: Landlock>(sys: &L, ruleset: L::Ruleset) -> Result<(), SandboxError> {
    // PR_SET_NO_NEW_PRIVS is required before landlock_restrict_self
    sys.set_no_new_privs()
        .map_err(|source| SandboxError::PrivilegeLockoutFailed { source })?;
    debug!("no_new_privs set");

    sys.restrict_self(&ruleset)
        .map_err(|source| SandboxError::EnforcementFailed { source })?;
    drop(ruleset);

    info!("Landlock ruleset enforced");
    Ok(())
}
