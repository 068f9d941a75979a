//! Sandbox error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or enforcing the sandbox
#[derive(Debug, Error)]
pub enum SandboxError {
    /// Bad or missing command line
    #[error("invalid usage: {0}")]
    Usage(String),

    /// Landlock is not compiled into the running kernel
    #[error("failed to check Landlock compatibility: {source}")]
    UnsupportedPlatform {
        #[source]
        source: io::Error,
    },

    /// Landlock is compiled in but disabled at boot
    #[error("failed to check Landlock compatibility: {source}")]
    MechanismDisabled {
        #[source]
        source: io::Error,
    },

    /// Mandatory environment variable is not set
    #[error("missing environment variable {name}")]
    MissingInput { name: String },

    /// An entry of an input list could not be parsed
    #[error("malformed entry {entry:?} in {name}: {reason}")]
    MalformedInput {
        name: String,
        entry: String,
        reason: String,
    },

    /// A path could not be opened or queried
    #[error("failed to open \"{}\": {source}", path.display())]
    PathUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The kernel refused a rule
    #[error("failed to update the ruleset with {target}: {source}")]
    RuleRejected {
        target: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to create a ruleset: {source}")]
    RulesetCreateFailed {
        #[source]
        source: io::Error,
    },

    #[error("failed to restrict privileges: {source}")]
    PrivilegeLockoutFailed {
        #[source]
        source: io::Error,
    },

    #[error("failed to enforce ruleset: {source}")]
    EnforcementFailed {
        #[source]
        source: io::Error,
    },

    /// The target command could not replace the current process
    #[error("failed to execute \"{command}\": {source}")]
    LaunchFailed {
        command: String,
        #[source]
        source: io::Error,
    },
}

impl SandboxError {
    /// Build the negotiation error matching a failed version probe
    pub fn from_probe(source: io::Error) -> Self {
        match source.raw_os_error() {
            Some(libc::EOPNOTSUPP) => SandboxError::MechanismDisabled { source },
            _ => SandboxError::UnsupportedPlatform { source },
        }
    }

    /// Only the ABI probe failures let the sequence continue
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SandboxError::UnsupportedPlatform { .. } | SandboxError::MechanismDisabled { .. }
        )
    }

    /// Actionable remediation text for the user, if any
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            SandboxError::UnsupportedPlatform { .. } => Some(
                "Landlock is not supported by the current kernel. \
                 To support it, build the kernel with CONFIG_SECURITY_LANDLOCK=y \
                 and prepend \"landlock,\" to the content of CONFIG_LSM.",
            ),
            SandboxError::MechanismDisabled { .. } => Some(
                "Landlock is currently disabled. \
                 It can be enabled in the kernel configuration by prepending \
                 \"landlock,\" to the content of CONFIG_LSM, or at boot time by \
                 setting the same content to the \"lsm\" kernel parameter.",
            ),
            SandboxError::MissingInput { .. } | SandboxError::Usage(_) => {
                Some("Run with --help for the list of environment variables.")
            }
            SandboxError::LaunchFailed { .. } => Some(
                "access to the binary, the interpreter or shared libraries may be denied.",
            ),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_errno_mapping() {
        let disabled = SandboxError::from_probe(io::Error::from_raw_os_error(libc::EOPNOTSUPP));
        assert!(matches!(disabled, SandboxError::MechanismDisabled { .. }));

        let missing = SandboxError::from_probe(io::Error::from_raw_os_error(libc::ENOSYS));
        assert!(matches!(missing, SandboxError::UnsupportedPlatform { .. }));
    }

    #[test]
    fn test_only_probe_errors_are_recoverable() {
        let probe = SandboxError::from_probe(io::Error::from_raw_os_error(libc::ENOSYS));
        assert!(probe.is_recoverable());

        let create = SandboxError::RulesetCreateFailed {
            source: io::Error::from_raw_os_error(libc::ENOSYS),
        };
        assert!(!create.is_recoverable());
    }

    #[test]
    fn test_hints() {
        let e = SandboxError::from_probe(io::Error::from_raw_os_error(libc::ENOSYS));
        assert!(e.hint().unwrap().contains("CONFIG_SECURITY_LANDLOCK=y"));

        let e = SandboxError::from_probe(io::Error::from_raw_os_error(libc::EOPNOTSUPP));
        assert!(e.hint().unwrap().contains("\"lsm\" kernel parameter"));

        let e = SandboxError::EnforcementFailed {
            source: io::Error::from_raw_os_error(libc::EPERM),
        };
        assert!(e.hint().is_none());
    }

    #[test]
    fn test_path_unavailable_names_path() {
        let e = SandboxError::PathUnavailable {
            path: PathBuf::from("/does/not/exist"),
            source: io::Error::from_raw_os_error(libc::ENOENT),
        };
        let msg = e.to_string();
        assert!(msg.contains("\"/does/not/exist\""));
        assert!(msg.contains("No such file or directory"));
    }
}
