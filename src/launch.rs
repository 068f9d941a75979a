//! Replace the current process with the target command

use std::convert::Infallible;
use std::ffi::{CString, OsString};
use std::io;
use std::os::unix::ffi::OsStrExt;

use crate::error::SandboxError;

/// Exec `command[0]`, searched through `PATH`, with `command` as argv and the
/// current environment. Only returns on failure.
pub fn exec(command: &[OsString]) -> Result<Infallible, SandboxError> {
    let program = command
        .first()
        .ok_or_else(|| SandboxError::Usage("no command given".to_string()))?;
    let launch_failed = |source| SandboxError::LaunchFailed {
        command: program.to_string_lossy().into_owned(),
        source,
    };

    let c_args = command
        .iter()
        .map(|arg| CString::new(arg.as_bytes()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| launch_failed(io::Error::new(io::ErrorKind::InvalidInput, e)))?;

    match nix::unistd::execvp(&c_args[0], &c_args) {
        Ok(never) => match never {},
        Err(errno) => Err(launch_failed(io::Error::from(errno))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_command_is_usage_error() {
        assert!(matches!(exec(&[]), Err(SandboxError::Usage(_))));
    }

    #[test]
    fn test_interior_nul_rejected() {
        let err = exec(&[OsString::from("ls"), OsString::from("a\0b")]).unwrap_err();
        match err {
            SandboxError::LaunchFailed { command, source } => {
                assert_eq!(command, "ls");
                assert_eq!(source.kind(), io::ErrorKind::InvalidInput);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_program_reports_enoent() {
        let err = exec(&[OsString::from("sandboxer-no-such-program-4f1c")]).unwrap_err();
        match err {
            SandboxError::LaunchFailed { source, .. } => {
                assert_eq!(source.raw_os_error(), Some(libc::ENOENT));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
