//! # sandboxer
//!
//! Launch a command in a least-privilege Landlock sandbox.
//!
//! Read-only and read-write path lists and optional TCP bind/connect port
//! lists come from the environment. The ruleset is negotiated down to the
//! running kernel's Landlock ABI, enforced irrevocably on the current process,
//! and the command then replaces the process image.

pub mod abi;
pub mod access;
pub mod audit;
pub mod enforce;
pub mod error;
pub mod launch;
pub mod rules;
pub mod ruleset;
pub mod sandbox;
pub mod sys;

pub use access::{AccessFs, AccessNet, BitFlags, FsAccess, NetAccess, RulesetAttr};
pub use error::SandboxError;
pub use rules::{Environment, ProcessEnv, SandboxInputs};
pub use sandbox::{Sandbox, SandboxReport};
pub use sys::{Kernel, Landlock};
