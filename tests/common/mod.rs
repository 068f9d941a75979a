//! Call-recording Landlock implementation for driving the sandbox without
//! touching the kernel.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

use sandboxer::sys::{Landlock, Rule};
use sandboxer::access::{FsAccess, NetAccess};
use sandboxer::RulesetAttr;

/// One primitive invocation, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Probe,
    Create(RulesetAttr),
    PathRule { path: PathBuf, access: FsAccess },
    PortRule { port: u16, access: NetAccess },
    NoNewPrivs,
    RestrictSelf,
    Close,
}

/// Fails the selected primitive with the given errno
#[derive(Debug, Clone, Default)]
pub struct Failures {
    pub probe: Option<i32>,
    pub create: Option<i32>,
    pub path: Option<(PathBuf, i32)>,
    pub port: Option<(u16, i32)>,
    pub no_new_privs: Option<i32>,
    pub restrict: Option<i32>,
}

pub struct FakeLandlock {
    abi: i32,
    failures: Failures,
    calls: Rc<RefCell<Vec<Call>>>,
}

/// Records its own close
pub struct FakeRuleset {
    attr: RulesetAttr,
    calls: Rc<RefCell<Vec<Call>>>,
}

impl Drop for FakeRuleset {
    fn drop(&mut self) {
        self.calls.borrow_mut().push(Call::Close);
    }
}

impl FakeLandlock {
    pub fn new(abi: i32) -> Self {
        Self::failing(abi, Failures::default())
    }

    pub fn failing(abi: i32, failures: Failures) -> Self {
        Self {
            abi,
            failures,
            calls: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn created_attr(&self) -> Option<RulesetAttr> {
        self.calls().into_iter().find_map(|call| match call {
            Call::Create(attr) => Some(attr),
            _ => None,
        })
    }

    pub fn path_rules(&self) -> Vec<(PathBuf, FsAccess)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PathRule { path, access } => Some((path, access)),
                _ => None,
            })
            .collect()
    }

    pub fn port_rules(&self) -> Vec<(u16, NetAccess)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PortRule { port, access } => Some((port, access)),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

fn errno(code: Option<i32>) -> io::Result<()> {
    match code {
        Some(code) => Err(io::Error::from_raw_os_error(code)),
        None => Ok(()),
    }
}

impl Landlock for FakeLandlock {
    type Ruleset = FakeRuleset;

    fn abi_version(&self) -> io::Result<i32> {
        self.record(Call::Probe);
        errno(self.failures.probe)?;
        Ok(self.abi)
    }

    fn create_ruleset(&self, attr: &RulesetAttr) -> io::Result<FakeRuleset> {
        self.record(Call::Create(*attr));
        errno(self.failures.create)?;
        Ok(FakeRuleset {
            attr: *attr,
            calls: Rc::clone(&self.calls),
        })
    }

    /// Like the kernel, refuses rights the ruleset does not handle
    fn add_rule(&self, ruleset: &FakeRuleset, rule: &Rule<'_>) -> io::Result<()> {
        let (handled, injected) = match rule {
            Rule::PathBeneath(rule) => {
                self.record(Call::PathRule {
                    path: rule.path.to_path_buf(),
                    access: rule.allowed_access,
                });
                let injected = match &self.failures.path {
                    Some((path, code)) if path == rule.path => Some(*code),
                    _ => None,
                };
                (
                    ruleset.attr.handled_access_fs.contains(rule.allowed_access),
                    injected,
                )
            }
            Rule::NetPort(rule) => {
                self.record(Call::PortRule {
                    port: rule.port,
                    access: rule.allowed_access,
                });
                let injected = match self.failures.port {
                    Some((port, code)) if port == rule.port => Some(code),
                    _ => None,
                };
                (
                    ruleset.attr.handled_access_net.contains(rule.allowed_access),
                    injected,
                )
            }
        };
        if !handled {
            return Err(io::Error::from_raw_os_error(libc::EINVAL));
        }
        errno(injected)
    }

    fn set_no_new_privs(&self) -> io::Result<()> {
        self.record(Call::NoNewPrivs);
        errno(self.failures.no_new_privs)
    }

    fn restrict_self(&self, _ruleset: &FakeRuleset) -> io::Result<()> {
        self.record(Call::RestrictSelf);
        errno(self.failures.restrict)
    }
}

/// In-memory environment with the given variables
pub fn env(vars: &[(&str, &str)]) -> HashMap<String, OsString> {
    vars.iter()
        .map(|(k, v)| (k.to_string(), OsString::from(v)))
        .collect()
}
