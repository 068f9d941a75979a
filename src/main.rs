use std::convert::Infallible;
use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;
use colored::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sandboxer::abi::{self, ABI_LAST};
use sandboxer::audit::AuditLogger;
use sandboxer::launch;
use sandboxer::{Kernel, ProcessEnv, RulesetAttr, Sandbox, SandboxError, SandboxInputs};

const ENV_HELP: &str = "\
Environment variables containing paths and ports each separated by a colon:
  LL_FS_RO        list of paths allowed to be used in a read-only way
  LL_FS_RW        list of paths allowed to be used in a read-write way

Environment variables containing ports are optional and could be skipped:
  LL_TCP_BIND     list of ports allowed to bind (server)
  LL_TCP_CONNECT  list of ports allowed to connect (client)

The variables are removed from the environment before CMD is executed.

Example:
  LL_FS_RO=\"/bin:/lib:/usr:/proc:/etc:/dev/urandom\" \\
  LL_FS_RW=\"/dev/null:/dev/full:/dev/zero:/dev/pts:/tmp\" \\
  LL_TCP_BIND=\"9418\" LL_TCP_CONNECT=\"80:443\" \\
  sandboxer bash -i

This sandboxer can use Landlock features up to ABI version 4.
Set SANDBOXER_LOG (e.g. \"debug\") to control diagnostics.";

/// Sandboxer - launch a command in a restricted environment
#[derive(Parser, Debug)]
#[command(name = "sandboxer")]
#[command(version)]
#[command(about = "Launch a command in a restricted environment using Landlock", long_about = None)]
#[command(after_help = ENV_HELP)]
struct Args {
    /// Append a JSON audit record of the launch to this file
    #[arg(long, value_name = "FILE")]
    audit_log: Option<PathBuf>,

    /// Print the Landlock ABI supported by the running kernel and exit
    #[arg(long)]
    print_abi: bool,

    /// Verbose output (to stderr)
    #[arg(short, long)]
    verbose: bool,

    /// Command to execute, followed by its arguments
    #[arg(
        value_name = "CMD",
        trailing_var_arg = true,
        allow_hyphen_values = true,
        required_unless_present = "print_abi"
    )]
    command: Vec<OsString>,
}

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                let _ = e.print();
                std::process::exit(1);
            }
        },
    };

    init_tracing(args.verbose);

    if args.print_abi {
        std::process::exit(print_abi());
    }

    // Opened before the sandbox exists so it stays writable afterwards
    let mut audit = args.audit_log.as_deref().and_then(|path| match AuditLogger::new(path) {
        Ok(logger) => Some(logger),
        Err(e) => {
            eprintln!("{} {}", "Warning:".yellow(), e);
            eprintln!("  Continuing without audit log...");
            None
        }
    });

    match run(&args, audit.as_mut()) {
        Ok(never) => match never {},
        Err(e) => {
            if let Some(logger) = audit.as_mut() {
                logger.log_failure(&e, &args.command);
            }
            report_error(&e);
            std::process::exit(1);
        }
    }
}

/// Restrict this process, then exec the command. Only returns on failure.
fn run(args: &Args, audit: Option<&mut AuditLogger>) -> Result<Infallible, SandboxError> {
    let inputs = SandboxInputs::take_from(&mut ProcessEnv)?;
    let report = Sandbox::new(&Kernel).apply(&inputs)?;
    info!(
        abi = ?report.abi,
        fs_rules = report.fs_rules,
        net_rules = report.net_rules,
        "Sandbox enforced"
    );

    if let Some(logger) = audit {
        logger.log_enforced(&report, &args.command);
    }

    launch::exec(&args.command)
}

fn print_abi() -> i32 {
    match abi::negotiate(&Kernel, RulesetAttr::default()) {
        Ok(negotiated) => {
            println!(
                "Landlock ABI version {} (this sandboxer can use features up to ABI version {})",
                negotiated.abi, ABI_LAST
            );
            for tier in abi::missing_tiers(negotiated.abi) {
                println!("  {} unavailable: {}", "⚠".yellow(), tier.feature);
            }
            0
        }
        Err(e) => {
            report_error(&e);
            1
        }
    }
}

fn report_error(e: &SandboxError) {
    eprintln!("{} {}", "Error:".red().bold(), e);
    if let Some(hint) = e.hint() {
        eprintln!("{} {}", "Hint:".yellow(), hint);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("SANDBOXER_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .without_time()
        .init();
}
