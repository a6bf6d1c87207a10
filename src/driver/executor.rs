//! Bounded-parallel execution of synthesized commands.
//!
//! OS processes are the unit of parallelism; a local rayon pool bounds how
//! many run at once. After the first failure no new process is spawned, but
//! everything already running is drained before the build is failed.

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use rayon::prelude::*;

use crate::core::config::{Config, GlobalFlags};
use crate::util::diagnostic::DriverError;
use crate::util::process::{find_executable, program_name, ShellCommand};

/// Host callbacks around individual commands.
#[derive(Default)]
pub struct ExecHooks<'a> {
    /// Progress display for command `i`, used at verbosity level 1.
    pub describe: Option<&'a (dyn Fn(usize) + Sync)>,
    /// Invoked after command `i` exits, with its exit code and captured
    /// stdout+stderr.
    pub after_run: Option<&'a (dyn Fn(usize, i32, &str) + Sync)>,
}

struct Failure {
    index: usize,
    command: String,
    output: String,
}

fn announce(cfg: &Config, hooks: &ExecHooks, index: usize, cmd: &str) {
    if cfg.verbosity >= 2 || cfg.globals.contains(GlobalFlags::LIST_CMD) {
        tracing::info!("{cmd}");
    } else if cfg.verbosity == 1 {
        if let Some(describe) = hooks.describe {
            describe(index);
        }
    }
}

fn run_one(hooks: &ExecHooks, index: usize, cmd: &str) -> Option<Failure> {
    match ShellCommand::new(cmd).exec() {
        Ok(output) => {
            let code = output.status.code().unwrap_or(-1);
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            if let Some(after_run) = hooks.after_run {
                after_run(index, code, &text);
            }
            if output.status.success() {
                None
            } else {
                Some(Failure {
                    index,
                    command: cmd.to_string(),
                    output: text,
                })
            }
        }
        Err(err) => {
            let program = program_name(cmd).to_string();
            let mut output = format!("{err:#}");
            if find_executable(&program).is_none() {
                output.push_str(&format!("\n`{program}` was not found in PATH"));
            }
            if let Some(after_run) = hooks.after_run {
                after_run(index, -1, &output);
            }
            Some(Failure {
                index,
                command: cmd.to_string(),
                output,
            })
        }
    }
}

fn report(failure: &Failure) {
    tracing::error!(
        "command {} failed:\n{}\n{}",
        failure.index,
        failure.command,
        failure.output
    );
}

/// Run `cmds` with up to `num_processors` concurrent child processes
/// (auto-detected when zero). Single-processor mode is sequential with an
/// immediate stop on the first failure; parallel mode drains started
/// processes first. Fails if any command failed.
pub fn execute_commands(cfg: &Config, cmds: &[String], hooks: &ExecHooks) -> Result<()> {
    if cmds.is_empty() {
        return Ok(());
    }

    let jobs = if cfg.num_processors == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        cfg.num_processors
    };

    if jobs <= 1 || cmds.len() == 1 {
        for (index, cmd) in cmds.iter().enumerate() {
            announce(cfg, hooks, index, cmd);
            if let Some(failure) = run_one(hooks, index, cmd) {
                report(&failure);
                return Err(DriverError::ProcessFailed {
                    command: failure.command,
                    output: failure.output,
                }
                .into());
            }
        }
        return Ok(());
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let gave_up = AtomicBool::new(false);

    let mut failures: Vec<Failure> = pool.install(|| {
        cmds.par_iter()
            .enumerate()
            .filter_map(|(index, cmd)| {
                if gave_up.load(Ordering::Relaxed) {
                    return None;
                }
                announce(cfg, hooks, index, cmd);
                let failure = run_one(hooks, index, cmd);
                if failure.is_some() {
                    gave_up.store(true, Ordering::Relaxed);
                }
                failure
            })
            .collect()
    });

    if failures.is_empty() {
        return Ok(());
    }

    failures.sort_by_key(|f| f.index);
    for failure in &failures {
        report(failure);
    }
    let first = failures.remove(0);
    Err(DriverError::ProcessFailed {
        command: first.command,
        output: first.output,
    }
    .into())
}
