//! Build-plan persistence and replay.
//!
//! The plan is a JSON snapshot of a fully resolved build: every compile
//! command, the object list, and the link command. A later invocation can
//! detect staleness against it or replay it without running the front end.

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::config::{Config, GlobalFlags};
use crate::driver::executor::{execute_commands, ExecHooks};
use crate::driver::linker::call_linker;
use crate::util::diagnostic::DriverError;
use crate::util::hash::sha1_file;

/// The on-disk plan document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPlan {
    /// `[source_path, compile_command]` per non-cached unit, in
    /// `to_compile` order.
    pub compile: Vec<(String, String)>,
    /// Every object file participating in the link.
    pub link: Vec<String>,
    /// The assembled link command; empty when linking is disabled.
    pub linkcmd: String,
    /// The user's invocation; present when the build is re-run driven.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmdline: Option<String>,
    /// `[path, sha1]` of every dependency file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depfiles: Option<Vec<(String, String)>>,
    /// SHA-1 of the compiler binary that wrote the plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compilerexe: Option<String>,
}

/// Where the plan for this project lives.
pub fn plan_path(cfg: &Config) -> PathBuf {
    cfg.cache_dir.join(format!("{}.json", cfg.project_name))
}

fn current_compiler_hash() -> Option<String> {
    let exe = std::env::current_exe().ok()?;
    sha1_file(&exe).ok()
}

/// Serialize the current build into the plan file.
pub fn write_plan(cfg: &Config, compile: Vec<(String, String)>, link_line: &str) -> Result<()> {
    let link = crate::driver::linker::link_object_list(cfg)
        .iter()
        .map(|p| p.display().to_string())
        .collect();

    let mut plan = BuildPlan {
        compile,
        link,
        linkcmd: link_line.to_string(),
        cmdline: None,
        depfiles: None,
        compilerexe: None,
    };

    if cfg.globals.contains(GlobalFlags::RUN) {
        plan.cmdline = Some(cfg.cmdline.clone());
        let mut depfiles = Vec::new();
        for dep in &cfg.dep_files {
            if dep.is_absolute() {
                depfiles.push((dep.display().to_string(), sha1_file(dep)?));
            }
        }
        plan.depfiles = Some(depfiles);
        plan.compilerexe = current_compiler_hash();
    }

    let path = plan_path(cfg);
    let text = serde_json::to_string_pretty(&plan)?;
    if let Some(parent) = path.parent() {
        crate::util::fs::ensure_dir(parent)?;
    }
    std::fs::write(&path, text).map_err(|source| DriverError::WriteFailed {
        kind: "build plan",
        path: path.clone(),
        source,
    })?;
    Ok(())
}

/// Whether the stored plan no longer describes the current build: missing
/// plan or output, a different command line or compiler binary, or any
/// changed dependency file. Unreadable or malformed plans are stale.
pub fn changed_via_plan(cfg: &Config) -> bool {
    let path = plan_path(cfg);
    if !path.exists() {
        return true;
    }
    if !cfg.absolute_out_file().exists() {
        return true;
    }

    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!("cannot read build plan {}: {err}", path.display());
            return true;
        }
    };
    let plan: BuildPlan = match serde_json::from_str(&text) {
        Ok(plan) => plan,
        Err(err) => {
            tracing::warn!("cannot parse build plan {}: {err}", path.display());
            return true;
        }
    };

    let (Some(cmdline), Some(depfiles), Some(compilerexe)) =
        (plan.cmdline, plan.depfiles, plan.compilerexe)
    else {
        return true;
    };

    if cmdline != cfg.cmdline {
        return true;
    }
    if current_compiler_hash().as_deref() != Some(compilerexe.as_str()) {
        return true;
    }
    for (dep, stored_hash) in &depfiles {
        match sha1_file(std::path::Path::new(dep)) {
            Ok(hash) if hash == *stored_hash => {}
            _ => return true,
        }
    }
    false
}

/// Re-run a stored plan: every compile command through the executor, then
/// the link command. Structural problems are fatal.
pub fn run_plan(cfg: &Config, hooks: &ExecHooks) -> Result<()> {
    let path = plan_path(cfg);
    let text = std::fs::read_to_string(&path).map_err(|err| DriverError::PlanMalformed {
        path: path.clone(),
        detail: err.to_string(),
    })?;
    let plan: BuildPlan =
        serde_json::from_str(&text).map_err(|err| DriverError::PlanMalformed {
            path: path.clone(),
            detail: err.to_string(),
        })?;

    let cmds: Vec<String> = plan.compile.iter().map(|(_, cmd)| cmd.clone()).collect();
    execute_commands(cfg, &cmds, hooks)?;

    if !plan.linkcmd.is_empty() {
        execute_commands(cfg, std::slice::from_ref(&plan.linkcmd), hooks)?;
    }
    Ok(())
}

/// Synthesize the plan for the current configuration and write it out.
/// Compile entries cover only non-cached units; the link command is the one
/// the linker driver would run.
pub fn write_plan_for_build(cfg: &Config) -> Result<()> {
    let compile = crate::driver::compile_command_pairs(cfg)?;
    let link_line = if cfg.globals.contains(GlobalFlags::NO_LINKING) {
        String::new()
    } else {
        call_linker(cfg, false, &ExecHooks::default())?
    };
    write_plan(cfg, compile, &link_line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    use crate::core::cfile::CFile;
    use crate::core::platform::TargetOs;
    use crate::driver::descriptor::CcKind;

    fn cfg_in(tmp: &TempDir) -> Config {
        let mut cfg = Config::new("proj");
        cfg.cc = CcKind::Gcc;
        cfg.target_os = TargetOs::Linux;
        cfg.host_os = TargetOs::Linux;
        cfg.lib_path = PathBuf::from("/opt/caravel/lib");
        cfg.project_path = tmp.path().to_path_buf();
        cfg.cache_dir = tmp.path().join("cache");
        cfg.verbosity = 0;
        cfg.num_processors = 1;
        std::fs::create_dir_all(&cfg.cache_dir).unwrap();
        cfg
    }

    #[test]
    fn test_plan_round_trip() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.add_file_to_compile(CFile::new("m", "/t/m.crv.c"));

        write_plan_for_build(&cfg).unwrap();

        let text = std::fs::read_to_string(plan_path(&cfg)).unwrap();
        let plan: BuildPlan = serde_json::from_str(&text).unwrap();
        assert_eq!(plan.compile.len(), 1);
        assert_eq!(plan.compile[0].0, "/t/m.crv.c");
        assert!(plan.compile[0].1.starts_with("gcc "));
        assert_eq!(plan.link, vec!["/t/m.crv.c.o"]);
        assert!(plan.linkcmd.starts_with("gcc "));
        assert!(plan.cmdline.is_none());
    }

    #[test]
    fn test_plan_compile_order_matches_to_compile() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.add_file_to_compile(CFile::new("a", "/t/a.crv.c"));
        cfg.add_file_to_compile(CFile::new("b", "/t/b.crv.c"));
        cfg.add_file_to_compile(CFile::new("c", "/t/c.crv.c"));

        write_plan_for_build(&cfg).unwrap();
        let plan: BuildPlan =
            serde_json::from_str(&std::fs::read_to_string(plan_path(&cfg)).unwrap()).unwrap();
        let sources: Vec<&str> = plan.compile.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(sources, vec!["/t/a.crv.c", "/t/b.crv.c", "/t/c.crv.c"]);
    }

    #[test]
    fn test_stale_when_plan_missing() {
        let tmp = TempDir::new().unwrap();
        let cfg = cfg_in(&tmp);
        assert!(changed_via_plan(&cfg));
    }

    #[test]
    fn test_stale_on_garbage_plan() {
        let tmp = TempDir::new().unwrap();
        let cfg = cfg_in(&tmp);
        std::fs::write(tmp.path().join("proj"), b"bin").unwrap();
        std::fs::write(plan_path(&cfg), b"{ not json").unwrap();
        assert!(changed_via_plan(&cfg));
    }

    #[test]
    fn test_stale_when_run_fields_missing() {
        let tmp = TempDir::new().unwrap();
        let cfg = cfg_in(&tmp);
        std::fs::write(tmp.path().join("proj"), b"bin").unwrap();
        write_plan(&cfg, Vec::new(), "true").unwrap();
        assert!(changed_via_plan(&cfg));
    }

    #[test]
    fn test_fresh_plan_is_not_stale() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.globals |= GlobalFlags::RUN;
        cfg.cmdline = "caravel c -r proj".to_string();
        let dep = tmp.path().join("m.crv");
        std::fs::write(&dep, "echo 1").unwrap();
        cfg.dep_files.push(dep.clone());
        std::fs::write(tmp.path().join("proj"), b"bin").unwrap();

        write_plan(&cfg, Vec::new(), "").unwrap();
        assert!(!changed_via_plan(&cfg));

        // A changed dependency hash makes it stale again.
        std::fs::write(&dep, "echo 2").unwrap();
        assert!(changed_via_plan(&cfg));

        // So does a different command line.
        std::fs::write(&dep, "echo 1").unwrap();
        assert!(!changed_via_plan(&cfg));
        let mut other = cfg.clone();
        other.cmdline = "caravel c proj".to_string();
        assert!(changed_via_plan(&other));
    }

    #[test]
    fn test_run_plan_executes_compile_and_link() {
        let tmp = TempDir::new().unwrap();
        let cfg = cfg_in(&tmp);
        let marker = tmp.path().join("ran");
        let plan = BuildPlan {
            compile: vec![
                ("/t/a.c".to_string(), "true".to_string()),
                ("/t/b.c".to_string(), "true".to_string()),
            ],
            link: vec!["a.o".to_string(), "b.o".to_string()],
            linkcmd: format!("touch {}", marker.display()),
            cmdline: None,
            depfiles: None,
            compilerexe: None,
        };
        std::fs::write(plan_path(&cfg), serde_json::to_string(&plan).unwrap()).unwrap();

        run_plan(&cfg, &ExecHooks::default()).unwrap();
        assert!(marker.exists());
    }

    #[test]
    fn test_run_plan_rejects_malformed() {
        let tmp = TempDir::new().unwrap();
        let cfg = cfg_in(&tmp);
        std::fs::write(plan_path(&cfg), b"{\"compile\": 42}").unwrap();

        let err = run_plan(&cfg, &ExecHooks::default()).unwrap_err();
        let text = format!("{err:#}");
        assert!(text.contains("malformed"));
        assert!(text.contains(&plan_path(&cfg).display().to_string()));
    }
}
