//! The external C-toolchain driver.
//!
//! Orchestration order: the footprint oracle has already marked cached
//! units, the command synthesizer produces one compile command per survivor,
//! the executor runs them in parallel, and the linker driver produces the
//! final binary. Scripts, plans, and mappings are emitted from the same
//! synthesized commands.

pub mod command;
pub mod descriptor;
pub mod executor;
pub mod footprint;
pub mod linker;
pub mod mapping;
pub mod options;
pub mod plan;
pub mod script;
pub mod template;

use anyhow::Result;

use crate::core::cfile::CFileFlags;
use crate::core::config::{Config, GlobalFlags};
use crate::driver::executor::{execute_commands, ExecHooks};
use crate::driver::linker::call_linker;
use crate::driver::script::write_script;

/// `[source_path, compile_command]` for every non-cached unit, in
/// `to_compile` order.
pub fn compile_command_pairs(cfg: &Config) -> Result<Vec<(String, String)>> {
    let last = cfg.to_compile.len().saturating_sub(1);
    let mut pairs = Vec::new();
    for (idx, cfile) in cfg.to_compile.iter().enumerate() {
        if cfile.flags.contains(CFileFlags::CACHED) {
            continue;
        }
        let cmd = command::compile_cmd(cfg, cfile, idx == last, true)?;
        pairs.push((cfile.c_path.display().to_string(), cmd));
    }
    Ok(pairs)
}

/// Compile every non-cached unit, then drive the link phase. Linking is
/// skipped under `NO_LINKING`; under `COMPILE_ONLY` the link command is
/// still synthesized when a script asks for it.
pub fn run_c_compiler(cfg: &Config, hooks: &ExecHooks) -> Result<()> {
    if !cfg.backend.compiles_c() {
        return Ok(());
    }
    let compile_only = cfg.globals.contains(GlobalFlags::COMPILE_ONLY);
    let gen_script = cfg.globals.contains(GlobalFlags::GEN_SCRIPT);
    if compile_only && !gen_script {
        return Ok(());
    }

    let pairs = compile_command_pairs(cfg)?;
    let cmds: Vec<String> = pairs.into_iter().map(|(_, cmd)| cmd).collect();
    if !compile_only {
        execute_commands(cfg, &cmds, hooks)?;
    }

    let mut link_line = String::new();
    if !cfg.globals.contains(GlobalFlags::NO_LINKING) {
        link_line = call_linker(cfg, !compile_only, hooks)?;
    }

    if gen_script {
        write_script(cfg, &cmds, &link_line)?;
    }

    Ok(())
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
    fn test_cached_units_get_no_commands() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        let mut cached = CFile::new("a", "/t/a.crv.c");
        cached.flags |= CFileFlags::CACHED;
        cfg.add_file_to_compile(cached);
        cfg.add_file_to_compile(CFile::new("b", "/t/b.crv.c"));

        let pairs = compile_command_pairs(&cfg).unwrap();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0, "/t/b.crv.c");
    }

    #[test]
    fn test_js_backend_is_a_no_op() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.backend = crate::core::config::BackendMode::CompileToJs;
        cfg.add_file_to_compile(CFile::new("m", "/t/m.crv.c"));

        // Would fail on the missing compiler if it ran anything.
        run_c_compiler(&cfg, &ExecHooks::default()).unwrap();
    }
}
