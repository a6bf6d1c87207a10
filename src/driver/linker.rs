//! Link-step driving: mode selection, hot code reload, and the
//! response-file fallback for oversized command lines.

use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::cfile::CFileFlags;
use crate::core::config::{Config, GlobalFlags};
use crate::driver::command::{link_cmd, object_file_path};
use crate::driver::descriptor::{descriptor, is_vs_compatible, CcKind};
use crate::driver::executor::{execute_commands, ExecHooks};
use crate::util::fs::copy_preserving;
use crate::util::quote::quote_path;

/// Every object file participating in the link: externally registered
/// objects first (in their stored order), then every generated object in
/// `to_compile` order.
pub fn link_object_list(cfg: &Config) -> Vec<PathBuf> {
    let cc = descriptor(cfg.cc);
    let mut objects = Vec::new();

    for external in &cfg.external_to_link {
        let mut path = PathBuf::from(external);
        if path.extension().is_none() {
            let mut s = path.into_os_string();
            s.push(".");
            s.push(cc.obj_ext);
            path = PathBuf::from(s);
        }
        if cfg.no_absolute_paths() {
            if let Some(name) = path.file_name() {
                path = PathBuf::from(name);
            }
        }
        objects.push(path);
    }

    for cfile in &cfg.to_compile {
        objects.push(object_file_path(cfg, cfile));
    }

    objects
}

/// The same list as one quoted, space-separated string for templates.
pub fn link_objfiles(cfg: &Config) -> String {
    link_object_list(cfg)
        .iter()
        .map(|p| quote_path(p))
        .collect::<Vec<_>>()
        .join(" ")
}

fn split_leading_exe(cmd: &str) -> (&str, &str) {
    let mut end = 0;
    let bytes = cmd.as_bytes();
    if bytes.first() == Some(&b'"') {
        end = 1;
        while end < bytes.len() && bytes[end] != b'"' {
            end += 1;
        }
        if end < bytes.len() {
            end += 1;
        }
    } else {
        while end < bytes.len() && bytes[end] != b' ' {
            end += 1;
        }
    }
    let exe = &cmd[..end];
    let tail = cmd[end..].trim_start_matches(' ');
    (exe, tail)
}

fn response_file_path(cfg: &Config) -> PathBuf {
    cfg.project_path
        .join(format!("{}_linkerArgs.txt", cfg.project_name))
}

/// Run one link command, switching to `@file` arguments when the command
/// line exceeds the platform limit. The response file is deleted afterwards,
/// best effort.
fn exec_link_cmd(cfg: &Config, cmd: &str, hooks: &ExecHooks) -> Result<()> {
    let limit = cfg.host_os.max_cmd_len();
    if cmd.len() <= limit {
        return execute_commands(cfg, std::slice::from_ref(&cmd.to_string()), hooks);
    }

    let (exe, tail) = split_leading_exe(cmd);
    // GCC-family response files reject backslashes.
    let args = if matches!(
        cfg.cc,
        CcKind::Gcc | CcKind::SwitchGcc | CcKind::LlvmGcc | CcKind::Clang
    ) {
        tail.replace('\\', "/")
    } else {
        tail.to_string()
    };

    let response_file = response_file_path(cfg);
    std::fs::write(&response_file, &args).map_err(|source| {
        crate::util::diagnostic::DriverError::WriteFailed {
            kind: "linker response",
            path: response_file.clone(),
            source,
        }
    })?;

    let short_cmd = format!("{exe} @{}", quote_path(&response_file));
    let result = execute_commands(cfg, std::slice::from_ref(&short_cmd), hooks);
    if let Err(err) = std::fs::remove_file(&response_file) {
        tracing::debug!("could not remove response file: {err}");
    }
    result
}

fn hcr_link_target(cfg: &Config, obj: &Path, is_main: bool) -> PathBuf {
    if is_main {
        let out_name = cfg
            .absolute_out_file()
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(&cfg.project_name));
        cfg.cache_dir.join(out_name)
    } else {
        let base = obj
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        cfg.cache_dir.join(cfg.target_os.dll_name(&base))
    }
}

/// Remove accumulated `<target>.<stamp>.pdb` files before relinking, so the
/// cache directory does not fill up with one PDB per reload.
fn remove_stale_pdbs(target: &Path) {
    let Some(dir) = target.parent() else { return };
    let Some(name) = target.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return;
    };
    let prefix = format!("{name}.");
    let Ok(entries) = std::fs::read_dir(dir) else { return };
    for entry in entries.flatten() {
        let file_name = entry.file_name().to_string_lossy().into_owned();
        if file_name.starts_with(&prefix) && file_name.ends_with(".pdb") {
            let _ = std::fs::remove_file(entry.path());
        }
    }
}

fn link_hcr(cfg: &Config, objfiles: &str, execute: bool, hooks: &ExecHooks) -> Result<String> {
    let main_idx = cfg.to_compile.len().saturating_sub(1);
    let mut cmds = Vec::new();
    let mut main_cmd = String::new();
    let mut main_target = PathBuf::new();

    for (idx, cfile) in cfg.to_compile.iter().enumerate() {
        // Cached units keep their previously linked binaries; relinking all
        // of them on every small change would defeat the point of reload.
        if cfile.flags.contains(CFileFlags::CACHED) {
            continue;
        }
        let obj = object_file_path(cfg, cfile);
        let is_main = idx == main_idx;
        let target = hcr_link_target(cfg, &obj, is_main);
        if is_vs_compatible(cfg) {
            remove_stale_pdbs(&target);
        }
        let cmd = link_cmd(
            cfg,
            &target,
            &format!("{objfiles} {}", quote_path(&obj)),
            !is_main,
        )?;
        if is_main {
            main_cmd = cmd.clone();
            main_target = target;
        }
        cmds.push(cmd);
    }

    if execute {
        execute_commands(cfg, &cmds, hooks)?;
        if !main_target.as_os_str().is_empty() {
            copy_preserving(&main_target, &cfg.absolute_out_file())?;
        }
    }
    Ok(main_cmd)
}

/// Drive the link phase and return the primary link command (recorded in
/// scripts and build plans). With `execute` false the command is only
/// synthesized.
pub fn call_linker(cfg: &Config, execute: bool, hooks: &ExecHooks) -> Result<String> {
    let objfiles = link_objfiles(cfg);
    let mut output = cfg.absolute_out_file();
    if cfg.no_absolute_paths() {
        if let Some(name) = output.file_name() {
            output = PathBuf::from(name);
        }
    }

    if cfg.globals.contains(GlobalFlags::GEN_STATIC_LIB) {
        let cmd = link_cmd(cfg, &output, &objfiles, false)?;
        if execute {
            execute_commands(cfg, std::slice::from_ref(&cmd), hooks)?;
        }
        return Ok(cmd);
    }

    if cfg.hcr_on {
        return link_hcr(cfg, &objfiles, execute, hooks);
    }

    let cmd = link_cmd(
        cfg,
        &output,
        &objfiles,
        cfg.globals.contains(GlobalFlags::GEN_DYN_LIB),
    )?;
    if execute {
        exec_link_cmd(cfg, &cmd, hooks)?;
    }
    Ok(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cfile::CFile;
    use crate::core::platform::TargetOs;
    use tempfile::TempDir;

    fn cfg_in(tmp: &TempDir) -> Config {
        let mut cfg = Config::new("proj");
        cfg.cc = CcKind::Gcc;
        cfg.target_os = TargetOs::Linux;
        cfg.host_os = TargetOs::Linux;
        cfg.project_path = tmp.path().to_path_buf();
        cfg.cache_dir = tmp.path().join("cache");
        cfg.verbosity = 0;
        cfg.num_processors = 1;
        std::fs::create_dir_all(&cfg.cache_dir).unwrap();
        cfg
    }

    #[test]
    fn test_objfile_order_externals_first_lifo() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.add_external_to_link("/ext/a.o");
        cfg.add_external_to_link("/ext/b.o");
        cfg.add_file_to_compile(CFile::new("m", "/t/m.crv.c"));

        // Registration order a, b; the link sees b first.
        assert_eq!(link_objfiles(&cfg), "/ext/b.o /ext/a.o /t/m.crv.c.o");
    }

    #[test]
    fn test_objfile_extension_completion() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.add_external_to_link("/ext/bare");

        assert_eq!(link_objfiles(&cfg), "/ext/bare.o");

        cfg.cc = CcKind::Vcc;
        assert_eq!(link_objfiles(&cfg), "/ext/bare.obj");
    }

    #[test]
    fn test_split_leading_exe() {
        assert_eq!(split_leading_exe("gcc -o a b.o"), ("gcc", "-o a b.o"));
        assert_eq!(
            split_leading_exe("\"C:/tool chain/cl.exe\" /Fe:a b.obj"),
            ("\"C:/tool chain/cl.exe\"", "/Fe:a b.obj")
        );
    }

    #[test]
    fn test_response_file_fallback() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.set_config_var("gcc.linkerexe", "true");
        cfg.out_file = tmp.path().join("proj");

        // Enough objects to blow well past the 32k limit.
        for i in 0..5000 {
            cfg.add_external_to_link(format!("{}\\obj\\unit{}.o", tmp.path().display(), i));
        }
        let cmd = call_linker(&cfg, false, &ExecHooks::default()).unwrap();
        assert!(cmd.len() > cfg.host_os.max_cmd_len());

        call_linker(&cfg, true, &ExecHooks::default()).unwrap();
        // Deleted after a successful run.
        assert!(!response_file_path(&cfg).exists());
    }

    #[test]
    fn test_response_file_slash_translation() {
        let tmp = TempDir::new().unwrap();
        let cfg = cfg_in(&tmp);

        let long_tail = "a\\b\\c.o ".repeat(5000);
        let cmd = format!("true {long_tail}");
        assert!(cmd.len() > cfg.host_os.max_cmd_len());

        // Snapshot the response file mid-run via the after-run hook.
        let seen = std::sync::Mutex::new(String::new());
        let after_run = |_i: usize, _code: i32, _out: &str| {
            let content = std::fs::read_to_string(response_file_path(&cfg)).unwrap();
            seen.lock().unwrap().push_str(&content);
        };
        let hooks = ExecHooks {
            describe: None,
            after_run: Some(&after_run),
        };
        exec_link_cmd(&cfg, &cmd, &hooks).unwrap();

        let content = seen.into_inner().unwrap();
        assert!(content.contains("a/b/c.o"));
        assert!(!content.contains('\\'));
        assert!(!response_file_path(&cfg).exists());
    }

    #[test]
    fn test_hcr_links_one_dll_per_object_plus_main() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.hcr_on = true;
        cfg.out_file = tmp.path().join("app");
        cfg.add_file_to_compile(CFile::new("a", tmp.path().join("a.crv.c")));
        cfg.add_file_to_compile(CFile::new("b", tmp.path().join("b.crv.c")));
        cfg.add_file_to_compile(CFile::new("app", tmp.path().join("app.crv.c")));

        let main_cmd = call_linker(&cfg, false, &ExecHooks::default()).unwrap();
        // The designated main object produces the executable in the cache.
        assert!(main_cmd.contains(&format!("-o {}", cfg.cache_dir.join("app").display())));
        assert!(!main_cmd.contains("-shared"));
    }

    #[test]
    fn test_hcr_skips_cached_objects() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.hcr_on = true;
        cfg.out_file = tmp.path().join("app");
        let mut cached = CFile::new("a", tmp.path().join("a.crv.c"));
        cached.flags |= CFileFlags::CACHED;
        cfg.add_file_to_compile(cached);
        cfg.add_file_to_compile(CFile::new("app", tmp.path().join("app.crv.c")));

        let main_cmd = call_linker(&cfg, false, &ExecHooks::default()).unwrap();
        assert!(!main_cmd.is_empty());
    }

    #[test]
    fn test_hcr_copies_main_binary_out() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.hcr_on = true;
        cfg.out_file = tmp.path().join("app");
        cfg.set_config_var("gcc.linkerexe", "true");
        cfg.add_file_to_compile(CFile::new("app", tmp.path().join("app.crv.c")));

        // Simulate the linker's product so the copy-out has a source.
        std::fs::write(cfg.cache_dir.join("app"), b"binary").unwrap();
        call_linker(&cfg, true, &ExecHooks::default()).unwrap();
        assert_eq!(std::fs::read(tmp.path().join("app")).unwrap(), b"binary");
    }

    #[test]
    fn test_remove_stale_pdbs() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("liba.dll");
        std::fs::write(tmp.path().join("liba.dll.123.pdb"), b"").unwrap();
        std::fs::write(tmp.path().join("liba.dll.456.pdb"), b"").unwrap();
        std::fs::write(tmp.path().join("libb.dll.123.pdb"), b"").unwrap();

        remove_stale_pdbs(&target);
        assert!(!tmp.path().join("liba.dll.123.pdb").exists());
        assert!(!tmp.path().join("liba.dll.456.pdb").exists());
        assert!(tmp.path().join("libb.dll.123.pdb").exists());
    }
}
