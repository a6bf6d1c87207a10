//! Content-addressed recompile oracle for external translation units.
//!
//! A footprint captures everything that influences an object file: the
//! source bytes, the target platform, the compiler, and the exact compile
//! command. The last-known footprint lives in a `<object>.sha1` sidecar; an
//! unchanged footprint plus an existing object means the unit is cached.

use anyhow::Result;

use crate::core::cfile::{CFile, CFileFlags};
use crate::core::config::{Config, GlobalFlags};
use crate::driver::command::{compile_cmd, object_file_path};
use crate::driver::descriptor::descriptor;
use crate::util::diagnostic::DriverError;
use crate::util::hash::{sha1_file, FootprintHasher};

/// Compute the footprint of one external translation unit.
pub fn footprint(cfg: &Config, cfile: &CFile) -> Result<String> {
    let source_hash = sha1_file(&cfile.c_path)?;
    let command = compile_cmd(cfg, cfile, false, false)?;

    let mut fp = FootprintHasher::new();
    fp.update_str(&source_hash)
        .update_str(cfg.target_os.name())
        .update_str(cfg.target_cpu.name())
        .update_str(descriptor(cfg.cc).name)
        .update_str(&command);
    Ok(fp.finish())
}

/// Whether the unit's footprint differs from the stored one. On change the
/// new footprint is written immediately, before any compilation happens; a
/// failed compile is re-attempted anyway because the object was deleted.
pub fn external_file_changed(cfg: &Config, cfile: &CFile) -> Result<bool> {
    if !cfg.backend.compiles_c() {
        return Ok(false);
    }

    let sidecar = {
        let mut p = object_file_path(cfg, cfile).into_os_string();
        p.push(".sha1");
        std::path::PathBuf::from(p)
    };
    let current = footprint(cfg, cfile)?;
    let stored = std::fs::read_to_string(&sidecar)
        .ok()
        .map(|s| s.trim().to_string());

    let changed = stored.as_deref() != Some(current.as_str());
    if changed {
        std::fs::write(&sidecar, format!("{current}\n")).map_err(|source| {
            DriverError::WriteFailed {
                kind: "footprint",
                path: sidecar.clone(),
                source,
            }
        })?;
    }
    Ok(changed)
}

/// Register an external translation unit, marking it cached when its object
/// exists and the footprint is unchanged. Otherwise the object is deleted so
/// a failed compile cannot leave stale output behind.
pub fn add_external_file_to_compile(cfg: &mut Config, mut cfile: CFile) -> Result<()> {
    cfile.flags |= CFileFlags::EXTERNAL;
    if cfile.obj_path.as_os_str().is_empty() {
        cfile.obj_path = object_file_path(cfg, &cfile);
    }

    // The sidecar is refreshed even under a forced rebuild.
    let changed = external_file_changed(cfg, &cfile)?;

    if !cfg.globals.contains(GlobalFlags::FORCE_FULL_MAKE)
        && cfile.obj_path.exists()
        && !changed
    {
        cfile.flags |= CFileFlags::CACHED;
        tracing::debug!("cached external: {}", cfile.c_path.display());
    } else {
        let _ = std::fs::remove_file(&cfile.obj_path);
    }

    cfg.to_compile.push(cfile);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    use crate::core::config::OptFlags;
    use crate::core::platform::{TargetCpu, TargetOs};
    use crate::driver::descriptor::CcKind;

    fn cfg_in(tmp: &TempDir) -> Config {
        let mut cfg = Config::new("proj");
        cfg.cc = CcKind::Gcc;
        cfg.target_os = TargetOs::Linux;
        cfg.host_os = TargetOs::Linux;
        cfg.lib_path = PathBuf::from("/opt/caravel/lib");
        cfg.project_path = tmp.path().to_path_buf();
        cfg.cache_dir = tmp.path().join("cache");
        std::fs::create_dir_all(&cfg.cache_dir).unwrap();
        cfg
    }

    fn external(tmp: &TempDir, name: &str, contents: &str) -> CFile {
        let src = tmp.path().join(name);
        std::fs::write(&src, contents).unwrap();
        let mut cfile = CFile::new(name.trim_end_matches(".c"), src);
        cfile.flags |= CFileFlags::EXTERNAL;
        cfile
    }

    #[test]
    fn test_footprint_sensitivity() {
        let tmp = TempDir::new().unwrap();
        let cfg = cfg_in(&tmp);
        let cfile = external(&tmp, "vendor.c", "int f(void){return 1;}");

        let base = footprint(&cfg, &cfile).unwrap();

        // Source bytes.
        std::fs::write(&cfile.c_path, "int f(void){return 2;}").unwrap();
        let changed_src = footprint(&cfg, &cfile).unwrap();
        assert_ne!(base, changed_src);
        std::fs::write(&cfile.c_path, "int f(void){return 1;}").unwrap();

        // Target OS.
        let mut os_cfg = cfg.clone();
        os_cfg.target_os = TargetOs::FreeBsd;
        assert_ne!(base, footprint(&os_cfg, &cfile).unwrap());

        // Target CPU.
        let mut cpu_cfg = cfg.clone();
        cpu_cfg.target_cpu = TargetCpu::Arm64;
        assert_ne!(base, footprint(&cpu_cfg, &cfile).unwrap());

        // Compiler kind.
        let mut cc_cfg = cfg.clone();
        cc_cfg.cc = CcKind::Clang;
        assert_ne!(base, footprint(&cc_cfg, &cfile).unwrap());

        // Any option that reaches the compile command.
        let mut opt_cfg = cfg.clone();
        opt_cfg.opts |= OptFlags::OPTIMIZE_SPEED;
        assert_ne!(base, footprint(&opt_cfg, &cfile).unwrap());

        // And stability: nothing changed, nothing differs.
        assert_eq!(base, footprint(&cfg, &cfile).unwrap());
    }

    #[test]
    fn test_first_sight_is_a_change_and_writes_sidecar() {
        let tmp = TempDir::new().unwrap();
        let cfg = cfg_in(&tmp);
        let cfile = external(&tmp, "vendor.c", "int f;");

        let mut probe = cfile.clone();
        probe.obj_path = crate::driver::command::object_file_path(&cfg, &probe);

        assert!(external_file_changed(&cfg, &probe).unwrap());

        let sidecar = PathBuf::from(format!("{}.sha1", probe.obj_path.display()));
        let stored = std::fs::read_to_string(sidecar).unwrap();
        assert_eq!(stored.trim(), footprint(&cfg, &probe).unwrap());

        // Second probe sees the stored footprint.
        assert!(!external_file_changed(&cfg, &probe).unwrap());
    }

    #[test]
    fn test_cached_requires_existing_object() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        let cfile = external(&tmp, "vendor.c", "int f;");

        // First registration: no object yet, not cached.
        add_external_file_to_compile(&mut cfg, cfile.clone()).unwrap();
        assert!(!cfg.to_compile[0].flags.contains(CFileFlags::CACHED));

        // Pretend the compile succeeded, then re-register.
        let obj = cfg.to_compile[0].obj_path.clone();
        std::fs::write(&obj, b"obj").unwrap();
        let mut cfg2 = cfg_in(&tmp);
        add_external_file_to_compile(&mut cfg2, cfile.clone()).unwrap();
        assert!(cfg2.to_compile[0].flags.contains(CFileFlags::CACHED));
        assert!(obj.exists());
    }

    #[test]
    fn test_source_change_recompiles_exactly_that_file() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        let a = external(&tmp, "a.c", "int a;");
        let b = external(&tmp, "b.c", "int b;");

        add_external_file_to_compile(&mut cfg, a.clone()).unwrap();
        add_external_file_to_compile(&mut cfg, b.clone()).unwrap();
        for cfile in &cfg.to_compile {
            std::fs::write(&cfile.obj_path, b"obj").unwrap();
        }

        // Mutate one source; only that unit loses its cached flag.
        std::fs::write(&a.c_path, "int a2;").unwrap();
        let mut cfg2 = cfg_in(&tmp);
        add_external_file_to_compile(&mut cfg2, a).unwrap();
        add_external_file_to_compile(&mut cfg2, b).unwrap();

        assert!(!cfg2.to_compile[0].flags.contains(CFileFlags::CACHED));
        assert!(cfg2.to_compile[1].flags.contains(CFileFlags::CACHED));
        // The stale object was deleted up front.
        assert!(!cfg2.to_compile[0].obj_path.exists());
        assert!(cfg2.to_compile[1].obj_path.exists());
    }

    #[test]
    fn test_force_full_make_never_caches() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.globals |= GlobalFlags::FORCE_FULL_MAKE;
        let cfile = external(&tmp, "vendor.c", "int f;");

        add_external_file_to_compile(&mut cfg, cfile.clone()).unwrap();
        let obj = cfg.to_compile[0].obj_path.clone();
        std::fs::write(&obj, b"obj").unwrap();

        let mut cfg2 = cfg_in(&tmp);
        cfg2.globals |= GlobalFlags::FORCE_FULL_MAKE;
        add_external_file_to_compile(&mut cfg2, cfile).unwrap();
        assert!(!cfg2.to_compile[0].flags.contains(CFileFlags::CACHED));
    }

    #[test]
    fn test_js_backend_reports_unchanged() {
        let tmp = TempDir::new().unwrap();
        let mut cfg = cfg_in(&tmp);
        cfg.backend = crate::core::config::BackendMode::CompileToJs;
        let cfile = external(&tmp, "vendor.c", "int f;");

        assert!(!external_file_changed(&cfg, &cfile).unwrap());
    }
}
