//! Synthesis of concrete compile and link command lines.
//!
//! A command is the compiler path expanded through the template engine,
//! followed by the descriptor's compile or link template expanded with the
//! standard binding set. All values are shell-quoted before binding.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use crate::core::cfile::{CFile, CFileFlags};
use crate::core::config::{BackendMode, Config, GlobalFlags};
use crate::core::platform::{TargetCpu, TargetOs};
use crate::driver::descriptor::{descriptor, is_vs_compatible, CcDescriptor, CcKind};
use crate::driver::options::{add_opt, per_file_options};
use crate::driver::template::expand;
use crate::util::diagnostic::DriverError;
use crate::util::fs::{absolutize, expand_tilde};
use crate::util::quote::{quote_path, quote_shell};

/// The `--platform:` fragment bound as `$vccplatform`; consumed only by the
/// VCC-family templates.
pub fn vcc_platform(cfg: &Config) -> &'static str {
    match cfg.target_cpu {
        TargetCpu::I386 => " --platform:x86",
        TargetCpu::Arm => " --platform:arm",
        TargetCpu::Amd64 => " --platform:amd64",
        _ => "",
    }
}

/// The object file a translation unit compiles to.
///
/// An empty `obj_path` derives `<c_path>.<obj_ext>`; external objects are
/// completed against the cache directory; script generation strips paths to
/// bare file names.
pub fn object_file_path(cfg: &Config, cfile: &CFile) -> PathBuf {
    let mut obj = if cfile.obj_path.as_os_str().is_empty() {
        let mut s = cfile.c_path.clone().into_os_string();
        s.push(".");
        s.push(descriptor(cfg.cc).obj_ext);
        PathBuf::from(s)
    } else {
        cfile.obj_path.clone()
    };

    if cfile.flags.contains(CFileFlags::EXTERNAL) && obj.is_relative() {
        obj = cfg.cache_dir.join(obj);
    }

    if cfg.no_absolute_paths() {
        if let Some(name) = obj.file_name() {
            obj = PathBuf::from(name);
        }
    }

    obj
}

fn compiler_exe(cfg: &Config, cc: &CcDescriptor, is_cpp: bool) -> Result<String, DriverError> {
    let exe = match cfg.cc_config_var(".exe") {
        Some(v) => v,
        None if is_cpp => cc.cpp_compiler,
        None => cc.compiler_exe,
    };
    if exe.is_empty() {
        return Err(DriverError::UnsupportedTarget {
            compiler: cc.name,
            role: if is_cpp { "C++ compiler" } else { "C compiler" },
        });
    }
    Ok(exe.to_string())
}

fn with_exe_ext(cfg: &Config, exe: String) -> String {
    if cfg.needs_exe_ext() && Path::new(&exe).extension().is_none() {
        format!("{exe}.exe")
    } else {
        exe
    }
}

fn tool_pattern(cfg: &Config, exe: &str) -> String {
    if cfg.no_absolute_paths() {
        return Path::new(exe)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| exe.to_string());
    }
    match cfg.cc_config_var(".path") {
        Some(dir) if !dir.is_empty() => Path::new(dir).join(exe).display().to_string(),
        _ => exe.to_string(),
    }
}

/// Synthesize the compile command for one translation unit.
///
/// `is_main` marks the project's main module (PIC exemption under hot code
/// reload); `produce_output` announces side artifacts like assembler
/// listings.
pub fn compile_cmd(
    cfg: &Config,
    cfile: &CFile,
    is_main: bool,
    produce_output: bool,
) -> Result<String> {
    let cc = descriptor(cfg.cc);

    let is_cpp = cfg.backend == BackendMode::CompileToCpp
        && !cfile
            .c_path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("c"));
    let exe = with_exe_ext(cfg, compiler_exe(cfg, cc, is_cpp)?);

    let mut options = per_file_options(cfg, &cfile.module_name, &cfile.c_path, is_main);

    let mut include = String::new();
    if !cfg.no_absolute_paths() {
        include.push_str(cc.include_cmd);
        include.push_str(&quote_path(&cfg.lib_path));
        for dir in &cfg.c_includes {
            include.push_str(cc.include_cmd);
            include.push_str(&quote_shell(dir));
        }
        include.push_str(cc.include_cmd);
        include.push_str(&quote_path(&cfg.project_path));
    }

    let objfile = object_file_path(cfg, cfile);
    let dfile = objfile.with_extension("d");

    if cfg.globals.contains(GlobalFlags::PRODUCE_ASM) && !cc.produce_asm.is_empty() {
        let asmfile = objfile.with_extension("asm");
        add_opt(
            &mut options,
            &expand(cc.produce_asm, &[("asmfile", &quote_path(&asmfile))]),
        );
        if produce_output {
            tracing::info!("assembler listing: {}", asmfile.display());
        }
    }

    let src = if cfg.no_absolute_paths() {
        cfile
            .c_path
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| cfile.c_path.clone())
    } else {
        cfile.c_path.clone()
    };
    let file_q = quote_path(&src);
    let obj_q = quote_path(&objfile);
    let dfile_q = quote_path(&dfile);
    let caravel_q = quote_path(&cfg.prefix_dir);
    let lib_q = quote_path(&cfg.lib_path);
    let bindings = [
        ("dfile", dfile_q.as_str()),
        ("file", file_q.as_str()),
        ("objfile", obj_q.as_str()),
        ("options", options.as_str()),
        ("include", include.as_str()),
        ("caravel", caravel_q.as_str()),
        ("lib", lib_q.as_str()),
        ("vccplatform", vcc_platform(cfg)),
    ];

    let mut result = quote_shell(&expand(&tool_pattern(cfg, &exe), &bindings));
    result.push(' ');
    result.push_str(&expand(cc.compile_tmpl, &bindings));
    Ok(result)
}

fn linker_exe(cfg: &Config, cc: &CcDescriptor) -> Result<String, DriverError> {
    let mut exe = cfg
        .cc_config_var(".linkerexe")
        .unwrap_or(cc.linker_exe)
        .to_string();
    if exe.is_empty() {
        exe = if cfg.globals.contains(GlobalFlags::MIXED_MODE)
            && cfg.backend != BackendMode::CompileToCpp
            && !cc.cpp_compiler.is_empty()
        {
            cc.cpp_compiler.to_string()
        } else {
            cc.compiler_exe.to_string()
        };
    }
    if exe.is_empty() {
        return Err(DriverError::UnsupportedTarget {
            compiler: cc.name,
            role: "linker",
        });
    }
    Ok(exe)
}

/// Synthesize the link command producing `output` from the pre-quoted
/// `objfiles` list.
pub fn link_cmd(cfg: &Config, output: &Path, objfiles: &str, is_dll: bool) -> Result<String> {
    let cc = descriptor(cfg.cc);

    if cfg.globals.contains(GlobalFlags::GEN_STATIC_LIB) {
        let libfile = if cfg.out_file.as_os_str().is_empty() {
            if cfg.target_os.is_windows_family() {
                format!("{}.lib", cfg.project_name)
            } else {
                format!("lib{}.a", cfg.project_name)
            }
        } else {
            absolutize(&expand_tilde(&cfg.out_file)).display().to_string()
        };
        return Ok(expand(
            cc.build_lib,
            &[("libfile", &format!("\"{libfile}\"")), ("objfiles", objfiles)],
        ));
    }

    let exe = with_exe_ext(cfg, linker_exe(cfg, cc)?);

    let build_gui = if cfg.globals.contains(GlobalFlags::GEN_GUI_APP)
        && cfg.target_os == TargetOs::Windows
    {
        cc.build_gui
    } else {
        ""
    };
    let build_dll = if is_dll { cc.build_dll } else { "" };

    let map_base = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| cfg.project_name.clone());
    let mapfile_q = quote_path(&cfg.cache_dir.join(format!("{map_base}.map")));

    let mut link_options = cfg.link_options.clone();
    for option in &cfg.link_options_cmd {
        add_opt(&mut link_options, option);
    }
    for lib in &cfg.c_linked_libs {
        link_options.push_str(&expand(cc.link_lib_cmd, &[("1", &quote_shell(lib))]));
    }
    for dir in &cfg.c_libs {
        link_options.push_str(cc.link_dir_cmd);
        link_options.push_str(&quote_shell(dir));
    }
    if let Some(v) = cfg.cc_config_var(".options.linker") {
        add_opt(&mut link_options, v);
    }

    let exefile_q = quote_path(output);
    let caravel_q = quote_path(&cfg.prefix_dir);
    let lib_q = quote_path(&cfg.lib_path);
    let bindings = [
        ("builddll", build_dll),
        ("mapfile", mapfile_q.as_str()),
        ("buildgui", build_gui),
        ("options", link_options.as_str()),
        ("objfiles", objfiles),
        ("exefile", exefile_q.as_str()),
        ("caravel", caravel_q.as_str()),
        ("lib", lib_q.as_str()),
        ("vccplatform", vcc_platform(cfg)),
    ];

    let tmpl = cfg.cc_config_var(".linktmpl").unwrap_or(cc.link_tmpl);
    let mut result = quote_shell(&expand(&tool_pattern(cfg, &exe), &bindings));
    result.push(' ');
    result.push_str(&expand(tmpl, &bindings));

    if cfg.hcr_on && is_vs_compatible(cfg) {
        // A unique PDB name per link so the debugger's lock on the previous
        // one never blocks a reload.
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        result.push_str(&format!(" /link /PDB:{}.{}.pdb", output.display(), stamp));
    }

    if cfg.globals.contains(GlobalFlags::C_DEBUG) && cfg.cc == CcKind::Vcc {
        result.push_str(" /Zi /FS /Od");
    }

    Ok(result)
}
