//! The shared build configuration bundle.
//!
//! `Config` is handed in by the host compiler and threaded explicitly through
//! every driver function; the driver assumes exclusive access for the
//! duration of a build. Option accumulators and the `cached` flags on
//! `to_compile` entries are the only fields the driver itself mutates.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use bitflags::bitflags;

use crate::core::cfile::CFile;
use crate::core::platform::{host_os, TargetCpu, TargetOs};
use crate::driver::descriptor::CcKind;
use crate::driver::options::add_opt;

/// What the front end is being compiled to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendMode {
    #[default]
    CompileToC,
    CompileToCpp,
    CompileToOc,
    CompileToJs,
    CompileToLlvm,
    None,
}

impl BackendMode {
    /// Whether this mode drives the external C toolchain at all.
    pub fn compiles_c(self) -> bool {
        !matches!(self, BackendMode::CompileToJs)
    }
}

bitflags! {
    /// Global build switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct GlobalFlags: u32 {
        const COMPILE_ONLY = 1 << 0;
        const GEN_SCRIPT = 1 << 1;
        const GEN_MAPPING = 1 << 2;
        const GEN_STATIC_LIB = 1 << 3;
        const GEN_DYN_LIB = 1 << 4;
        const GEN_GUI_APP = 1 << 5;
        const LIST_CMD = 1 << 6;
        const NO_LINKING = 1 << 7;
        const FORCE_FULL_MAKE = 1 << 8;
        const PRODUCE_ASM = 1 << 9;
        const C_DEBUG = 1 << 10;
        const MIXED_MODE = 1 << 11;
        const RUN = 1 << 12;
    }
}

bitflags! {
    /// Per-build optimization switches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OptFlags: u8 {
        const OPTIMIZE_SPEED = 1 << 0;
        const OPTIMIZE_SIZE = 1 << 1;
    }
}

/// Process-wide configuration for one build.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chosen toolchain.
    pub cc: CcKind,
    pub backend: BackendMode,

    pub target_os: TargetOs,
    pub target_cpu: TargetCpu,
    /// OS the compiler process runs on; decides `.exe` suffixing and
    /// quoting flavor.
    pub host_os: TargetOs,

    pub globals: GlobalFlags,
    pub opts: OptFlags,
    /// Hot code reload: one shared library per object plus a main binary.
    pub hcr_on: bool,

    /// 0 = silent, 1 = progress lines, 2+ = echo every command.
    pub verbosity: u8,
    /// Bound on concurrent compiler processes; 0 means auto-detect.
    pub num_processors: usize,

    /// Accumulated compile options (config files and programmatic adds).
    pub compile_options: String,
    /// Accumulated link options.
    pub link_options: String,
    /// Compile options originating from the command line, merged last.
    pub compile_options_cmd: Vec<String>,
    /// Link options originating from the command line.
    pub link_options_cmd: Vec<String>,
    /// Extra compile options keyed by full source path.
    pub cfile_specific_options: BTreeMap<PathBuf, String>,

    config_vars: BTreeMap<String, String>,
    defined_symbols: BTreeSet<String>,

    /// Directory holding the Caravel runtime headers (`caravelbase.h`).
    pub lib_path: PathBuf,
    /// Directory of the project's main module.
    pub project_path: PathBuf,
    pub project_name: String,
    /// Directory for intermediate artifacts (objects, plans, scripts).
    pub cache_dir: PathBuf,
    /// Requested output binary; empty means "derive from the project name".
    pub out_file: PathBuf,
    /// Install prefix of the running compiler, bound as `$caravel`.
    pub prefix_dir: PathBuf,

    pub to_compile: Vec<CFile>,
    /// Object files from the outside world; new entries go to the front.
    pub external_to_link: Vec<String>,
    /// Library search directories for the linker.
    pub c_libs: Vec<String>,
    /// Libraries to link against.
    pub c_linked_libs: Vec<String>,
    /// Additional include directories.
    pub c_includes: Vec<String>,

    /// The user's full command line, recorded in the build plan.
    pub cmdline: String,
    /// Absolute module files whose hashes gate plan replay.
    pub dep_files: Vec<PathBuf>,
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        let mut cfg = Config {
            cc: CcKind::Gcc,
            backend: BackendMode::default(),
            target_os: host_os(),
            target_cpu: TargetCpu::Amd64,
            host_os: host_os(),
            globals: GlobalFlags::default(),
            opts: OptFlags::default(),
            hcr_on: false,
            verbosity: 1,
            num_processors: 0,
            compile_options: String::new(),
            link_options: String::new(),
            compile_options_cmd: Vec::new(),
            link_options_cmd: Vec::new(),
            cfile_specific_options: BTreeMap::new(),
            config_vars: BTreeMap::new(),
            defined_symbols: BTreeSet::new(),
            lib_path: PathBuf::new(),
            project_path: PathBuf::new(),
            project_name: project_name.into(),
            cache_dir: PathBuf::new(),
            out_file: PathBuf::new(),
            prefix_dir: PathBuf::new(),
            to_compile: Vec::new(),
            external_to_link: Vec::new(),
            c_libs: Vec::new(),
            c_linked_libs: Vec::new(),
            c_includes: Vec::new(),
            cmdline: String::new(),
            dep_files: Vec::new(),
        };
        cfg.define_symbol(crate::driver::descriptor::descriptor(cfg.cc).name);
        cfg
    }

    /// Append a compile option unless it already occurs in the accumulator.
    ///
    /// Occurrence is a substring check, not tokenization; existing
    /// configurations depend on that.
    pub fn add_compile_option(&mut self, option: &str) {
        if !self.compile_options.contains(option) {
            add_opt(&mut self.compile_options, option);
        }
    }

    /// Append a link option unless it already occurs in the accumulator.
    pub fn add_link_option(&mut self, option: &str) {
        if !self.link_options.contains(option) {
            add_opt(&mut self.link_options, option);
        }
    }

    /// Register a generated translation unit for compilation.
    pub fn add_file_to_compile(&mut self, cfile: CFile) {
        self.to_compile.push(cfile);
    }

    /// Register an externally produced object for the link step. Entries are
    /// pushed to the front, so the final link sees them in reverse
    /// registration order.
    pub fn add_external_to_link(&mut self, obj: impl Into<String>) {
        self.external_to_link.insert(0, obj.into());
    }

    /// Look up a configuration variable.
    pub fn config_var(&self, key: &str) -> Option<&str> {
        self.config_vars.get(key).map(String::as_str)
    }

    /// Set a configuration variable.
    pub fn set_config_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.config_vars.insert(key.into(), value.into());
    }

    /// Look up a configuration variable scoped to the active compiler,
    /// e.g. `gcc.options.linker` for `cc_config_var(".options.linker")`.
    pub fn cc_config_var(&self, suffix: &str) -> Option<&str> {
        let key = format!("{}{}", crate::driver::descriptor::descriptor(self.cc).name, suffix);
        self.config_vars.get(&key).map(String::as_str)
    }

    /// Define a conditional-compilation symbol.
    pub fn define_symbol(&mut self, name: &str) {
        self.defined_symbols.insert(name.to_string());
    }

    /// Undefine a conditional-compilation symbol.
    pub fn undef_symbol(&mut self, name: &str) {
        self.defined_symbols.remove(name);
    }

    /// Whether a conditional-compilation symbol is defined.
    pub fn is_defined(&self, name: &str) -> bool {
        self.defined_symbols.contains(name)
    }

    /// The resolved output binary path.
    pub fn absolute_out_file(&self) -> PathBuf {
        let name: PathBuf = if self.out_file.as_os_str().is_empty() {
            let ext = self.target_os.exe_ext();
            if ext.is_empty() {
                PathBuf::from(&self.project_name)
            } else {
                PathBuf::from(format!("{}.{}", self.project_name, ext))
            }
        } else {
            self.out_file.clone()
        };
        if name.is_absolute() {
            name
        } else {
            self.project_path.join(name)
        }
    }

    /// Whether synthesized commands must avoid absolute paths (script and
    /// mapping generation relocate the build).
    pub fn no_absolute_paths(&self) -> bool {
        self.globals
            .intersects(GlobalFlags::GEN_SCRIPT | GlobalFlags::GEN_MAPPING)
    }

    /// Whether executables need an `.exe` suffix: the build host is Windows,
    /// or a script is generated for a Windows target.
    pub fn needs_exe_ext(&self) -> bool {
        self.host_os.is_windows_family()
            || (self.globals.contains(GlobalFlags::GEN_SCRIPT)
                && self.target_os.is_windows_family())
    }

    /// Per-path extra compile options, if any.
    pub fn file_specific_options(&self, path: &Path) -> Option<&str> {
        self.cfile_specific_options.get(path).map(String::as_str)
    }
}
