//! Per-translation-unit state handed over by the code generator.

use std::path::PathBuf;

use bitflags::bitflags;

bitflags! {
    /// Flags on a generated C file.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CFileFlags: u8 {
        /// Supplied by the user or build scripts rather than generated.
        const EXTERNAL = 1 << 0;
        /// Set by the footprint oracle; no compile command is synthesized.
        const CACHED = 1 << 1;
    }
}

/// One C/C++/Objective-C translation unit of the build.
#[derive(Debug, Clone)]
pub struct CFile {
    /// Logical module name, also the key for per-module config vars.
    pub module_name: String,
    /// Absolute path of the generated source.
    pub c_path: PathBuf,
    /// Object path; empty means "derive from `c_path`".
    pub obj_path: PathBuf,
    pub flags: CFileFlags,
}

impl CFile {
    /// Create an entry for a generated source; the object path is derived
    /// later by the command synthesizer.
    pub fn new(module_name: impl Into<String>, c_path: impl Into<PathBuf>) -> Self {
        CFile {
            module_name: module_name.into(),
            c_path: c_path.into(),
            obj_path: PathBuf::new(),
            flags: CFileFlags::empty(),
        }
    }
}
