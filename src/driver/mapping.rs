//! Mapping file emission for external tooling.
//!
//! An INI-shaped summary of the build: the C files, the effective compiler
//! and linker flags, the library path, and a symbol-mapping blob produced by
//! the code generator.

use anyhow::Result;

use crate::core::config::{Config, GlobalFlags};
use crate::driver::descriptor::descriptor;
use crate::driver::options::{add_opt, global_compile_options};
use crate::util::diagnostic::DriverError;

/// Quote a flag string for the mapping INI, escaping quotes, backslashes,
/// and non-printable bytes.
fn escape_ini(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c if (' '..='~').contains(&c) => out.push(c),
            c => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).as_bytes() {
                    out.push_str(&format!("\\x{byte:02X}"));
                }
            }
        }
    }
    out.push('"');
    out
}

/// Write `<project-path>/mapping.txt` when mapping generation is enabled.
/// The `symbol_mapping` blob is supplied by the code generator.
pub fn write_mapping(cfg: &Config, symbol_mapping: &str) -> Result<()> {
    if !cfg.globals.contains(GlobalFlags::GEN_MAPPING) {
        return Ok(());
    }

    let cc = descriptor(cfg.cc);
    let mut code = String::from("[C_Files]\n");
    for cfile in &cfg.to_compile {
        code.push_str(&format!("--file:r\"{}\"\n", cfile.c_path.display()));
    }

    code.push_str("[C_Compiler]\nFlags=");
    code.push_str(&escape_ini(&global_compile_options(cfg)));

    let mut link_flags = cfg.link_options.clone();
    for option in &cfg.link_options_cmd {
        add_opt(&mut link_flags, option);
    }
    if let Some(v) = cfg.cc_config_var(".options.linker") {
        add_opt(&mut link_flags, v);
    }
    for lib in &cfg.c_linked_libs {
        add_opt(
            &mut link_flags,
            &crate::driver::template::expand(cc.link_lib_cmd, &[("1", lib)]),
        );
    }

    code.push_str("\n[Linker]\nFlags=");
    code.push_str(&escape_ini(&link_flags));

    code.push_str("\n[Environment]\nlibpath=");
    code.push_str(&escape_ini(&cfg.lib_path.display().to_string()));

    code.push_str("\n[Symbols]\n");
    code.push_str(symbol_mapping);

    let path = cfg.project_path.join("mapping.txt");
    std::fs::write(&path, code).map_err(|source| DriverError::WriteFailed {
        kind: "mapping",
        path: path.clone(),
        source,
    })?;
    Ok(())
}
