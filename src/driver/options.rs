//! Per-file compile option assembly.
//!
//! Options come from several layers (global accumulator, per-file overrides,
//! command line, optimization/debug defaults, per-module config vars) and
//! are concatenated in a fixed order into one flat string.

use std::path::Path;

use crate::core::config::{Config, GlobalFlags, OptFlags};
use crate::driver::descriptor::descriptor;

/// Append `src` to `dest` with exactly one space between tokens. Descriptor
/// flag strings carry their own leading spaces; those are kept as-is.
pub fn add_opt(dest: &mut String, src: &str) {
    if src.is_empty() {
        return;
    }
    if !dest.is_empty() && !dest.ends_with(' ') && !src.starts_with(' ') {
        dest.push(' ');
    }
    dest.push_str(src);
}

fn speed_flags(cfg: &Config) -> &str {
    cfg.cc_config_var(".options.speed")
        .unwrap_or(descriptor(cfg.cc).opt_speed)
}

fn size_flags(cfg: &Config) -> &str {
    cfg.cc_config_var(".options.size")
        .unwrap_or(descriptor(cfg.cc).opt_size)
}

fn debug_flags(cfg: &Config) -> &str {
    cfg.cc_config_var(".options.debug")
        .unwrap_or(descriptor(cfg.cc).debug)
}

/// Assemble the option string for one translation unit.
///
/// Layering order: global accumulator, per-path extras, command-line options
/// not already present (substring check), debug/speed/size defaults with
/// per-module config-var overrides, the module's `.always` var, and the PIC
/// flag when building shared objects on a PIC target.
pub fn per_file_options(cfg: &Config, module_name: &str, full_path: &Path, is_main: bool) -> String {
    let cc = descriptor(cfg.cc);
    let mut result = cfg.compile_options.clone();

    if let Some(extra) = cfg.file_specific_options(full_path) {
        add_opt(&mut result, extra);
    }

    for option in &cfg.compile_options_cmd {
        if !result.contains(option.as_str()) {
            add_opt(&mut result, option);
        }
    }

    if cfg.globals.contains(GlobalFlags::C_DEBUG) {
        match cfg.config_var(&format!("{module_name}.debug")) {
            Some(v) => add_opt(&mut result, v),
            None => add_opt(&mut result, debug_flags(cfg)),
        }
    }
    if cfg.opts.contains(OptFlags::OPTIMIZE_SPEED) {
        match cfg.config_var(&format!("{module_name}.speed")) {
            Some(v) => add_opt(&mut result, v),
            None => add_opt(&mut result, speed_flags(cfg)),
        }
    } else if cfg.opts.contains(OptFlags::OPTIMIZE_SIZE) {
        match cfg.config_var(&format!("{module_name}.size")) {
            Some(v) => add_opt(&mut result, v),
            None => add_opt(&mut result, size_flags(cfg)),
        }
    }

    if let Some(v) = cfg.config_var(&format!("{module_name}.always")) {
        add_opt(&mut result, v);
    }

    if (cfg.globals.contains(GlobalFlags::GEN_DYN_LIB) || (cfg.hcr_on && !is_main))
        && cfg.target_os.needs_pic()
    {
        add_opt(&mut result, cc.pic);
    }

    result
}

/// The option string with no per-module layers, as recorded in the mapping
/// file.
pub fn global_compile_options(cfg: &Config) -> String {
    per_file_options(cfg, "", Path::new(""), false)
}
