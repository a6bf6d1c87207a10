//! Build-script emission.
//!
//! When script generation is on, every synthesized compile command plus the
//! link command is written to `<cache>/compile_<out>.<sh|bat>` so the build
//! can be reproduced without the compiler. The runtime header is copied next
//! to it because the script's include flags are suppressed to bare names.

use anyhow::Result;

use crate::core::config::Config;
use crate::util::diagnostic::DriverError;
use crate::util::fs::{copy_preserving, ensure_dir};

/// The runtime header every generated unit includes.
pub const RUNTIME_HEADER: &str = "caravelbase.h";

/// Write the build script and place the runtime header beside it.
pub fn write_script(cfg: &Config, compile_cmds: &[String], link_cmd: &str) -> Result<()> {
    let out_name = cfg
        .absolute_out_file()
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| cfg.project_name.clone());
    let path = cfg.cache_dir.join(format!(
        "compile_{}.{}",
        out_name,
        cfg.target_os.script_ext()
    ));

    let mut script = String::new();
    for cmd in compile_cmds {
        script.push_str(cmd);
        script.push('\n');
    }
    if !link_cmd.is_empty() {
        script.push_str(link_cmd);
        script.push('\n');
    }

    ensure_dir(&cfg.cache_dir)?;
    std::fs::write(&path, script).map_err(|source| DriverError::WriteFailed {
        kind: "build script",
        path: path.clone(),
        source,
    })?;

    let header_src = cfg.lib_path.join(RUNTIME_HEADER);
    if header_src.exists() {
        copy_preserving(&header_src, &cfg.cache_dir.join(RUNTIME_HEADER))?;
    } else {
        tracing::warn!("runtime header not found: {}", header_src.display());
    }

    Ok(())
}
