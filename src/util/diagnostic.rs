//! Typed user-facing errors for the toolchain driver.
//!
//! Programming errors (descriptor lookup of the sentinel kind, unbound
//! template placeholders) panic instead; these variants cover everything a
//! user can trigger from the outside.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Errors reported to the host compiler's diagnostic layer.
#[derive(Debug, Error, Diagnostic)]
pub enum DriverError {
    /// An unrecognized compiler name was selected.
    #[error("unknown C compiler: `{name}`")]
    #[diagnostic(
        code(caravel::cc::unknown_compiler),
        help("available C compilers are: {known}")
    )]
    UnknownCompiler { name: String, known: String },

    /// The chosen toolchain has no executable for the requested job.
    #[error("the `{compiler}` toolchain has no {role} for the requested target")]
    #[diagnostic(code(caravel::cc::unsupported_target))]
    UnsupportedTarget {
        compiler: &'static str,
        role: &'static str,
    },

    /// A script, mapping, plan, or footprint file could not be written.
    #[error("cannot write {kind} file: {}", path.display())]
    #[diagnostic(code(caravel::cc::write_failed))]
    WriteFailed {
        kind: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A child compiler or linker failed or could not be launched.
    #[error("external program failed: {command}\n{output}")]
    #[diagnostic(code(caravel::cc::process_failed))]
    ProcessFailed { command: String, output: String },

    /// The stored build plan has missing fields or wrong shapes.
    #[error("build plan is malformed: {} ({detail})", path.display())]
    #[diagnostic(
        code(caravel::cc::plan_malformed),
        help("delete the file and rebuild to regenerate it")
    )]
    PlanMalformed { path: PathBuf, detail: String },
}
