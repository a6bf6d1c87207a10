//! caravel-cc - the external C/C++ toolchain driver of the Caravel
//! compiler back-end.
//!
//! The front end hands over a [`Config`] describing the build plus the
//! generated [`CFile`] units; this crate decides how to invoke the chosen
//! third-party compiler and linker, skips unchanged externals via content
//! hashing, runs the commands with bounded parallelism, and emits
//! reproducible artifacts (build plans, scripts, mapping files).

pub mod core;
pub mod driver;
pub mod util;

pub use crate::core::cfile::{CFile, CFileFlags};
pub use crate::core::config::{BackendMode, Config, GlobalFlags, OptFlags};
pub use crate::core::platform::{TargetCpu, TargetOs};
pub use crate::driver::descriptor::{
    descriptor, is_vs_compatible, kind_from_name, set_compiler, CcDescriptor, CcKind,
};
pub use crate::driver::executor::ExecHooks;
pub use crate::driver::footprint::add_external_file_to_compile;
pub use crate::driver::mapping::write_mapping;
pub use crate::driver::plan::{changed_via_plan, run_plan, write_plan_for_build};
pub use crate::driver::run_c_compiler;
pub use crate::util::diagnostic::DriverError;
