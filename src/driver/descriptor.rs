//! Catalog of supported external toolchains.
//!
//! One immutable descriptor per compiler kind. Derived entries (`llvm_gcc`
//! from `gcc`, `clang` from `llvm_gcc`, `icl`/`clang_cl` from `vcc`) are
//! materialized at compile time via struct update, so lookups stay O(1).

use bitflags::bitflags;

use crate::core::config::Config;
use crate::util::diagnostic::DriverError;

bitflags! {
    /// Capabilities the code generator may rely on per toolchain.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CcProps: u16 {
        /// `case` ranges in switch statements.
        const SWITCH_RANGE = 1 << 0;
        /// Computed goto (`goto *label`).
        const COMPUTED_GOTO = 1 << 1;
        /// Doubles as a C++ compiler.
        const CPP = 1 << 2;
        /// `__assume` intrinsic.
        const ASSUME = 1 << 3;
        /// Understands the GC guard attribute.
        const GC_GUARD = 1 << 4;
        /// GNU inline assembler syntax.
        const GNU_ASM = 1 << 5;
        /// `__declspec` syntax.
        const DECLSPEC = 1 << 6;
        /// `__attribute__` syntax.
        const ATTRIBUTE = 1 << 7;
    }
}

/// One supported back-end toolchain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CcKind {
    /// Sentinel: no compiler selected. Never a valid table key.
    None,
    Gcc,
    SwitchGcc,
    LlvmGcc,
    Clang,
    Lcc,
    Bcc,
    Dmc,
    Wcc,
    Vcc,
    Tcc,
    Pcc,
    Ucc,
    Icl,
    Icc,
    ClangCl,
}

/// Every real compiler kind, in declaration order.
pub const ALL_KINDS: [CcKind; 15] = [
    CcKind::Gcc,
    CcKind::SwitchGcc,
    CcKind::LlvmGcc,
    CcKind::Clang,
    CcKind::Lcc,
    CcKind::Bcc,
    CcKind::Dmc,
    CcKind::Wcc,
    CcKind::Vcc,
    CcKind::Tcc,
    CcKind::Pcc,
    CcKind::Ucc,
    CcKind::Icl,
    CcKind::Icc,
    CcKind::ClangCl,
];

/// Immutable description of one toolchain: executables, command templates,
/// and mode-specific flag fragments.
///
/// Template placeholders: `$file $objfile $options $include $dfile $caravel
/// $lib $vccplatform $buildgui $builddll $exefile $objfiles $mapfile
/// $libfile $asmfile` plus `$1` in `link_lib_cmd`.
#[derive(Debug, Clone, Copy)]
pub struct CcDescriptor {
    /// Short id; also the conditional-compilation symbol for this kind.
    pub name: &'static str,
    /// Object file extension, without the dot.
    pub obj_ext: &'static str,
    pub opt_speed: &'static str,
    pub opt_size: &'static str,
    pub debug: &'static str,
    pub compiler_exe: &'static str,
    pub cpp_compiler: &'static str,
    /// Empty means "link with the compiler driver".
    pub linker_exe: &'static str,
    pub compile_tmpl: &'static str,
    pub link_tmpl: &'static str,
    pub build_gui: &'static str,
    pub build_dll: &'static str,
    pub build_lib: &'static str,
    pub include_cmd: &'static str,
    pub link_dir_cmd: &'static str,
    pub link_lib_cmd: &'static str,
    pub pic: &'static str,
    /// Cooperating format strings for the code generator; only
    /// `produce_asm` is consumed by the driver itself.
    pub asm_stmt_fmt: &'static str,
    pub struct_stmt_fmt: &'static str,
    pub produce_asm: &'static str,
    pub props: CcProps,
}

const GNU_ASM_LISTING: &str = "-Wa,-acdl=$asmfile -g -fverbose-asm -masm=intel";

const GCC: CcDescriptor = CcDescriptor {
    name: "gcc",
    obj_ext: "o",
    opt_speed: " -O3 -fno-ident",
    opt_size: " -Os -fno-ident",
    debug: "",
    compiler_exe: "gcc",
    cpp_compiler: "g++",
    linker_exe: "",
    compile_tmpl: "-c $options $include -o $objfile $file",
    link_tmpl: "$buildgui $builddll -o $exefile $objfiles $options",
    build_gui: " -mwindows",
    build_dll: " -shared",
    build_lib: "ar rcs $libfile $objfiles",
    include_cmd: " -I",
    link_dir_cmd: " -L",
    link_lib_cmd: " -l$1",
    pic: "-fPIC",
    asm_stmt_fmt: "__asm__($1);",
    struct_stmt_fmt: "$1 $3 $2 ",
    produce_asm: GNU_ASM_LISTING,
    props: CcProps::from_bits_truncate(
        CcProps::SWITCH_RANGE.bits()
            | CcProps::COMPUTED_GOTO.bits()
            | CcProps::CPP.bits()
            | CcProps::GC_GUARD.bits()
            | CcProps::GNU_ASM.bits()
            | CcProps::ATTRIBUTE.bits(),
    ),
};

const SWITCH_GCC: CcDescriptor = CcDescriptor {
    name: "switch_gcc",
    compiler_exe: "aarch64-none-elf-gcc",
    cpp_compiler: "aarch64-none-elf-g++",
    compile_tmpl: "-w -MMD -MP -MF $dfile -c $options $include -o $objfile $file",
    link_tmpl: "$buildgui $builddll -Wl,-Map,$mapfile -o $exefile $objfiles $options",
    build_lib: "aarch64-none-elf-gcc-ar rcs $libfile $objfiles",
    ..GCC
};

const LLVM_GCC: CcDescriptor = CcDescriptor {
    name: "llvm_gcc",
    compiler_exe: "llvm-gcc",
    cpp_compiler: "llvm-g++",
    build_lib: "llvm-ar rcs $libfile $objfiles",
    ..GCC
};

const CLANG: CcDescriptor = CcDescriptor {
    name: "clang",
    compiler_exe: "clang",
    cpp_compiler: "clang++",
    ..LLVM_GCC
};

const VCC: CcDescriptor = CcDescriptor {
    name: "vcc",
    obj_ext: "obj",
    opt_speed: " /Ogityb2 ",
    opt_size: " /O1 ",
    debug: " /RTC1 /Z7 ",
    compiler_exe: "cl",
    cpp_compiler: "cl",
    linker_exe: "cl",
    compile_tmpl: "/c$vccplatform $options $include /nologo /Fo$objfile $file",
    link_tmpl: "$builddll$vccplatform /Fe$exefile $objfiles $buildgui /nologo $options",
    build_gui: " /SUBSYSTEM:WINDOWS user32.lib ",
    build_dll: " /LD",
    build_lib: "lib /OUT:$libfile $objfiles",
    include_cmd: " /I",
    link_dir_cmd: " /LIBPATH:",
    link_lib_cmd: " $1.lib",
    pic: "",
    asm_stmt_fmt: "__asm{$n$1$n}$n",
    struct_stmt_fmt: "$3$n$1 $2",
    produce_asm: "/Fa$asmfile",
    props: CcProps::from_bits_truncate(
        CcProps::CPP.bits() | CcProps::ASSUME.bits() | CcProps::DECLSPEC.bits(),
    ),
};

const ICL: CcDescriptor = CcDescriptor {
    name: "icl",
    compiler_exe: "icl",
    cpp_compiler: "icl",
    linker_exe: "xilink",
    ..VCC
};

const ICC: CcDescriptor = CcDescriptor {
    name: "icc",
    compiler_exe: "icc",
    cpp_compiler: "icpc",
    linker_exe: "icc",
    ..GCC
};

const CLANG_CL: CcDescriptor = CcDescriptor {
    name: "clang_cl",
    compiler_exe: "clang-cl",
    cpp_compiler: "clang-cl",
    linker_exe: "clang-cl",
    include_cmd: " -I",
    link_dir_cmd: " -Wl,-LIBPATH:",
    link_lib_cmd: " -l$1",
    ..VCC
};

const LCC: CcDescriptor = CcDescriptor {
    name: "lcc",
    obj_ext: "obj",
    opt_speed: " -O -p6 ",
    opt_size: "",
    debug: " -g5 ",
    compiler_exe: "lcc",
    cpp_compiler: "",
    linker_exe: "lcclnk",
    compile_tmpl: "-c $options $include -Fo$objfile $file",
    link_tmpl: "$options $buildgui $builddll -O $exefile $objfiles",
    build_gui: " -subsystem windows",
    build_dll: " -dll",
    build_lib: "",
    include_cmd: " -I",
    link_dir_cmd: "",
    link_lib_cmd: " $1.lib",
    pic: "",
    asm_stmt_fmt: "_asm{$n$1$n}$n",
    struct_stmt_fmt: "$1 $3 $2 ",
    produce_asm: "",
    props: CcProps::empty(),
};

const BCC: CcDescriptor = CcDescriptor {
    name: "bcc",
    obj_ext: "obj",
    opt_speed: " -O3 -6 ",
    opt_size: " -O1 -6 ",
    debug: "",
    compiler_exe: "bcc32c",
    cpp_compiler: "cpp32c",
    linker_exe: "",
    compile_tmpl: "-c $options $include -o$objfile $file",
    link_tmpl: "$options $buildgui $builddll -e$exefile $objfiles",
    build_gui: " -tW",
    build_dll: " -tWD",
    build_lib: "",
    include_cmd: " -I",
    link_dir_cmd: "",
    link_lib_cmd: " $1.lib",
    pic: "",
    asm_stmt_fmt: "__asm{$n$1$n}$n",
    struct_stmt_fmt: "$1 $3 $2 ",
    produce_asm: "",
    props: CcProps::from_bits_truncate(
        CcProps::SWITCH_RANGE.bits()
            | CcProps::COMPUTED_GOTO.bits()
            | CcProps::CPP.bits()
            | CcProps::ATTRIBUTE.bits(),
    ),
};

const DMC: CcDescriptor = CcDescriptor {
    name: "dmc",
    obj_ext: "obj",
    opt_speed: " -ff -o -6 ",
    opt_size: " -ff -o -6 ",
    debug: " -g ",
    compiler_exe: "dmc",
    cpp_compiler: "",
    linker_exe: "",
    compile_tmpl: "-c $options $include -o$objfile $file",
    link_tmpl: "$options $buildgui $builddll -of$exefile $objfiles",
    build_gui: " -L/exet:nt/su:windows",
    build_dll: " -WD",
    build_lib: "",
    include_cmd: " -I",
    link_dir_cmd: "",
    link_lib_cmd: " $1.lib",
    pic: "",
    asm_stmt_fmt: "__asm{$n$1$n}$n",
    struct_stmt_fmt: "$3$n$1 $2",
    produce_asm: "",
    props: CcProps::from_bits_truncate(CcProps::CPP.bits()),
};

const WCC: CcDescriptor = CcDescriptor {
    name: "wcc",
    obj_ext: "obj",
    opt_speed: " -ox -on -6 -d0 -fp6 -zW ",
    opt_size: "",
    debug: " -d2 ",
    compiler_exe: "wcl386",
    cpp_compiler: "",
    linker_exe: "",
    compile_tmpl: "-c $options $include -fo=$objfile $file",
    link_tmpl: "$options $buildgui $builddll -fe=$exefile $objfiles ",
    build_gui: " -bw",
    build_dll: " -bd",
    build_lib: "",
    include_cmd: " -i=",
    link_dir_cmd: "",
    link_lib_cmd: " $1.lib",
    pic: "",
    asm_stmt_fmt: "__asm{$n$1$n}$n",
    struct_stmt_fmt: "$1 $3 $2 ",
    produce_asm: "",
    props: CcProps::from_bits_truncate(CcProps::CPP.bits()),
};

const TCC: CcDescriptor = CcDescriptor {
    name: "tcc",
    obj_ext: "o",
    opt_speed: "",
    opt_size: "",
    debug: " -g ",
    compiler_exe: "tcc",
    cpp_compiler: "",
    linker_exe: "tcc",
    compile_tmpl: "-c $options $include -o $objfile $file",
    link_tmpl: "-o $exefile $options $buildgui $builddll $objfiles",
    build_gui: " -Wl,-subsystem=gui",
    build_dll: " -shared",
    build_lib: "",
    include_cmd: " -I",
    link_dir_cmd: " -L",
    link_lib_cmd: " -l$1",
    pic: "",
    asm_stmt_fmt: "asm($1);",
    struct_stmt_fmt: "$1 $3 $2 ",
    produce_asm: "",
    props: CcProps::from_bits_truncate(
        CcProps::SWITCH_RANGE.bits() | CcProps::COMPUTED_GOTO.bits() | CcProps::GNU_ASM.bits(),
    ),
};

const PCC: CcDescriptor = CcDescriptor {
    name: "pcc",
    obj_ext: "obj",
    opt_speed: " -Ox ",
    opt_size: " -Os ",
    debug: " -Zi ",
    compiler_exe: "cc",
    cpp_compiler: "",
    linker_exe: "",
    compile_tmpl: "-c $options $include -Fo$objfile $file",
    link_tmpl: "$options $buildgui $builddll /OUT:$exefile $objfiles",
    build_gui: " -subsystem:windows",
    build_dll: " -DLL",
    build_lib: "",
    include_cmd: " -I",
    link_dir_cmd: "",
    link_lib_cmd: " $1.lib",
    pic: "",
    asm_stmt_fmt: "__asm{$n$1$n}$n",
    struct_stmt_fmt: "$1 $3 $2 ",
    produce_asm: "",
    props: CcProps::empty(),
};

const UCC: CcDescriptor = CcDescriptor {
    name: "ucc",
    obj_ext: "o",
    opt_speed: " -O3 ",
    opt_size: " -O1 ",
    debug: "",
    compiler_exe: "cc",
    cpp_compiler: "",
    linker_exe: "",
    compile_tmpl: "-c $options $include -o $objfile $file",
    link_tmpl: "-o $exefile $buildgui $builddll $objfiles $options",
    build_gui: "",
    build_dll: " -shared ",
    build_lib: "",
    include_cmd: " -I",
    link_dir_cmd: " -L",
    link_lib_cmd: " -l$1",
    pic: "",
    asm_stmt_fmt: "__asm__($1);",
    struct_stmt_fmt: "$1 $3 $2 ",
    produce_asm: "",
    props: CcProps::empty(),
};

/// Look up the descriptor for a compiler kind.
///
/// # Panics
///
/// Panics on `CcKind::None`; callers must select a real compiler first.
pub fn descriptor(kind: CcKind) -> &'static CcDescriptor {
    match kind {
        CcKind::None => panic!("descriptor lookup for the `None` compiler kind"),
        CcKind::Gcc => &GCC,
        CcKind::SwitchGcc => &SWITCH_GCC,
        CcKind::LlvmGcc => &LLVM_GCC,
        CcKind::Clang => &CLANG,
        CcKind::Lcc => &LCC,
        CcKind::Bcc => &BCC,
        CcKind::Dmc => &DMC,
        CcKind::Wcc => &WCC,
        CcKind::Vcc => &VCC,
        CcKind::Tcc => &TCC,
        CcKind::Pcc => &PCC,
        CcKind::Ucc => &UCC,
        CcKind::Icl => &ICL,
        CcKind::Icc => &ICC,
        CcKind::ClangCl => &CLANG_CL,
    }
}

fn eq_style_insensitive(a: &str, b: &str) -> bool {
    let norm = |s: &str| -> String {
        s.chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect()
    };
    norm(a).eq(&norm(b))
}

/// Find a compiler kind by textual name, ignoring case and underscores, so
/// `clang_cl`, `ClangCL` and `clangcl` all match. Returns `CcKind::None`
/// when nothing matches.
pub fn kind_from_name(name: &str) -> CcKind {
    for kind in ALL_KINDS {
        if eq_style_insensitive(descriptor(kind).name, name) {
            return kind;
        }
    }
    CcKind::None
}

/// Whether the active toolchain speaks the Visual Studio dialect of linker
/// flags (`/link`, `/PDB:`, ...).
pub fn is_vs_compatible(cfg: &Config) -> bool {
    matches!(cfg.cc, CcKind::Vcc | CcKind::ClangCl)
        || (cfg.cc == CcKind::Icl && cfg.host_os.is_windows_family())
}

/// Select the compiler by textual name and update the defined-symbol set:
/// every descriptor name is undefined, then the active one defined.
pub fn set_compiler(cfg: &mut Config, name: &str) -> Result<(), DriverError> {
    let kind = kind_from_name(name);
    if kind == CcKind::None {
        let known = ALL_KINDS
            .iter()
            .map(|k| descriptor(*k).name)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(DriverError::UnknownCompiler {
            name: name.to_string(),
            known,
        });
    }

    cfg.cc = kind;
    for other in ALL_KINDS {
        cfg.undef_symbol(descriptor(other).name);
    }
    cfg.define_symbol(descriptor(kind).name);
    Ok(())
}
