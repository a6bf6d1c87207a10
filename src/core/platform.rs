//! Target platform catalog.
//!
//! Closed enumerations of the operating systems and processors the back-end
//! can target, with the properties the driver consults: PIC requirements,
//! Windows-family membership, artifact extensions, and the command-line
//! length limit that triggers the response-file fallback.

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetOs {
    Windows,
    Dos,
    Linux,
    MacOsX,
    Ios,
    FreeBsd,
    NetBsd,
    OpenBsd,
    Solaris,
    Haiku,
    Android,
}

impl TargetOs {
    /// The OS name as recorded in footprints and defined symbols.
    pub fn name(self) -> &'static str {
        match self {
            TargetOs::Windows => "windows",
            TargetOs::Dos => "dos",
            TargetOs::Linux => "linux",
            TargetOs::MacOsX => "macosx",
            TargetOs::Ios => "ios",
            TargetOs::FreeBsd => "freebsd",
            TargetOs::NetBsd => "netbsd",
            TargetOs::OpenBsd => "openbsd",
            TargetOs::Solaris => "solaris",
            TargetOs::Haiku => "haiku",
            TargetOs::Android => "android",
        }
    }

    /// Whether shared objects on this OS require position-independent code.
    pub fn needs_pic(self) -> bool {
        !self.is_windows_family()
    }

    /// The Windows/DOS family shares executable suffixes, script flavor, and
    /// the short command-line limit.
    pub fn is_windows_family(self) -> bool {
        matches!(self, TargetOs::Windows | TargetOs::Dos)
    }

    /// Executable file extension, without the dot.
    pub fn exe_ext(self) -> &'static str {
        if self.is_windows_family() {
            "exe"
        } else {
            ""
        }
    }

    /// Shared library file name for a bare module name.
    pub fn dll_name(self, base: &str) -> String {
        match self {
            TargetOs::Windows | TargetOs::Dos => format!("{base}.dll"),
            TargetOs::MacOsX | TargetOs::Ios => format!("lib{base}.dylib"),
            _ => format!("lib{base}.so"),
        }
    }

    /// Extension of generated build scripts.
    pub fn script_ext(self) -> &'static str {
        if self.is_windows_family() {
            "bat"
        } else {
            "sh"
        }
    }

    /// Longest command line the platform shell accepts before the linker
    /// driver switches to a response file.
    pub fn max_cmd_len(self) -> usize {
        if self.is_windows_family() {
            8_000
        } else {
            32_000
        }
    }
}

/// Target processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetCpu {
    I386,
    Amd64,
    Arm,
    Arm64,
    Riscv64,
    Mips,
    PowerPc64,
    Wasm32,
}

impl TargetCpu {
    /// The CPU name as recorded in footprints and defined symbols.
    pub fn name(self) -> &'static str {
        match self {
            TargetCpu::I386 => "i386",
            TargetCpu::Amd64 => "amd64",
            TargetCpu::Arm => "arm",
            TargetCpu::Arm64 => "arm64",
            TargetCpu::Riscv64 => "riscv64",
            TargetCpu::Mips => "mips",
            TargetCpu::PowerPc64 => "powerpc64",
            TargetCpu::Wasm32 => "wasm32",
        }
    }
}

/// The OS this compiler process itself is running on.
pub fn host_os() -> TargetOs {
    if cfg!(windows) {
        TargetOs::Windows
    } else if cfg!(target_os = "macos") {
        TargetOs::MacOsX
    } else {
        TargetOs::Linux
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows_family() {
        assert!(TargetOs::Windows.is_windows_family());
        assert!(TargetOs::Dos.is_windows_family());
        assert!(!TargetOs::Linux.is_windows_family());
    }

    #[test]
    fn test_needs_pic() {
        assert!(TargetOs::Linux.needs_pic());
        assert!(TargetOs::MacOsX.needs_pic());
        assert!(!TargetOs::Windows.needs_pic());
    }

    #[test]
    fn test_dll_name() {
        assert_eq!(TargetOs::Windows.dll_name("m"), "m.dll");
        assert_eq!(TargetOs::MacOsX.dll_name("m"), "libm.dylib");
        assert_eq!(TargetOs::Linux.dll_name("m"), "libm.so");
    }

    #[test]
    fn test_cmd_len_limits() {
        assert_eq!(TargetOs::Windows.max_cmd_len(), 8_000);
        assert_eq!(TargetOs::FreeBsd.max_cmd_len(), 32_000);
    }
}
