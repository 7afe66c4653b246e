//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Host target description for ccgo
//
// Supplies the predefined macros and default system include directories
// the preprocessor needs to get through the host's C headers.
//

use std::fmt;

/// Target CPU architecture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    X86_64,
    Aarch64,
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arch::X86_64 => write!(f, "x86_64"),
            Arch::Aarch64 => write!(f, "aarch64"),
        }
    }
}

/// Target operating system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    MacOS,
    FreeBSD,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Os::Linux => write!(f, "linux"),
            Os::MacOS => write!(f, "macos"),
            Os::FreeBSD => write!(f, "freebsd"),
        }
    }
}

/// A predefined macro: name and optional replacement (None = defined empty)
pub type PredefinedMacro = (&'static str, Option<&'static str>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub arch: Arch,
    pub os: Os,
}

impl Target {
    pub fn new(arch: Arch, os: Os) -> Self {
        Self { arch, os }
    }

    /// Target for the machine ccgo runs on
    pub fn host() -> Self {
        Self::new(Self::detect_arch(), Self::detect_os())
    }

    fn detect_arch() -> Arch {
        #[cfg(target_arch = "aarch64")]
        {
            Arch::Aarch64
        }
        #[cfg(not(target_arch = "aarch64"))]
        {
            Arch::X86_64
        }
    }

    fn detect_os() -> Os {
        #[cfg(target_os = "macos")]
        {
            Os::MacOS
        }
        #[cfg(target_os = "freebsd")]
        {
            Os::FreeBSD
        }
        #[cfg(not(any(target_os = "macos", target_os = "freebsd")))]
        {
            Os::Linux
        }
    }

    /// GNU triplet directory used by multiarch Linux distributions
    fn multiarch_dir(&self) -> &'static str {
        match self.arch {
            Arch::X86_64 => "/usr/include/x86_64-linux-gnu",
            Arch::Aarch64 => "/usr/include/aarch64-linux-gnu",
        }
    }

    /// Default system include directories, searched after any -I paths
    pub fn include_paths(&self) -> Vec<String> {
        let mut paths = vec!["/usr/local/include".to_string()];
        match self.os {
            Os::Linux => paths.push(self.multiarch_dir().to_string()),
            Os::MacOS => paths.push(
                "/Library/Developer/CommandLineTools/SDKs/MacOSX.sdk/usr/include".to_string(),
            ),
            Os::FreeBSD => {}
        }
        paths.push("/usr/include".to_string());
        paths
    }

    /// Architecture and data-model macros
    pub fn arch_macros(&self) -> Vec<PredefinedMacro> {
        let mut macros = vec![
            ("__CHAR_BIT__", Some("8")),
            ("__SIZEOF_POINTER__", Some("8")),
            ("__SIZEOF_SHORT__", Some("2")),
            ("__SIZEOF_INT__", Some("4")),
            ("__SIZEOF_LONG__", Some("8")),
            ("__SIZEOF_LONG_LONG__", Some("8")),
            ("__LP64__", Some("1")),
            ("_LP64", Some("1")),
        ];
        match self.arch {
            Arch::X86_64 => macros.extend([
                ("__x86_64__", Some("1")),
                ("__x86_64", Some("1")),
                ("__amd64__", Some("1")),
                ("__amd64", Some("1")),
                ("__SSE2__", Some("1")),
                ("__AVX2__", Some("1")),
                ("__FMA__", Some("1")),
            ]),
            Arch::Aarch64 => macros.extend([
                ("__aarch64__", Some("1")),
                ("__ARM_64BIT_STATE", Some("1")),
                ("__ARM_NEON", Some("1")),
                ("__CHAR_UNSIGNED__", Some("1")),
            ]),
        }
        macros
    }

    /// Operating system macros
    pub fn os_macros(&self) -> Vec<PredefinedMacro> {
        let mut macros = vec![
            ("__STDC_HOSTED__", Some("1")),
            ("__unix__", Some("1")),
            ("__unix", Some("1")),
        ];
        match self.os {
            Os::Linux => macros.extend([
                ("__linux__", Some("1")),
                ("__linux", Some("1")),
                ("__gnu_linux__", Some("1")),
                ("__ELF__", Some("1")),
            ]),
            Os::MacOS => macros.extend([
                ("__APPLE__", Some("1")),
                ("__MACH__", Some("1")),
            ]),
            Os::FreeBSD => macros.extend([("__FreeBSD__", Some("14")), ("__ELF__", Some("1"))]),
        }
        macros
    }
}

impl Default for Target {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_x86_64_linux_macros() {
        let target = Target::new(Arch::X86_64, Os::Linux);
        let arch = target.arch_macros();
        assert!(arch.contains(&("__x86_64__", Some("1"))));
        assert!(arch.contains(&("__LP64__", Some("1"))));
        let os = target.os_macros();
        assert!(os.contains(&("__linux__", Some("1"))));
        assert!(!os.iter().any(|(name, _)| *name == "__APPLE__"));
    }

    #[test]
    fn test_aarch64_char_unsigned() {
        let target = Target::new(Arch::Aarch64, Os::Linux);
        assert!(target.arch_macros().contains(&("__CHAR_UNSIGNED__", Some("1"))));
    }

    #[test]
    fn test_linux_include_paths() {
        let target = Target::new(Arch::X86_64, Os::Linux);
        assert_eq!(
            target.include_paths(),
            vec![
                "/usr/local/include",
                "/usr/include/x86_64-linux-gnu",
                "/usr/include"
            ]
        );
    }

    #[test]
    fn test_display() {
        let target = Target::new(Arch::Aarch64, Os::MacOS);
        assert_eq!(format!("{}-{}", target.arch, target.os), "aarch64-macos");
    }
}
