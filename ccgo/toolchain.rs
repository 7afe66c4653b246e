//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// External compiler and disassembler stages for ccgo
//
// These run only after every signature has validated. They are plain
// subprocesses; their output is not read back into the extractor.
//

use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::target::{Arch, Target};

/// Code generation flags for the routines a binding wraps: no red zone,
/// no unwind tables, aggressive inlining
const COMMON_FLAGS: &[&str] = &[
    "-mllvm",
    "-inline-threshold=1000",
    "-fno-asynchronous-unwind-tables",
    "-fno-exceptions",
    "-fno-rtti",
];

const X86_64_FLAGS: &[&str] = &["-mavx2", "-mfma", "-mno-red-zone", "-mstackrealign"];

#[derive(Debug, Clone)]
pub struct Toolchain {
    clang: String,
    objdump: String,
    target: Target,
    /// -D, -U and -I arguments that shaped the extracted signatures
    preprocessor_args: Vec<OsString>,
}

impl Toolchain {
    pub fn new(target: Target) -> Self {
        Self {
            clang: "clang".to_string(),
            objdump: "objdump".to_string(),
            target,
            preprocessor_args: Vec::new(),
        }
    }

    /// Compile the same preprocessed view the extractor validated.
    ///
    /// Defines come before undefines, matching the order the extractor
    /// applies them in. System directories are left to clang.
    pub fn for_config(config: &Config) -> Self {
        let mut args: Vec<OsString> = Vec::new();
        for def in &config.defines {
            args.push(format!("-D{}", def).into());
        }
        for name in &config.undefines {
            args.push(format!("-U{}", name).into());
        }
        for dir in &config.include_paths {
            args.push("-I".into());
            args.push(dir.clone().into_os_string());
        }

        Self {
            preprocessor_args: args,
            ..Self::new(config.target)
        }
    }

    pub fn with_clang(mut self, program: impl Into<String>) -> Self {
        self.clang = program.into();
        self
    }

    pub fn with_objdump(mut self, program: impl Into<String>) -> Self {
        self.objdump = program.into();
        self
    }

    fn codegen_flags(&self) -> Vec<&'static str> {
        let mut flags = vec!["-O3"];
        if self.target.arch == Arch::X86_64 {
            flags.extend_from_slice(X86_64_FLAGS);
        }
        flags.extend_from_slice(COMMON_FLAGS);
        flags
    }

    fn clang_command(&self, mode: &str, source: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(&self.clang);
        cmd.args(self.codegen_flags())
            .args(&self.preprocessor_args)
            .arg(mode)
            .arg(source)
            .arg("-o")
            .arg(output);
        cmd
    }

    /// `clang -O3 ... -S source -o output`
    pub fn asm_command(&self, source: &Path, output: &Path) -> Command {
        self.clang_command("-S", source, output)
    }

    /// `clang -O3 ... -c source -o output`
    pub fn object_command(&self, source: &Path, output: &Path) -> Command {
        self.clang_command("-c", source, output)
    }

    pub fn disassemble_command(&self, object: &Path) -> Command {
        let mut cmd = Command::new(&self.objdump);
        cmd.arg("-d").arg(object);
        cmd
    }

    pub fn compile_asm(&self, source: &Path, output: &Path) -> Result<()> {
        run(self.asm_command(source, output)).map(|_| ())
    }

    pub fn compile_object(&self, source: &Path, output: &Path) -> Result<()> {
        run(self.object_command(source, output)).map(|_| ())
    }

    /// Disassembly of `object`, as printed by objdump
    pub fn disassemble(&self, object: &Path) -> Result<String> {
        run(self.disassemble_command(object))
    }
}

/// Shell-style rendering of a command, for logs and error messages
pub fn command_line(cmd: &Command) -> String {
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run to completion, returning stdout; a nonzero exit is an error
/// carrying both output streams.
fn run(mut cmd: Command) -> Result<String> {
    let line = command_line(&cmd);
    log::debug!("running {}", line);

    let output = cmd.output().map_err(|source| Error::Spawn {
        program: cmd.get_program().to_string_lossy().to_string(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Toolchain {
            command: line,
            status: output.status,
            output: format!("{}{}", stdout, stderr),
        });
    }
    Ok(stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Os;
    use test_log::test;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_x86_64_asm_command() {
        let tc = Toolchain::new(Target::new(Arch::X86_64, Os::Linux));
        let cmd = tc.asm_command(Path::new("f.c"), Path::new("f.s"));
        assert_eq!(cmd.get_program(), "clang");
        assert_eq!(
            args(&cmd),
            vec![
                "-O3",
                "-mavx2",
                "-mfma",
                "-mno-red-zone",
                "-mstackrealign",
                "-mllvm",
                "-inline-threshold=1000",
                "-fno-asynchronous-unwind-tables",
                "-fno-exceptions",
                "-fno-rtti",
                "-S",
                "f.c",
                "-o",
                "f.s"
            ]
        );
    }

    #[test]
    fn test_aarch64_skips_x86_flags() {
        let tc = Toolchain::new(Target::new(Arch::Aarch64, Os::Linux)).with_clang("clang-18");
        let cmd = tc.object_command(Path::new("f.c"), Path::new("f.o"));
        assert_eq!(cmd.get_program(), "clang-18");
        let a = args(&cmd);
        assert!(!a.iter().any(|f| f == "-mavx2"));
        assert!(a.iter().any(|f| f == "-c"));
        assert_eq!(a.last().map(String::as_str), Some("f.o"));
    }

    #[test]
    fn test_forwards_preprocessor_options() {
        let config = Config::for_target(Target::new(Arch::Aarch64, Os::Linux))
            .with_include_path("inc")
            .with_define("WITH_SUM")
            .with_define("LEVEL=2")
            .with_undef("NDEBUG");
        let tc = Toolchain::for_config(&config);
        let cmd = tc.asm_command(Path::new("m.c"), Path::new("m.s"));
        let a = args(&cmd);

        let mode = a.iter().position(|f| f == "-S").unwrap();
        assert_eq!(
            a[mode - 5..mode],
            ["-DWITH_SUM", "-DLEVEL=2", "-UNDEBUG", "-I", "inc"]
        );
        assert_eq!(a[mode + 1..], ["m.c", "-o", "m.s"]);
        assert!(!a.iter().any(|f| f == "/usr/include"));
    }

    #[test]
    fn test_disassemble_command() {
        let tc = Toolchain::new(Target::host());
        let cmd = tc.disassemble_command(Path::new("f.o"));
        assert_eq!(command_line(&cmd), "objdump -d f.o");
    }

    #[test]
    fn test_missing_program() {
        let tc = Toolchain::new(Target::host()).with_objdump("/nonexistent/ccgo-objdump");
        let err = tc.disassemble(Path::new("f.o")).unwrap_err();
        assert!(matches!(err, Error::Spawn { .. }));
        assert!(err.to_string().starts_with("/nonexistent/ccgo-objdump: "));
    }

    #[test]
    fn test_failing_program() {
        let tc = Toolchain::new(Target::host()).with_objdump("false");
        let err = tc.disassemble(Path::new("f.o")).unwrap_err();
        assert!(matches!(err, Error::Toolchain { .. }));
        assert!(err.pos().is_none());
    }
}
