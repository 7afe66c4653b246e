//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Toolchain stages after extraction
//

use crate::common::run_ccgo;

#[test]
fn toolchain_not_run_on_validation_failure() {
    let dir = tempfile::TempDir::new().unwrap();
    let asm = dir.path().join("bad.s");
    let asm_arg = asm.to_string_lossy().to_string();

    let (stdout, stderr, code) =
        run_ccgo(&["--nostdinc", "-S", &asm_arg, "tests/fixtures/bad.c"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert_eq!(
        stderr,
        "tests/fixtures/bad.c:1:10: error: unsupported type: float\n"
    );
    assert!(!asm.exists());
}

#[test]
fn toolchain_disassemble_requires_object() {
    let (_, _, code) = run_ccgo(&["--disassemble", "tests/fixtures/floats.c"]);
    assert_eq!(code, 2);
}
