//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// ccgo -E: preprocessed token stream
//

use crate::common::{ccgo_test, write_file};
use tempfile::TempDir;

#[test]
fn preprocess_macros_and_lines() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "pp.c",
        "#define N 4\n#define DECL(name) void name(float *v, int64_t n)\nDECL(fill);\nint width = N;\n",
    );
    ccgo_test(
        &["-E", "--nostdinc", &path],
        "void fill(float *v, int64_t n);\nint width = 4;\n",
        "",
        0,
    );
}

#[test]
fn preprocess_conditionals_and_defines() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "cond.c",
        "#if defined(FAST) && LEVEL > 1\nint fast;\n#elif defined(FAST)\nint medium;\n#else\nint slow;\n#endif\n",
    );
    ccgo_test(&["-E", &path], "int slow;\n", "", 0);
    ccgo_test(&["-E", "-D", "FAST", &path], "int medium;\n", "", 0);
    ccgo_test(
        &["-E", "-D", "FAST", "-D", "LEVEL=2", &path],
        "int fast;\n",
        "",
        0,
    );
}

#[test]
fn preprocess_does_not_validate() {
    // -E stops before extraction, so float parameters are fine
    ccgo_test(
        &["-E", "--nostdinc", "tests/fixtures/bad.c"],
        "void bad(float x);\n",
        "",
        0,
    );
}
