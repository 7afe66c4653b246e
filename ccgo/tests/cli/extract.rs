//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Signature extraction through the ccgo binary
//

use crate::common::{ccgo_test, run_ccgo, write_file};
use tempfile::TempDir;

#[test]
fn extract_fixture_in_declaration_order() {
    ccgo_test(
        &["--nostdinc", "tests/fixtures/floats.c"],
        "mul_const_add_to(a, b, c, n)\nmul_const_to(a, b, c, n)\nmul_const(a, b, n)\nmul_to(a, b, c, n)\ndot(a, b, n, ret)\n",
        "",
        0,
    );
}

#[test]
fn extract_skips_header_and_redeclared() {
    // clear() is declared in kernels.h and defined in kernels.c
    ccgo_test(
        &["--nostdinc", "tests/fixtures/kernels.c"],
        "square(x)\nsum_squares(a, n, ret)\nchecksum(n, data, ret)\n",
        "",
        0,
    );
}

#[test]
fn extract_add_and_scale() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "ops.c",
        "#include <stdint.h>\nint64_t add(int64_t a, int64_t b);\nvoid scale(double *x, int64_t n);\nvoid reset(void);\nint64_t now();\n",
    );
    ccgo_test(
        &["--nostdinc", &path],
        "add(a, b)\nscale(x, n)\nreset()\nnow()\n",
        "",
        0,
    );
}

#[test]
fn extract_verbose_positions() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "v.c",
        "#include <stdint.h>\n\nint64_t add(int64_t a, int64_t b);\n",
    );
    let (stdout, stderr, code) = run_ccgo(&["--nostdinc", "-v", &path]);
    assert_eq!(code, 0, "ccgo failed: {}", stderr);
    assert_eq!(stdout, format!("{}:3:9: add(a, b)\n", path));
}

#[test]
fn extract_allow_type() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "t.c", "void f(unsigned long n, double d);\n");

    let (stdout, _, code) = run_ccgo(&[
        "--nostdinc",
        "--allow-type",
        "unsigned long",
        "--allow-type",
        "double",
        &path,
    ]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "f(n, d)\n");

    // replacing the set drops int64_t
    let path = write_file(&dir, "u.c", "#include <stdint.h>\nvoid g(int64_t n);\n");
    let (stdout, stderr, code) = run_ccgo(&["--nostdinc", "--allow-type", "double", &path]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert_eq!(
        stderr,
        format!("{}:2:8: error: unsupported type: int64_t\n", path)
    );
}

#[test]
fn extract_include_path_and_defines() {
    let dir = TempDir::new().unwrap();
    let inc = dir.path().join("inc");
    std::fs::create_dir(&inc).unwrap();
    std::fs::write(
        inc.join("types.h"),
        "#include <stdint.h>\ntypedef int64_t idx_t;\n#define API\n",
    )
    .unwrap();
    let path = write_file(
        &dir,
        "m.c",
        "#include <types.h>\nAPI void fill(float *v, int64_t n);\n#ifdef WITH_SUM\nAPI void sum(float *v, int64_t n, float *out);\n#endif\n",
    );
    let inc = inc.to_string_lossy().to_string();

    let (stdout, stderr, code) = run_ccgo(&["--nostdinc", "-I", &inc, &path]);
    assert_eq!(code, 0, "ccgo failed: {}", stderr);
    assert_eq!(stdout, "fill(v, n)\n");

    let (stdout, _, code) = run_ccgo(&["--nostdinc", "-I", &inc, "-D", "WITH_SUM", &path]);
    assert_eq!(code, 0);
    assert_eq!(stdout, "fill(v, n)\nsum(v, n, out)\n");

    let (stdout, _, _) = run_ccgo(&[
        "--nostdinc",
        "-I",
        &inc,
        "-D",
        "WITH_SUM",
        "-U",
        "WITH_SUM",
        &path,
    ]);
    assert_eq!(stdout, "fill(v, n)\n");
}

#[test]
fn extract_is_deterministic() {
    let dir = TempDir::new().unwrap();
    let src: String = (0..64)
        .map(|i| format!("void k{}(float *a, int64_t n);\n", i))
        .collect();
    let path = write_file(&dir, "many.c", &format!("#include <stdint.h>\n{}", src));

    let first = run_ccgo(&["--nostdinc", &path]);
    let second = run_ccgo(&["--nostdinc", &path]);
    assert_eq!(first.2, 0);
    assert_eq!(first, second);

    let expected: String = (0..64).map(|i| format!("k{}(a, n)\n", i)).collect();
    assert_eq!(first.0, expected);
}

#[test]
fn extract_with_system_headers() {
    // default search path: host include directories, builtin fallback
    ccgo_test(
        &["tests/fixtures/floats.c"],
        "mul_const_add_to(a, b, c, n)\nmul_const_to(a, b, c, n)\nmul_const(a, b, n)\nmul_to(a, b, c, n)\ndot(a, b, n, ret)\n",
        "",
        0,
    );

    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "host.c",
        "#include <stdint.h>\n#include <stdint.h>\nint64_t add(int64_t a, int64_t b);\n",
    );
    ccgo_test(&[&path], "add(a, b)\n", "", 0);
}

#[test]
fn extract_array_and_function_parameters_as_pointers() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "adjusted.c",
        "#include <stdint.h>\nvoid apply(float v[], double m[4][4], int64_t (*fn)(int64_t), int64_t cb(int64_t));\n",
    );
    ccgo_test(&["--nostdinc", &path], "apply(v, m, fn, cb)\n", "", 0);
}
