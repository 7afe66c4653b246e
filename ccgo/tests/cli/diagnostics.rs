//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Fatal diagnostics: one positioned line on stderr, exit status 1
//

use crate::common::{ccgo_test, run_ccgo, write_file};
use tempfile::TempDir;

#[test]
fn diag_unsupported_type() {
    ccgo_test(
        &["--nostdinc", "tests/fixtures/bad.c"],
        "",
        "tests/fixtures/bad.c:1:10: error: unsupported type: float\n",
        1,
    );
}

#[test]
fn diag_first_failure_only() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        &dir,
        "two.c",
        "#include <stdint.h>\nvoid ok(int64_t a);\nvoid first(int64_t a, char c);\nvoid second(float f);\n",
    );
    let (stdout, stderr, code) = run_ccgo(&["--nostdinc", &path]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty(), "no signatures on failure: {}", stdout);
    assert_eq!(
        stderr,
        format!("{}:3:23: error: unsupported type: char\n", path)
    );
}

#[test]
fn diag_unnamed_and_variadic() {
    let dir = TempDir::new().unwrap();
    let path = write_file(&dir, "unnamed.c", "void f(float *);\n");
    let (_, stderr, code) = run_ccgo(&["--nostdinc", &path]);
    assert_eq!(code, 1);
    assert_eq!(
        stderr,
        format!("{}:1:8: error: parameter name omitted\n", path)
    );

    let path = write_file(&dir, "variadic.c", "void logv(const char *fmt, ...);\n");
    let (_, stderr, code) = run_ccgo(&["--nostdinc", &path]);
    assert_eq!(code, 1);
    assert_eq!(
        stderr,
        format!(
            "{}:1:28: error: variadic function 'logv' is not supported\n",
            path
        )
    );
}

#[test]
fn diag_parse_errors() {
    let dir = TempDir::new().unwrap();

    let path = write_file(&dir, "semi.c", "int a\nint b;\n");
    let (_, stderr, code) = run_ccgo(&["--nostdinc", &path]);
    assert_eq!(code, 1);
    assert_eq!(
        stderr,
        format!("{}:2:1: error: expected ';' after top level declarator\n", path)
    );

    let path = write_file(&dir, "type.c", "void f(vec4 v);\n");
    let (_, stderr, _) = run_ccgo(&["--nostdinc", &path]);
    assert_eq!(
        stderr,
        format!("{}:1:8: error: unknown type name 'vec4'\n", path)
    );

    let path = write_file(&dir, "comment.c", "int x; /* never closed\n");
    let (stdout, stderr, code) = run_ccgo(&["--nostdinc", &path]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(stderr.starts_with(&format!("{}:1:8: error: ", path)), "{}", stderr);
}

#[test]
fn diag_preprocessor_errors() {
    let dir = TempDir::new().unwrap();

    let path = write_file(&dir, "inc.c", "#include \"missing.h\"\n");
    let (_, stderr, code) = run_ccgo(&["--nostdinc", &path]);
    assert_eq!(code, 1);
    assert_eq!(
        stderr,
        format!("{}:1:1: error: 'missing.h' file not found\n", path)
    );

    let path = write_file(&dir, "err.c", "#ifndef READY\n#error not ready\n#endif\n");
    let (_, stderr, code) = run_ccgo(&["--nostdinc", &path]);
    assert_eq!(code, 1);
    assert_eq!(stderr, format!("{}:2:1: error: #error not ready\n", path));

    let (stdout, _, code) = run_ccgo(&["--nostdinc", "-D", "READY", &path]);
    assert_eq!(code, 0);
    assert!(stdout.is_empty());
}

#[test]
fn diag_error_in_header_points_into_header() {
    let dir = TempDir::new().unwrap();
    let header = write_file(&dir, "broken.h", "int broken int;\n");
    let path = write_file(&dir, "main.c", "#include \"broken.h\"\nint ok(void);\n");
    let (_, stderr, code) = run_ccgo(&["--nostdinc", &path]);
    assert_eq!(code, 1);
    assert!(stderr.starts_with(&format!("{}:", header)), "{}", stderr);
}

#[test]
fn diag_missing_input() {
    let (stdout, stderr, code) = run_ccgo(&["/nonexistent/ccgo/input.c"]);
    assert_eq!(code, 1);
    assert!(stdout.is_empty());
    assert!(
        stderr.starts_with("ccgo: /nonexistent/ccgo/input.c: "),
        "{}",
        stderr
    );
}
