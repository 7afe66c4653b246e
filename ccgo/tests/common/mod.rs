//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Common test utilities for ccgo integration tests
//

use plib::testing::{run_test, TestPlan};
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Write `content` to `dir/name`, returning the path as a string
pub fn write_file(dir: &TempDir, name: &str, content: &str) -> String {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("failed to write test file");
    path.to_string_lossy().to_string()
}

fn to_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Run ccgo and compare stdout, stderr and exit status exactly
pub fn ccgo_test(args: &[&str], expected_out: &str, expected_err: &str, expected_exit_code: i32) {
    run_test(TestPlan {
        cmd: String::from("ccgo"),
        args: to_args(args),
        stdin_data: String::new(),
        expected_out: String::from(expected_out),
        expected_err: String::from(expected_err),
        expected_exit_code,
    });
}

/// Run ccgo, returning (stdout, stderr, exit code)
pub fn run_ccgo(args: &[&str]) -> (String, String, i32) {
    let output = Command::new(env!("CARGO_BIN_EXE_ccgo"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to execute ccgo");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}
