//
// Copyright (c) 2024 Hemi Labs, Inc.
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Run a workspace binary and check what it printed
//

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output, Stdio};

/// One invocation of a workspace binary and its expected result
pub struct TestPlan {
    pub cmd: String,
    pub args: Vec<String>,
    pub stdin_data: String,
    pub expected_out: String,
    pub expected_err: String,
    pub expected_exit_code: i32,
}

/// Path of `cmd` in the workspace target directory.
///
/// Tests run from the package directory, one level below the workspace
/// root.
pub fn bin_path(cmd: &str) -> PathBuf {
    let profile = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };
    let cwd = std::env::current_dir().expect("no current directory");
    let root = cwd.parent().unwrap_or(&cwd);
    root.join("target").join(profile).join(cmd)
}

/// Run `cmd` with `args`, feeding `stdin_data`, and collect its output
pub fn run_test_base(cmd: &str, args: &[String], stdin_data: &[u8]) -> Output {
    let mut child = Command::new(bin_path(cmd))
        .args(args)
        .env_remove("RUST_LOG")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap_or_else(|e| panic!("failed to spawn {cmd}: {e}"));

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(stdin_data) {
            eprintln!("{cmd}: error writing stdin: {e}");
        }
    }

    child.wait_with_output().expect("failed to wait for child")
}

/// Run the plan and assert stdout, stderr and exit status all match
pub fn run_test(plan: TestPlan) {
    run_test_with_checker(plan, |plan, output| {
        assert_eq!(String::from_utf8_lossy(&output.stdout), plan.expected_out);
        assert_eq!(String::from_utf8_lossy(&output.stderr), plan.expected_err);
        assert_eq!(output.status.code(), Some(plan.expected_exit_code));
    });
}

/// Run the plan and hand the raw output to `checker`
pub fn run_test_with_checker<F: FnMut(&TestPlan, &Output)>(plan: TestPlan, mut checker: F) {
    let output = run_test_base(&plan.cmd, &plan.args, plan.stdin_data.as_bytes());
    checker(&plan, &output);
}
