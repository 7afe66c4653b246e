//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Integration test harness for ccgo
//
// - cli/: the ccgo binary (extraction output, diagnostics, -E, toolchain)
// - api.rs: the library entry point
//

mod cli;
mod common;
