//
// Copyright (c) 2024 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Shared helpers for the workspace's integration tests
//

pub mod testing;

pub const PROJECT_NAME: &str = "posixutils-rs";

pub use testing::*;
