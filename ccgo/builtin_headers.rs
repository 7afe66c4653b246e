//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Builtin headers for ccgo
//
// Fallback copies of the few freestanding headers binding sources
// usually include. They are consulted only after every include
// directory has been searched, so a host's real headers always win.
//

pub const STDDEF_H: &str = include_str!("include/stddef.h");

pub const STDINT_H: &str = include_str!("include/stdint.h");

pub const STDBOOL_H: &str = include_str!("include/stdbool.h");

pub const STDARG_H: &str = include_str!("include/stdarg.h");

/// Look up a builtin header by the name used in the #include directive
pub fn get_builtin_header(name: &str) -> Option<&'static str> {
    match name {
        "stddef.h" => Some(STDDEF_H),
        "stdint.h" => Some(STDINT_H),
        "stdbool.h" => Some(STDBOOL_H),
        "stdarg.h" => Some(STDARG_H),
        _ => None,
    }
}
