//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// ccgo - extract C function signatures for binding generation
//
// Pipeline: source (tokenize, preprocess, parse) -> scan -> extract,
// with every parameter checked by validate before its name is taken.
//

pub mod builtin_headers;
pub mod config;
pub mod diag;
pub mod error;
pub mod extract;
pub mod parse;
pub mod scan;
pub mod source;
pub mod strings;
pub mod symbol;
pub mod target;
pub mod token;
pub mod toolchain;
pub mod validate;

pub use config::Config;
pub use error::{Error, ParseError, Result, UnsupportedParameter};
pub use extract::Function;

use validate::Validator;

/// Extract the bindable functions declared in `path`, in source order.
///
/// Fails on the first parse error or rejected parameter; no partial
/// list is returned.
pub fn parse_functions(path: &str, config: &Config) -> Result<Vec<Function>> {
    let src = source::parse_file(path, config)?;
    let decls = scan::scan_functions(&src.unit, &src.symbols, &src.strings, &src.path);
    log::debug!("{}: {} candidate functions", path, decls.len());

    let validator = Validator::new(&config.allowed_types);
    let functions = extract::extract_functions(&decls, &src.strings, &validator)?;
    Ok(functions)
}
