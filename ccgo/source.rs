//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Source file front end for ccgo: read, tokenize, preprocess, parse
//

use std::fs;
use std::path::PathBuf;

use crate::config::Config;
use crate::diag;
use crate::error::{Error, Result};
use crate::parse::ast::TranslationUnit;
use crate::parse::Parser;
use crate::strings::StringTable;
use crate::symbol::SymbolTable;
use crate::token::{Preprocessor, Token, Tokenizer};

/// One parsed input file and the tables its AST refers to
#[derive(Debug)]
pub struct SourceFile {
    pub path: String,
    /// Stream id of `path` in the diagnostic registry
    pub stream: u16,
    pub strings: StringTable,
    pub unit: TranslationUnit,
    pub symbols: SymbolTable,
}

/// Preprocessed token stream of `path`
///
/// Resets the stream registry, so positions from an earlier run must
/// not be formatted afterwards.
pub fn preprocess_file(
    path: &str,
    config: &Config,
    strings: &mut StringTable,
) -> Result<(u16, Vec<Token>)> {
    let buffer = fs::read(path).map_err(|source| Error::Io {
        path: PathBuf::from(path),
        source,
    })?;

    diag::clear_streams();
    let stream = diag::init_stream(path);

    let tokens = Tokenizer::new(&buffer, stream, strings).tokenize()?;

    let mut pp = Preprocessor::new(&config.target, path, &config.search_paths());
    for def in &config.defines {
        pp.define_from_arg(def, strings)?;
    }
    for name in &config.undefines {
        pp.undef_macro(name);
    }

    let tokens = pp.preprocess(tokens, strings)?;
    Ok((stream, tokens))
}

/// Parse `path` into an AST and file scope table
pub fn parse_file(path: &str, config: &Config) -> Result<SourceFile> {
    let mut strings = StringTable::new();
    let (stream, tokens) = preprocess_file(path, config, &mut strings)?;

    let mut symbols = SymbolTable::new();
    let unit = Parser::new(&tokens, &strings, &mut symbols).parse_translation_unit()?;
    log::debug!(
        "{}: {} external declarations, {} identifiers",
        path,
        unit.items.len(),
        symbols.len()
    );

    Ok(SourceFile {
        path: path.to_string(),
        stream,
        strings,
        unit,
        symbols,
    })
}
