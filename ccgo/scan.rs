//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Declaration scanner for ccgo
//
// Picks the function declarators that belong to the input file out of
// the file scope table.
//

use crate::diag;
use crate::parse::ast::{Declarator, TranslationUnit};
use crate::strings::StringTable;
use crate::symbol::{SymbolKind, SymbolTable};

/// Select the function declarators declared exactly once in `target_path`.
///
/// Identifiers with more than one declaring node (a prototype followed by
/// its definition, or a plain redeclaration) are skipped, as are nodes
/// whose position lies in an included file. The result is ordered by
/// line, then column.
pub fn scan_functions<'u>(
    unit: &'u TranslationUnit,
    symbols: &SymbolTable,
    strings: &StringTable,
    target_path: &str,
) -> Vec<&'u Declarator> {
    let mut found = Vec::new();

    for (name, decls) in symbols.entries() {
        let name = strings.get(name);

        let [sym] = decls else {
            log::debug!("skipping '{}': {} declaring nodes", name, decls.len());
            continue;
        };

        if diag::is_builtin_stream(sym.pos.stream) || diag::stream_name(sym.pos.stream) != target_path
        {
            continue;
        }

        if sym.kind == SymbolKind::Typedef {
            continue;
        }

        match unit.declarator(sym.decl.item, sym.decl.declarator) {
            Some(decl) if decl.is_function() => found.push(decl),
            Some(_) => {}
            None => log::debug!("{}: '{}' has no declarator", sym.pos, name),
        }
    }

    found.sort_by_key(|decl| (decl.pos.line, decl.pos.col));
    found
}
