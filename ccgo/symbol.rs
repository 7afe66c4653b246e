//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// File scope table for ccgo
//
// Maps each ordinary identifier declared at file scope to every node
// that declared it. Redeclarations are recorded, not merged, so callers
// can tell a unique declaration from a repeated one.
//

use crate::diag::Position;
use crate::strings::StringId;
use std::collections::{HashMap, HashSet};

// ============================================================================
// Symbol
// ============================================================================

/// What kind of entity a declaring node introduces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Function,
    Variable,
    Typedef,
}

/// Location of a declarator in the translation unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclRef {
    /// Index into `TranslationUnit::items`
    pub item: usize,
    /// Index into that item's declarators
    pub declarator: usize,
}

/// One declaring node of an identifier
#[derive(Debug, Clone, Copy)]
pub struct Symbol {
    pub name: StringId,
    pub kind: SymbolKind,
    pub decl: DeclRef,
    pub pos: Position,
}

// ============================================================================
// Symbol Table
// ============================================================================

#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<StringId, Vec<Symbol>>,
    typedefs: HashSet<StringId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a declaring node for `sym.name`
    pub fn declare(&mut self, sym: Symbol) {
        if sym.kind == SymbolKind::Typedef {
            self.typedefs.insert(sym.name);
        } else {
            // an ordinary declaration hides a typedef of the same name
            self.typedefs.remove(&sym.name);
        }
        self.entries.entry(sym.name).or_default().push(sym);
    }

    /// All declaring nodes of `name`, in declaration order
    pub fn lookup(&self, name: StringId) -> &[Symbol] {
        self.entries.get(&name).map_or(&[][..], |v| v.as_slice())
    }

    pub fn is_typedef(&self, name: StringId) -> bool {
        self.typedefs.contains(&name)
    }

    /// Iterate over (identifier, declaring nodes); order is unspecified
    pub fn entries(&self) -> impl Iterator<Item = (StringId, &[Symbol])> {
        self.entries.iter().map(|(name, syms)| (*name, syms.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
