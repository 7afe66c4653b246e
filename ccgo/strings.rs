//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Identifier interning for ccgo
//
// Every identifier the lexer produces, every macro-generated identifier
// and every declarator name goes through one StringTable, so the parser
// and the scope table compare names by StringId.
//

use std::collections::HashMap;
use std::fmt;

/// Handle to an interned string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StringId(pub u32);

impl StringId {
    /// The empty string, always interned first
    pub const EMPTY: StringId = StringId(0);
}

impl fmt::Display for StringId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// String interner: `map` deduplicates, `strings` resolves ids
pub struct StringTable {
    map: HashMap<String, StringId>,
    strings: Vec<String>,
}

impl StringTable {
    pub fn new() -> Self {
        let mut table = Self {
            map: HashMap::with_capacity(512),
            strings: Vec::with_capacity(512),
        };
        let empty = table.push("");
        debug_assert_eq!(empty, StringId::EMPTY);
        table
    }

    fn push(&mut self, s: &str) -> StringId {
        let id = StringId(self.strings.len() as u32);
        self.strings.push(s.to_string());
        self.map.insert(s.to_string(), id);
        id
    }

    /// Intern a string, reusing the existing id when already present
    pub fn intern(&mut self, s: &str) -> StringId {
        match self.map.get(s) {
            Some(&id) => id,
            None => self.push(s),
        }
    }

    /// Id of an already-interned string, without inserting
    pub fn lookup(&self, s: &str) -> Option<StringId> {
        self.map.get(s).copied()
    }

    /// Resolve an id; unknown ids resolve to the empty string
    pub fn get(&self, id: StringId) -> &str {
        self.strings
            .get(id.0 as usize)
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub fn get_opt(&self, id: StringId) -> Option<&str> {
        self.strings.get(id.0 as usize).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringTable")
            .field("len", &self.strings.len())
            .finish()
    }
}
