//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Declaration AST for ccgo
//
// Only what a file-scope declaration says about its identifiers is kept:
// specifier words, declarator shape and parameter lists. Bodies,
// initializers and array sizes are consumed by the parser and dropped.
//

use crate::diag::Position;
use crate::strings::StringId;

// ============================================================================
// Declaration Specifiers
// ============================================================================

/// Storage class specifiers (C99 6.7.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageClass {
    Typedef,
    Extern,
    Static,
    Auto,
    Register,
    ThreadLocal,
}

/// Declaration specifiers of one declaration or parameter
#[derive(Debug, Clone, Default)]
pub struct DeclSpecifiers {
    pub storage: Option<StorageClass>,
    /// Type specifier words in source order, e.g. `unsigned`, `long`,
    /// `int64_t` or `struct point`
    pub type_specifiers: Vec<String>,
    /// const, volatile, restrict, _Atomic
    pub qualifiers: Vec<String>,
    /// inline, _Noreturn
    pub function_specifiers: Vec<String>,
    /// First token of the specifier list
    pub pos: Position,
}

impl DeclSpecifiers {
    pub fn is_typedef(&self) -> bool {
        self.storage == Some(StorageClass::Typedef)
    }

    /// Type name as written, qualifiers and storage class dropped
    pub fn type_name(&self) -> String {
        self.type_specifiers.join(" ")
    }

    /// Nothing at all was specified
    pub fn is_empty(&self) -> bool {
        self.storage.is_none()
            && self.type_specifiers.is_empty()
            && self.qualifiers.is_empty()
            && self.function_specifiers.is_empty()
    }
}

// ============================================================================
// Declarators
// ============================================================================

/// Outermost type derivation applied to a declared identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derivation {
    /// No derivation: the identifier has the specifier type
    Scalar,
    Pointer,
    Array,
    Function,
}

/// The part of a declarator that names (or omits) the identifier
#[derive(Debug, Clone)]
pub enum DirectDeclarator {
    Ident(StringId),
    /// Abstract declarator, as in `int (*)(void)` or an unnamed parameter
    Abstract,
    /// Parenthesized declarator: `(*fp)` in `int (*fp)(int)`
    Grouped(Box<Declarator>),
}

#[derive(Debug, Clone)]
pub enum DeclaratorSuffix {
    Array,
    Function(ParameterTypeList),
}

/// A declarator: `pointer` stars, a direct part, then array and function
/// suffixes. Suffixes bind tighter than the stars, so `*f(void)` is a
/// function returning a pointer.
#[derive(Debug, Clone)]
pub struct Declarator {
    pub pointer: u32,
    pub direct: DirectDeclarator,
    pub suffixes: Vec<DeclaratorSuffix>,
    /// Identifier position, or the declarator start when abstract
    pub pos: Position,
}

impl Declarator {
    /// Declared identifier, if any
    pub fn name(&self) -> Option<StringId> {
        match &self.direct {
            DirectDeclarator::Ident(id) => Some(*id),
            DirectDeclarator::Abstract => None,
            DirectDeclarator::Grouped(inner) => inner.name(),
        }
    }

    /// Derivation applied first to the identifier
    ///
    /// A grouped declarator that derives anything wins over the outer
    /// suffixes: in `int (*fp)(int)` the identifier is a pointer.
    pub fn derivation(&self) -> Derivation {
        if let DirectDeclarator::Grouped(inner) = &self.direct {
            let inner_derivation = inner.derivation();
            if inner_derivation != Derivation::Scalar {
                return inner_derivation;
            }
        }
        match self.suffixes.first() {
            Some(DeclaratorSuffix::Array) => Derivation::Array,
            Some(DeclaratorSuffix::Function(_)) => Derivation::Function,
            None if self.pointer > 0 => Derivation::Pointer,
            None => Derivation::Scalar,
        }
    }

    /// The identifier itself is a function
    pub fn is_function(&self) -> bool {
        self.derivation() == Derivation::Function
    }

    /// Parameter list of the function this declarator declares
    pub fn function_params(&self) -> Option<&ParameterTypeList> {
        if let DirectDeclarator::Grouped(inner) = &self.direct {
            if inner.derivation() != Derivation::Scalar {
                return inner.function_params();
            }
        }
        match self.suffixes.first() {
            Some(DeclaratorSuffix::Function(params)) => Some(params),
            _ => None,
        }
    }
}

// ============================================================================
// Parameters
// ============================================================================

#[derive(Debug, Clone)]
pub struct ParameterDeclaration {
    pub specifiers: DeclSpecifiers,
    pub declarator: Declarator,
    /// First token of the parameter
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct ParameterTypeList {
    /// Empty for both `()` and `(void)`
    pub params: Vec<ParameterDeclaration>,
    /// Position of a trailing `...`
    pub ellipsis: Option<Position>,
    /// Position of the opening parenthesis
    pub pos: Position,
}

impl ParameterTypeList {
    pub fn is_variadic(&self) -> bool {
        self.ellipsis.is_some()
    }
}

// ============================================================================
// External Declarations
// ============================================================================

/// Declaration at file scope: `int64_t add(int64_t a, int64_t b), x;`
#[derive(Debug, Clone)]
pub struct Declaration {
    pub specifiers: DeclSpecifiers,
    pub declarators: Vec<Declarator>,
}

/// Function definition; the body is skipped, only its position kept
#[derive(Debug, Clone)]
pub struct FunctionDef {
    pub specifiers: DeclSpecifiers,
    pub declarator: Declarator,
    pub body_pos: Position,
}

#[derive(Debug, Clone)]
pub enum ExternalDecl {
    FunctionDef(FunctionDef),
    Declaration(Declaration),
}

impl ExternalDecl {
    pub fn specifiers(&self) -> &DeclSpecifiers {
        match self {
            ExternalDecl::FunctionDef(def) => &def.specifiers,
            ExternalDecl::Declaration(decl) => &decl.specifiers,
        }
    }

    pub fn declarators(&self) -> &[Declarator] {
        match self {
            ExternalDecl::FunctionDef(def) => std::slice::from_ref(&def.declarator),
            ExternalDecl::Declaration(decl) => &decl.declarators,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub items: Vec<ExternalDecl>,
}

impl TranslationUnit {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn add(&mut self, item: ExternalDecl) {
        self.items.push(item);
    }

    /// Declarator `index` of external declaration `item`
    pub fn declarator(&self, item: usize, index: usize) -> Option<&Declarator> {
        self.items.get(item)?.declarators().get(index)
    }
}

impl Default for TranslationUnit {
    fn default() -> Self {
        Self::new()
    }
}
