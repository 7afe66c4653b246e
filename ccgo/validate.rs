//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Parameter validation for ccgo
//

use std::collections::BTreeSet;

use crate::diag::Position;
use crate::error::UnsupportedParameter;
use crate::parse::ast::{Derivation, ParameterDeclaration};
use crate::strings::StringTable;

/// What the validator needs to know about one parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: Option<String>,
    /// Type specifiers joined by spaces, qualifiers dropped
    pub type_name: String,
    /// Pointer, or an array or function adjusted to one
    pub is_pointer: bool,
    pub pos: Position,
}

impl ParameterInfo {
    pub fn from_declaration(param: &ParameterDeclaration, strings: &StringTable) -> Self {
        let is_pointer = matches!(
            param.declarator.derivation(),
            Derivation::Pointer | Derivation::Array | Derivation::Function
        );
        Self {
            name: param.declarator.name().map(|id| strings.get(id).to_string()),
            type_name: param.specifiers.type_name(),
            is_pointer,
            pos: param.pos,
        }
    }
}

/// Type acceptance policy: pointers always pass, scalars only when their
/// type name is in the allowed set.
#[derive(Debug)]
pub struct Validator<'a> {
    allowed: &'a BTreeSet<String>,
}

impl<'a> Validator<'a> {
    pub fn new(allowed: &'a BTreeSet<String>) -> Self {
        Self { allowed }
    }

    fn is_allowed(&self, type_name: &str) -> bool {
        self.allowed.contains(type_name)
    }

    pub fn check(&self, param: &ParameterInfo) -> Result<(), UnsupportedParameter> {
        if !param.is_pointer && !self.is_allowed(&param.type_name) {
            return Err(UnsupportedParameter::UnsupportedType {
                type_name: param.type_name.clone(),
                pos: param.pos,
            });
        }
        if param.name.is_none() {
            return Err(UnsupportedParameter::UnnamedParameter { pos: param.pos });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allowed() -> BTreeSet<String> {
        BTreeSet::from(["int64_t".to_string()])
    }

    fn param(name: Option<&str>, type_name: &str, is_pointer: bool) -> ParameterInfo {
        ParameterInfo {
            name: name.map(str::to_string),
            type_name: type_name.to_string(),
            is_pointer,
            pos: Position::new(0, 1, 10),
        }
    }

    #[test]
    fn test_allowed_scalar() {
        let allowed = allowed();
        let v = Validator::new(&allowed);
        assert!(v.check(&param(Some("n"), "int64_t", false)).is_ok());
    }

    #[test]
    fn test_pointer_always_passes() {
        let allowed = allowed();
        let v = Validator::new(&allowed);
        assert!(v.check(&param(Some("x"), "double", true)).is_ok());
        assert!(v.check(&param(Some("s"), "struct point", true)).is_ok());
    }

    #[test]
    fn test_rejected_scalar() {
        let allowed = allowed();
        let v = Validator::new(&allowed);
        let err = v.check(&param(Some("x"), "float", false)).unwrap_err();
        assert_eq!(err.to_string(), "unsupported type: float");
        assert_eq!(err.pos(), Position::new(0, 1, 10));
    }

    #[test]
    fn test_type_checked_before_name() {
        let allowed = allowed();
        let v = Validator::new(&allowed);
        assert!(matches!(
            v.check(&param(None, "int", false)),
            Err(UnsupportedParameter::UnsupportedType { .. })
        ));
        assert!(matches!(
            v.check(&param(None, "int64_t", false)),
            Err(UnsupportedParameter::UnnamedParameter { .. })
        ));
    }

    #[test]
    fn test_custom_allowed_set() {
        let allowed = BTreeSet::from(["unsigned long".to_string(), "int".to_string()]);
        let v = Validator::new(&allowed);
        assert!(v.check(&param(Some("a"), "unsigned long", false)).is_ok());
        assert!(v.check(&param(Some("b"), "int64_t", false)).is_err());
    }
}
