//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Function signature extraction for ccgo
//

use std::fmt;

use crate::diag::Position;
use crate::error::UnsupportedParameter;
use crate::parse::ast::Declarator;
use crate::strings::StringTable;
use crate::validate::{ParameterInfo, Validator};

/// A bindable function: its name and parameter names in declaration order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
    /// Position of the function name
    pub pos: Position,
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameters.join(", "))
    }
}

/// Build the signature of one function declarator, validating each
/// parameter before its name is taken.
pub fn extract_function(
    decl: &Declarator,
    strings: &StringTable,
    validator: &Validator<'_>,
) -> Result<Function, UnsupportedParameter> {
    let name = decl
        .name()
        .map(|id| strings.get(id).to_string())
        .unwrap_or_default();

    let mut parameters = Vec::new();
    if let Some(list) = decl.function_params() {
        parameters.reserve(list.params.len());
        for param in &list.params {
            let info = ParameterInfo::from_declaration(param, strings);
            validator.check(&info)?;
            if let Some(param_name) = info.name {
                parameters.push(param_name);
            }
        }

        if let Some(pos) = list.ellipsis {
            return Err(UnsupportedParameter::Variadic {
                function: name,
                pos,
            });
        }
    }

    Ok(Function {
        name,
        parameters,
        pos: decl.pos,
    })
}

/// Extract every declarator in order, stopping at the first rejection
pub fn extract_functions(
    decls: &[&Declarator],
    strings: &StringTable,
    validator: &Validator<'_>,
) -> Result<Vec<Function>, UnsupportedParameter> {
    decls
        .iter()
        .map(|decl| extract_function(decl, strings, validator))
        .collect()
}
