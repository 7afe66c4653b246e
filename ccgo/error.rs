//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Error types for ccgo
//

use crate::diag::Position;
use std::path::PathBuf;

/// Lexical, preprocessing or syntax failure in the source file
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub pos: Position,
}

impl ParseError {
    pub fn new(message: impl Into<String>, pos: Position) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }
}

/// A parameter that cannot be expressed by the binding generator
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UnsupportedParameter {
    #[error("unsupported type: {type_name}")]
    UnsupportedType { type_name: String, pos: Position },
    #[error("parameter name omitted")]
    UnnamedParameter { pos: Position },
    #[error("variadic function '{function}' is not supported")]
    Variadic { function: String, pos: Position },
}

impl UnsupportedParameter {
    pub fn pos(&self) -> Position {
        match self {
            Self::UnsupportedType { pos, .. }
            | Self::UnnamedParameter { pos }
            | Self::Variadic { pos, .. } => *pos,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] UnsupportedParameter),
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{command} failed with {status}\n{output}")]
    Toolchain {
        command: String,
        status: std::process::ExitStatus,
        output: String,
    },
}

impl Error {
    /// Source position for errors that point into the input
    pub fn pos(&self) -> Option<Position> {
        match self {
            Error::Parse(e) => Some(e.pos),
            Error::Validation(e) => Some(e.pos()),
            Error::Io { .. } | Error::Spawn { .. } | Error::Toolchain { .. } => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
