//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Source positions, stream registry and fatal diagnostics for ccgo
//

use crate::error::Error;
use std::cell::RefCell;
use std::fmt;
use std::io::{self, Write};

// ============================================================================
// Source Position
// ============================================================================

/// Source position attached to every token and declaration node.
///
/// Besides file, line and column, the lexer records whether the token
/// started a line or followed whitespace; the preprocessor relies on both
/// to find directives and function-like macro definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Stream (file) index in the registry
    pub stream: u16,
    /// Line number (1-based)
    pub line: u32,
    /// Column (1-based, 0 means unknown)
    pub col: u16,
    /// Token preceded by newline
    pub newline: bool,
    /// Token preceded by whitespace
    pub whitespace: bool,
}

impl Position {
    pub fn new(stream: u16, line: u32, col: u16) -> Self {
        Self {
            stream,
            line,
            col,
            newline: false,
            whitespace: false,
        }
    }

    /// Name of the file this position points into
    pub fn file_name(&self) -> String {
        stream_name(self.stream)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = prettify_path(&self.file_name());
        if self.col > 0 {
            write!(f, "{}:{}:{}", name, self.line, self.col)
        } else {
            write!(f, "{}:{}", name, self.line)
        }
    }
}

// ============================================================================
// Stream Registry
// ============================================================================

/// One input file: the main source or something pulled in by #include
#[derive(Debug, Clone)]
pub struct Stream {
    pub name: String,
    /// Embedded header shipped inside the binary
    pub builtin: bool,
}

#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: Vec<Stream>,
}

impl StreamRegistry {
    pub fn add(&mut self, stream: Stream) -> u16 {
        let id = self.streams.len() as u16;
        self.streams.push(stream);
        id
    }

    pub fn get(&self, id: u16) -> Option<&Stream> {
        self.streams.get(id as usize)
    }

    pub fn clear(&mut self) {
        self.streams.clear();
    }
}

thread_local! {
    static STREAMS: RefCell<StreamRegistry> = RefCell::new(StreamRegistry::default());
}

/// Register the main source file, returning its stream id
pub fn init_stream(name: &str) -> u16 {
    STREAMS.with(|s| {
        s.borrow_mut().add(Stream {
            name: name.to_string(),
            builtin: false,
        })
    })
}

/// Register a file reached through #include
pub fn init_included_stream(name: &str, builtin: bool) -> u16 {
    STREAMS.with(|s| {
        s.borrow_mut().add(Stream {
            name: name.to_string(),
            builtin,
        })
    })
}

pub fn stream_name(id: u16) -> String {
    STREAMS.with(|s| {
        s.borrow()
            .get(id)
            .map(|st| st.name.clone())
            .unwrap_or_else(|| "<unknown>".to_string())
    })
}

pub fn is_builtin_stream(id: u16) -> bool {
    STREAMS.with(|s| s.borrow().get(id).is_some_and(|st| st.builtin))
}

/// Forget every registered stream (start of a new run)
pub fn clear_streams() {
    STREAMS.with(|s| s.borrow_mut().clear());
}

// ============================================================================
// Diagnostic Output
// ============================================================================

/// Strip a leading ./ from a path
fn prettify_path(path: &str) -> String {
    path.strip_prefix("./")
        .map(|s| s.to_string())
        .unwrap_or_else(|| path.to_string())
}

/// Format a positioned error line (without trailing newline)
pub fn format_error(pos: Position, msg: &str) -> String {
    format!("{}: error: {}", pos, msg)
}

/// Print a positioned error message to stderr
pub fn error(pos: Position, msg: &str) {
    let _ = writeln!(io::stderr(), "{}", format_error(pos, msg));
}

/// Report the first failure of a run and terminate with status 1.
///
/// Positioned errors use the `file:line:col: error: msg` form; the rest
/// are prefixed with the utility name.
pub fn fatal(err: &Error) -> ! {
    match err.pos() {
        Some(pos) => error(pos, &err.to_string()),
        None => {
            let _ = writeln!(io::stderr(), "ccgo: {}", err);
        }
    }
    std::process::exit(1)
}

// ============================================================================
// Tests
// ============================================================================
