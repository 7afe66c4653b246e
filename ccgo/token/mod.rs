//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Token module - lexer and preprocessor
//

pub mod lexer;
pub mod preprocess;

pub use lexer::{show_token, Token, TokenType, TokenValue, Tokenizer};
pub use preprocess::Preprocessor;
