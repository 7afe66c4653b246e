//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// C preprocessor for ccgo
//
// Macro expansion, conditional compilation and #include resolution over
// the token stream of one translation unit. Included files are tokenized
// into their own streams so every declaration keeps the position of the
// file it was written in.
//

use std::collections::{HashMap, HashSet};
use std::fs;
use std::iter::Peekable;
use std::path::{Path, PathBuf};

use super::lexer::{show_token, Position, SpecialToken, Token, TokenType, TokenValue, Tokenizer};
use crate::builtin_headers;
use crate::diag;
use crate::error::ParseError;
use crate::strings::StringTable;
use crate::target::Target;

type PResult<T> = Result<T, ParseError>;

const MAX_INCLUDE_DEPTH: u32 = 200;

// ============================================================================
// Macro Definition
// ============================================================================

#[derive(Debug, Clone)]
pub struct Macro {
    pub name: String,
    pub body: Vec<MacroToken>,
    pub is_function: bool,
    /// Named parameters of a function-like macro
    pub params: Vec<String>,
    pub is_variadic: bool,
    pub builtin: Option<BuiltinMacro>,
}

/// A token stored in a macro body
#[derive(Debug, Clone)]
pub struct MacroToken {
    pub typ: TokenType,
    pub value: MacroTokenValue,
    pub whitespace: bool,
}

#[derive(Debug, Clone)]
pub enum MacroTokenValue {
    Number(String),
    Ident(String),
    String(String),
    Char(String),
    Special(u32),
    /// Parameter reference (by index)
    Param(usize),
    /// #param; an index past the named parameters means __VA_ARGS__
    Stringify(usize),
    /// ##
    Paste,
    /// __VA_ARGS__
    VaArgs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinMacro {
    Line,
    File,
    HasAttribute,
    HasBuiltin,
    HasFeature,
    HasInclude,
    HasIncludeNext,
}

impl Macro {
    /// Object-like macro whose replacement is a single number (or nothing)
    pub fn predefined(name: &str, value: Option<&str>) -> Self {
        let body = value
            .map(|v| {
                vec![MacroToken {
                    typ: TokenType::Number,
                    value: MacroTokenValue::Number(v.to_string()),
                    whitespace: false,
                }]
            })
            .unwrap_or_default();
        Self::object(name, body)
    }

    /// Object-like macro that renames a keyword; "" expands to nothing
    pub fn keyword_alias(name: &str, value: &str) -> Self {
        let body = if value.is_empty() {
            vec![]
        } else {
            vec![MacroToken {
                typ: TokenType::Ident,
                value: MacroTokenValue::Ident(value.to_string()),
                whitespace: false,
            }]
        };
        Self::object(name, body)
    }

    pub fn builtin(name: &str, builtin: BuiltinMacro) -> Self {
        let mut mac = Self::object(name, vec![]);
        mac.builtin = Some(builtin);
        mac
    }

    fn object(name: &str, body: Vec<MacroToken>) -> Self {
        Self {
            name: name.to_string(),
            body,
            is_function: false,
            params: vec![],
            is_variadic: false,
            builtin: None,
        }
    }
}

// ============================================================================
// Conditional Compilation State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CondState {
    /// In a true branch, tokens are kept
    Active,
    /// In a false branch that may still become active
    Skipping,
    /// A branch was already taken, skip the rest
    Done,
}

#[derive(Debug, Clone)]
struct Conditional {
    state: CondState,
    had_true: bool,
    seen_else: bool,
    /// Opening directive, for unterminated-conditional errors
    directive: &'static str,
    pos: Position,
}

/// Where an #include resolved to
#[derive(Debug, Clone)]
enum IncludeSource {
    File {
        path: PathBuf,
        /// Index of the search directory that matched, for #include_next
        search_index: Option<usize>,
    },
    Builtin {
        name: String,
        content: &'static str,
    },
}

// ============================================================================
// Preprocessor
// ============================================================================

pub struct Preprocessor {
    macros: HashMap<String, Macro>,
    cond_stack: Vec<Conditional>,

    /// -I directories followed by the system directories
    include_paths: Vec<PathBuf>,

    /// Name of the file being processed (for __FILE__)
    current_file: String,
    current_dir: PathBuf,
    /// Key used for #pragma once
    current_key: PathBuf,
    search_index: Option<usize>,

    include_depth: u32,
    once_files: HashSet<PathBuf>,

    /// Macros currently being expanded (recursion prevention)
    expanding: HashSet<String>,
}

impl Preprocessor {
    pub fn new(target: &Target, filename: &str, include_paths: &[PathBuf]) -> Self {
        let path = Path::new(filename);
        let mut pp = Self {
            macros: HashMap::new(),
            cond_stack: Vec::new(),
            include_paths: include_paths.to_vec(),
            current_file: filename.to_string(),
            current_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
            current_key: path.canonicalize().unwrap_or_else(|_| path.to_path_buf()),
            search_index: None,
            include_depth: 0,
            once_files: HashSet::new(),
            expanding: HashSet::new(),
        };
        pp.init_predefined_macros(target);
        pp
    }

    fn init_predefined_macros(&mut self, target: &Target) {
        self.define_macro(Macro::predefined("__STDC__", Some("1")));
        self.define_macro(Macro::predefined("__STDC_VERSION__", Some("201112L")));

        // enough GCC identity for system headers to take their GNU paths
        self.define_macro(Macro::predefined("__GNUC__", Some("4")));
        self.define_macro(Macro::predefined("__GNUC_MINOR__", Some("2")));
        self.define_macro(Macro::predefined("__GNUC_PATCHLEVEL__", Some("1")));
        self.define_macro(Macro::predefined("__GNUC_STDC_INLINE__", Some("1")));

        for (alias, keyword) in [
            ("__signed", "signed"),
            ("__signed__", "signed"),
            ("__inline", "inline"),
            ("__inline__", "inline"),
            ("__const", "const"),
            ("__const__", "const"),
            ("__volatile", "volatile"),
            ("__volatile__", "volatile"),
            ("__restrict", "restrict"),
            ("__restrict__", "restrict"),
            ("__typeof", "typeof"),
            ("__typeof__", "typeof"),
            ("__attribute", "__attribute__"),
            ("__extension__", ""),
        ] {
            self.define_macro(Macro::keyword_alias(alias, keyword));
        }

        for (name, value) in target.arch_macros().into_iter().chain(target.os_macros()) {
            self.define_macro(Macro::predefined(name, value));
        }

        for (name, builtin) in [
            ("__LINE__", BuiltinMacro::Line),
            ("__FILE__", BuiltinMacro::File),
            ("__has_attribute", BuiltinMacro::HasAttribute),
            ("__has_builtin", BuiltinMacro::HasBuiltin),
            ("__has_feature", BuiltinMacro::HasFeature),
            ("__has_extension", BuiltinMacro::HasFeature),
            ("__has_include", BuiltinMacro::HasInclude),
            ("__has_include_next", BuiltinMacro::HasIncludeNext),
        ] {
            self.define_macro(Macro::builtin(name, builtin));
        }
    }

    pub fn define_macro(&mut self, mac: Macro) {
        self.macros.insert(mac.name.clone(), mac);
    }

    pub fn undef_macro(&mut self, name: &str) {
        self.macros.remove(name);
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Apply a command-line `-D name[=value]`; the value defaults to 1
    pub fn define_from_arg(&mut self, arg: &str, strings: &mut StringTable) -> PResult<()> {
        let (name, value) = arg.split_once('=').unwrap_or((arg, "1"));
        let text = format!("#define {} {}\n", name, value);
        let stream = diag::init_stream("<command line>");
        let tokens = Tokenizer::new(text.as_bytes(), stream, strings).tokenize()?;
        self.process(tokens, strings)?;
        Ok(())
    }

    fn is_skipping(&self) -> bool {
        self.cond_stack
            .last()
            .is_some_and(|c| c.state != CondState::Active)
    }

    /// Preprocess the token stream of the main file
    pub fn preprocess(
        &mut self,
        tokens: Vec<Token>,
        strings: &mut StringTable,
    ) -> PResult<Vec<Token>> {
        self.run_file(tokens, strings)
    }

    /// Process one file with its own conditional stack
    fn run_file(&mut self, tokens: Vec<Token>, strings: &mut StringTable) -> PResult<Vec<Token>> {
        let outer = std::mem::take(&mut self.cond_stack);
        let result = self.process(tokens, strings);
        let unterminated = std::mem::replace(&mut self.cond_stack, outer);
        let output = result?;

        if let Some(cond) = unterminated.last() {
            return Err(ParseError::new(
                format!("unterminated #{}", cond.directive),
                cond.pos,
            ));
        }
        Ok(output)
    }

    fn process(&mut self, tokens: Vec<Token>, strings: &mut StringTable) -> PResult<Vec<Token>> {
        let mut output = Vec::new();
        let mut iter = tokens.into_iter().peekable();

        while let Some(token) = iter.next() {
            match token.typ {
                TokenType::StreamBegin | TokenType::StreamEnd => output.push(token),
                TokenType::Special if token.is_special(b'#' as u32) && token.pos.newline => {
                    self.handle_directive(&mut iter, &token, &mut output, strings)?;
                }
                _ if self.is_skipping() => {}
                TokenType::Ident => match self.try_expand_macro(&token, &mut iter, strings)? {
                    Some(expanded) => output.extend(expanded),
                    None => output.push(token),
                },
                _ => output.push(token),
            }
        }

        Ok(output)
    }

    // ------------------------------------------------------------------------
    // Directives
    // ------------------------------------------------------------------------

    fn handle_directive<I>(
        &mut self,
        iter: &mut Peekable<I>,
        hash: &Token,
        output: &mut Vec<Token>,
        strings: &mut StringTable,
    ) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        // null directive
        let Some(directive_token) = iter.next_if(|t| on_same_line(t)) else {
            return Ok(());
        };

        let directive = match directive_token.ident() {
            Some(id) => strings.get(id).to_string(),
            None => {
                // GNU linemarker: # 12 "file"
                if directive_token.typ == TokenType::Number || self.is_skipping() {
                    self.skip_to_eol(iter);
                    return Ok(());
                }
                return Err(ParseError::new(
                    format!(
                        "invalid preprocessing directive #{}",
                        show_token(&directive_token, strings)
                    ),
                    hash.pos,
                ));
            }
        };

        match directive.as_str() {
            "define" => self.handle_define(iter, hash, strings),
            "undef" => self.handle_undef(iter, strings),
            "ifdef" => self.handle_ifdef(iter, hash, strings, false),
            "ifndef" => self.handle_ifdef(iter, hash, strings, true),
            "if" => self.handle_if(iter, hash, strings),
            "elif" => self.handle_elif(iter, hash, strings),
            "else" => self.handle_else(iter, hash),
            "endif" => self.handle_endif(iter, hash),
            "include" => self.handle_include(iter, output, hash, strings, false),
            "include_next" => self.handle_include(iter, output, hash, strings, true),
            "error" => self.handle_error(iter, hash, strings),
            "warning" => {
                let text = self.collect_to_eol(iter);
                if !self.is_skipping() {
                    log::warn!(
                        "{}: #warning {}",
                        hash.pos,
                        tokens_to_text(&text, strings)
                    );
                }
                Ok(())
            }
            "pragma" => self.handle_pragma(iter, strings),
            "line" | "ident" | "sccs" | "assert" | "unassert" => {
                self.skip_to_eol(iter);
                Ok(())
            }
            _ if self.is_skipping() => {
                self.skip_to_eol(iter);
                Ok(())
            }
            _ => Err(ParseError::new(
                format!("invalid preprocessing directive #{}", directive),
                hash.pos,
            )),
        }
    }

    fn skip_to_eol<I>(&self, iter: &mut Peekable<I>)
    where
        I: Iterator<Item = Token>,
    {
        while iter.next_if(|t| on_same_line(t)).is_some() {}
    }

    fn collect_to_eol<I>(&self, iter: &mut Peekable<I>) -> Vec<Token>
    where
        I: Iterator<Item = Token>,
    {
        let mut tokens = Vec::new();
        while let Some(token) = iter.next_if(|t| on_same_line(t)) {
            tokens.push(token);
        }
        tokens
    }

    fn handle_define<I>(
        &mut self,
        iter: &mut Peekable<I>,
        hash: &Token,
        strings: &StringTable,
    ) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        if self.is_skipping() {
            self.skip_to_eol(iter);
            return Ok(());
        }

        let name = match iter.next_if(|t| on_same_line(t)).and_then(|t| t.ident()) {
            Some(id) => strings.get(id).to_string(),
            None => {
                return Err(ParseError::new(
                    "macro names must be identifiers",
                    hash.pos,
                ))
            }
        };

        let mut params = Vec::new();
        let mut is_function = false;
        let mut is_variadic = false;
        let mut va_name: Option<String> = None;

        // function-like only when '(' follows the name without whitespace
        if iter
            .next_if(|t| on_same_line(t) && !t.pos.whitespace && t.is_special(b'(' as u32))
            .is_some()
        {
            is_function = true;
            loop {
                let Some(tok) = iter.next_if(|t| on_same_line(t)) else {
                    return Err(ParseError::new(
                        "missing ')' in macro parameter list",
                        hash.pos,
                    ));
                };
                match &tok.value {
                    TokenValue::Special(c) if *c == b')' as u32 => break,
                    TokenValue::Special(c) if *c == b',' as u32 => {}
                    TokenValue::Special(c) if *c == SpecialToken::Ellipsis as u32 => {
                        is_variadic = true;
                    }
                    TokenValue::Ident(id) => {
                        let param = strings.get(*id).to_string();
                        // GNU named variadic: args...
                        if iter
                            .next_if(|t| t.is_special(SpecialToken::Ellipsis as u32))
                            .is_some()
                        {
                            is_variadic = true;
                            va_name = Some(param);
                        } else {
                            params.push(param);
                        }
                    }
                    _ => {
                        return Err(ParseError::new(
                            format!(
                                "invalid token '{}' in macro parameter list",
                                show_token(&tok, strings)
                            ),
                            tok.pos,
                        ))
                    }
                }
            }
        }

        let body_tokens = self.collect_to_eol(iter);
        let body = tokens_to_macro_body(
            &body_tokens,
            is_function.then_some(params.as_slice()),
            va_name.as_deref(),
            strings,
        );

        self.define_macro(Macro {
            name,
            body,
            is_function,
            params,
            is_variadic,
            builtin: None,
        });
        Ok(())
    }

    fn handle_undef<I>(&mut self, iter: &mut Peekable<I>, strings: &StringTable) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        if !self.is_skipping() {
            if let Some(id) = iter.next_if(|t| on_same_line(t)).and_then(|t| t.ident()) {
                self.undef_macro(strings.get(id));
            }
        }
        self.skip_to_eol(iter);
        Ok(())
    }

    fn handle_ifdef<I>(
        &mut self,
        iter: &mut Peekable<I>,
        hash: &Token,
        strings: &StringTable,
        negate: bool,
    ) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        let directive = if negate { "ifndef" } else { "ifdef" };
        let name = iter.next_if(|t| on_same_line(t)).and_then(|t| t.ident());
        self.skip_to_eol(iter);

        let condition = if self.is_skipping() {
            false
        } else {
            let Some(id) = name else {
                return Err(ParseError::new(
                    format!("no macro name given in #{} directive", directive),
                    hash.pos,
                ));
            };
            self.is_defined(strings.get(id)) != negate
        };
        self.push_conditional(condition, directive, hash.pos);
        Ok(())
    }

    fn handle_if<I>(
        &mut self,
        iter: &mut Peekable<I>,
        hash: &Token,
        strings: &mut StringTable,
    ) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        let tokens = self.collect_to_eol(iter);
        let value = if self.is_skipping() {
            false
        } else {
            self.evaluate_condition(tokens, hash.pos, strings)?
        };
        self.push_conditional(value, "if", hash.pos);
        Ok(())
    }

    fn handle_elif<I>(
        &mut self,
        iter: &mut Peekable<I>,
        hash: &Token,
        strings: &mut StringTable,
    ) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        let tokens = self.collect_to_eol(iter);

        let Some(cond) = self.cond_stack.last() else {
            return Err(ParseError::new("#elif without #if", hash.pos));
        };
        if cond.seen_else {
            return Err(ParseError::new("#elif after #else", hash.pos));
        }

        let should_eval = cond.state == CondState::Skipping && !cond.had_true;
        let value = if should_eval {
            // enclosing branches are active; expand as if outside this one
            let inner = self.cond_stack.pop();
            let result = self.evaluate_condition(tokens, hash.pos, strings);
            self.cond_stack.extend(inner);
            result?
        } else {
            false
        };

        if let Some(cond) = self.cond_stack.last_mut() {
            match cond.state {
                CondState::Active => {
                    cond.state = CondState::Done;
                    cond.had_true = true;
                }
                CondState::Skipping if value => {
                    cond.state = CondState::Active;
                    cond.had_true = true;
                }
                CondState::Skipping | CondState::Done => {}
            }
        }
        Ok(())
    }

    fn handle_else<I>(&mut self, iter: &mut Peekable<I>, hash: &Token) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        self.skip_to_eol(iter);

        let Some(cond) = self.cond_stack.last_mut() else {
            return Err(ParseError::new("#else without #if", hash.pos));
        };
        if cond.seen_else {
            return Err(ParseError::new("#else after #else", hash.pos));
        }
        cond.seen_else = true;
        if cond.state == CondState::Skipping && !cond.had_true {
            cond.state = CondState::Active;
            cond.had_true = true;
        } else {
            cond.state = CondState::Done;
        }
        Ok(())
    }

    fn handle_endif<I>(&mut self, iter: &mut Peekable<I>, hash: &Token) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        self.skip_to_eol(iter);
        match self.cond_stack.pop() {
            Some(_) => Ok(()),
            None => Err(ParseError::new("#endif without #if", hash.pos)),
        }
    }

    fn push_conditional(&mut self, condition: bool, directive: &'static str, pos: Position) {
        let parent_skipping = self.is_skipping();
        let state = if !parent_skipping && condition {
            CondState::Active
        } else {
            CondState::Skipping
        };
        self.cond_stack.push(Conditional {
            state,
            // a skipped parent keeps every branch of this one inactive
            had_true: parent_skipping || condition,
            seen_else: false,
            directive,
            pos,
        });
    }

    fn handle_error<I>(
        &mut self,
        iter: &mut Peekable<I>,
        hash: &Token,
        strings: &StringTable,
    ) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        let tokens = self.collect_to_eol(iter);
        if self.is_skipping() {
            return Ok(());
        }
        Err(ParseError::new(
            format!("#error {}", tokens_to_text(&tokens, strings)),
            hash.pos,
        ))
    }

    fn handle_pragma<I>(&mut self, iter: &mut Peekable<I>, strings: &StringTable) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        let tokens = self.collect_to_eol(iter);
        if self.is_skipping() {
            return Ok(());
        }
        let is_once = tokens
            .first()
            .and_then(|t| t.ident())
            .is_some_and(|id| strings.get(id) == "once");
        if is_once {
            self.once_files.insert(self.current_key.clone());
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // #if expressions
    // ------------------------------------------------------------------------

    /// Resolve `defined` and `__has_include`, expand macros, then evaluate
    fn evaluate_condition(
        &mut self,
        tokens: Vec<Token>,
        pos: Position,
        strings: &mut StringTable,
    ) -> PResult<bool> {
        if tokens.is_empty() {
            return Err(ParseError::new("#if with no expression", pos));
        }
        let resolved = self.resolve_operators(tokens, pos, strings)?;
        let expanded = self.process(resolved, strings)?;
        let value = ExprEvaluator::new(&expanded, strings, pos).evaluate()?;
        Ok(value != 0)
    }

    /// Replace operators whose operands must not be macro-expanded
    fn resolve_operators(
        &self,
        tokens: Vec<Token>,
        pos: Position,
        strings: &StringTable,
    ) -> PResult<Vec<Token>> {
        let mut out = Vec::with_capacity(tokens.len());
        let mut iter = tokens.into_iter().peekable();

        while let Some(token) = iter.next() {
            let name = token.ident().map(|id| strings.get(id));
            match name {
                Some("defined") => {
                    let paren = iter.next_if(|t| t.is_special(b'(' as u32)).is_some();
                    let Some(id) = iter.next().and_then(|t| t.ident()) else {
                        return Err(ParseError::new(
                            "operator \"defined\" requires an identifier",
                            token.pos,
                        ));
                    };
                    if paren && iter.next_if(|t| t.is_special(b')' as u32)).is_none() {
                        return Err(ParseError::new(
                            "missing ')' after \"defined\"",
                            token.pos,
                        ));
                    }
                    out.push(number_token(self.is_defined(strings.get(id)), token.pos));
                }
                Some(op @ ("__has_include" | "__has_include_next")) => {
                    let is_next = op == "__has_include_next";
                    if iter.next_if(|t| t.is_special(b'(' as u32)).is_none() {
                        return Err(ParseError::new(
                            format!("missing '(' after \"{}\"", op),
                            token.pos,
                        ));
                    }
                    let mut arg = Vec::new();
                    loop {
                        match iter.next() {
                            Some(t) if t.is_special(b')' as u32) => break,
                            Some(t) => arg.push(t),
                            None => {
                                return Err(ParseError::new(
                                    format!("missing ')' after \"{}\"", op),
                                    pos,
                                ))
                            }
                        }
                    }
                    let found = parse_include_path(&arg, strings).is_some_and(|(name, system)| {
                        self.find_include_file(&name, system, is_next).is_some()
                    });
                    out.push(number_token(found, token.pos));
                }
                _ => out.push(token),
            }
        }

        Ok(out)
    }

    // ------------------------------------------------------------------------
    // #include
    // ------------------------------------------------------------------------

    fn handle_include<I>(
        &mut self,
        iter: &mut Peekable<I>,
        output: &mut Vec<Token>,
        hash: &Token,
        strings: &mut StringTable,
        is_include_next: bool,
    ) -> PResult<()>
    where
        I: Iterator<Item = Token>,
    {
        let path_tokens = self.collect_to_eol(iter);
        if self.is_skipping() {
            return Ok(());
        }

        let parsed = match parse_include_path(&path_tokens, strings) {
            Some(parsed) => Some(parsed),
            // computed include: #include MACRO
            None => {
                let expanded = self.process(path_tokens, strings)?;
                parse_include_path(&expanded, strings)
            }
        };
        let Some((filename, is_system)) = parsed.filter(|(name, _)| !name.is_empty()) else {
            return Err(ParseError::new(
                "#include expects \"FILENAME\" or <FILENAME>",
                hash.pos,
            ));
        };

        match self.find_include_file(&filename, is_system, is_include_next) {
            Some(source) => self.include_file(source, output, hash, strings),
            None => Err(ParseError::new(
                format!("'{}' file not found", filename),
                hash.pos,
            )),
        }
    }

    fn find_include_file(
        &self,
        filename: &str,
        is_system: bool,
        is_include_next: bool,
    ) -> Option<IncludeSource> {
        if Path::new(filename).is_absolute() {
            let path = PathBuf::from(filename);
            return path.is_file().then_some(IncludeSource::File {
                path,
                search_index: None,
            });
        }

        if !is_system && !is_include_next {
            let path = self.current_dir.join(filename);
            if path.is_file() {
                return Some(IncludeSource::File {
                    path,
                    search_index: None,
                });
            }
        }

        let start = match (is_include_next, self.search_index) {
            (true, Some(index)) => index + 1,
            _ => 0,
        };
        for (index, dir) in self.include_paths.iter().enumerate().skip(start) {
            let path = dir.join(filename);
            if path.is_file() {
                return Some(IncludeSource::File {
                    path,
                    search_index: Some(index),
                });
            }
        }

        builtin_headers::get_builtin_header(filename).map(|content| IncludeSource::Builtin {
            name: filename.to_string(),
            content,
        })
    }

    fn include_file(
        &mut self,
        source: IncludeSource,
        output: &mut Vec<Token>,
        hash: &Token,
        strings: &mut StringTable,
    ) -> PResult<()> {
        if self.include_depth >= MAX_INCLUDE_DEPTH {
            return Err(ParseError::new(
                format!("#include nested too deeply (max {})", MAX_INCLUDE_DEPTH),
                hash.pos,
            ));
        }

        let (key, name, dir, search_index, content, builtin) = match source {
            IncludeSource::File { path, search_index } => {
                let key = path.canonicalize().unwrap_or_else(|_| path.clone());
                if self.once_files.contains(&key) {
                    return Ok(());
                }
                let content = fs::read(&path).map_err(|e| {
                    ParseError::new(format!("cannot read '{}': {}", path.display(), e), hash.pos)
                })?;
                let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
                let name = path.to_string_lossy().to_string();
                (key, name, dir, search_index, content, false)
            }
            IncludeSource::Builtin { name, content } => {
                let name = format!("<builtin>/{}", name);
                let key = PathBuf::from(&name);
                if self.once_files.contains(&key) {
                    return Ok(());
                }
                (key, name, PathBuf::new(), None, content.as_bytes().to_vec(), true)
            }
        };

        log::debug!("{}: including {}", hash.pos, name);

        let stream = diag::init_included_stream(&name, builtin);
        let tokens = Tokenizer::new(&content, stream, strings).tokenize()?;

        let saved_file = std::mem::replace(&mut self.current_file, name);
        let saved_dir = std::mem::replace(&mut self.current_dir, dir);
        let saved_key = std::mem::replace(&mut self.current_key, key);
        let saved_index = std::mem::replace(&mut self.search_index, search_index);
        self.include_depth += 1;

        let result = self.run_file(tokens, strings);

        self.include_depth -= 1;
        self.current_file = saved_file;
        self.current_dir = saved_dir;
        self.current_key = saved_key;
        self.search_index = saved_index;

        output.extend(
            result?
                .into_iter()
                .filter(|t| !matches!(t.typ, TokenType::StreamBegin | TokenType::StreamEnd)),
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Macro expansion
    // ------------------------------------------------------------------------

    fn try_expand_macro<I>(
        &mut self,
        token: &Token,
        iter: &mut Peekable<I>,
        strings: &mut StringTable,
    ) -> PResult<Option<Vec<Token>>>
    where
        I: Iterator<Item = Token>,
    {
        let Some(id) = token.ident() else {
            return Ok(None);
        };
        let name = strings.get(id);
        if self.expanding.contains(name) {
            return Ok(None);
        }
        let Some(mac) = self.macros.get(name).cloned() else {
            return Ok(None);
        };

        if let Some(builtin) = mac.builtin {
            return self.expand_builtin(&mac.name, builtin, token.pos, iter, strings);
        }

        let mut pos = token.pos;
        pos.newline = false;

        let mut expanded = if mac.is_function {
            if iter.next_if(|t| t.is_special(b'(' as u32)).is_none() {
                return Ok(None);
            }
            let args = collect_macro_args(iter, &mac.name, token.pos)?;
            self.expand_function_macro(&mac, args, pos, strings)?
        } else {
            self.expand_object_macro(&mac, pos, strings)?
        };

        // the expansion takes the line break and spacing of the macro name
        if let Some(first) = expanded.first_mut() {
            first.pos.newline = token.pos.newline;
            first.pos.whitespace = token.pos.whitespace;
        }
        Ok(Some(expanded))
    }

    /// Fully macro-expand one argument before substitution
    fn expand_arg(&mut self, arg: Vec<Token>, strings: &mut StringTable) -> PResult<Vec<Token>> {
        self.process(arg, strings)
    }

    fn expand_function_macro(
        &mut self,
        mac: &Macro,
        args: Vec<Vec<Token>>,
        pos: Position,
        strings: &mut StringTable,
    ) -> PResult<Vec<Token>> {
        let mut result: Vec<Token> = Vec::new();

        for (i, mt) in mac.body.iter().enumerate() {
            let next_is_paste = matches!(
                mac.body.get(i + 1).map(|m| &m.value),
                Some(MacroTokenValue::Paste)
            );
            let prev_was_paste = i > 0 && matches!(mac.body[i - 1].value, MacroTokenValue::Paste);

            let tokens = match &mt.value {
                MacroTokenValue::Paste => continue,
                MacroTokenValue::Stringify(idx) => {
                    let text = if *idx >= mac.params.len() {
                        tokens_to_text(&va_args(mac, &args, pos), strings)
                    } else {
                        tokens_to_text(args.get(*idx).map_or(&[][..], |a| a.as_slice()), strings)
                    };
                    vec![Token::with_value(
                        TokenType::String,
                        pos,
                        TokenValue::String(escape_string(&text)),
                    )]
                }
                MacroTokenValue::Param(idx) => {
                    let arg = args.get(*idx).cloned().unwrap_or_default();
                    if next_is_paste || prev_was_paste {
                        arg
                    } else {
                        self.expand_arg(arg, strings)?
                    }
                }
                MacroTokenValue::VaArgs => {
                    let va = va_args(mac, &args, pos);
                    let after_comma =
                        prev_was_paste && result.last().is_some_and(|t| t.is_special(b',' as u32));
                    if after_comma {
                        // GNU ", ## __VA_ARGS__": drop the comma when empty
                        if va.is_empty() {
                            result.pop();
                        } else {
                            result.extend(relocate(va, pos, mt.whitespace));
                        }
                        continue;
                    }
                    if next_is_paste || prev_was_paste {
                        va
                    } else {
                        self.expand_arg(va, strings)?
                    }
                }
                _ => vec![macro_token_to_token(mt, pos, strings)],
            };

            let tokens = relocate(tokens, pos, mt.whitespace);
            match result.pop() {
                Some(left) if prev_was_paste && !tokens.is_empty() => {
                    result.extend(paste_tokens(&left, &tokens, pos, strings)?);
                }
                Some(left) => {
                    result.push(left);
                    result.extend(tokens);
                }
                None => result.extend(tokens),
            }
        }

        self.rescan(&mac.name, result, strings)
    }

    fn expand_object_macro(
        &mut self,
        mac: &Macro,
        pos: Position,
        strings: &mut StringTable,
    ) -> PResult<Vec<Token>> {
        let mut result: Vec<Token> = Vec::new();

        for (i, mt) in mac.body.iter().enumerate() {
            if matches!(mt.value, MacroTokenValue::Paste) {
                continue;
            }
            let prev_was_paste = i > 0 && matches!(mac.body[i - 1].value, MacroTokenValue::Paste);
            let token = macro_token_to_token(mt, pos, strings);
            match result.pop() {
                Some(left) if prev_was_paste => {
                    result.extend(paste_tokens(&left, &[token], pos, strings)?);
                }
                Some(left) => {
                    result.push(left);
                    result.push(token);
                }
                None => result.push(token),
            }
        }

        self.rescan(&mac.name, result, strings)
    }

    /// Rescan an expansion with its own macro disabled
    fn rescan(
        &mut self,
        name: &str,
        tokens: Vec<Token>,
        strings: &mut StringTable,
    ) -> PResult<Vec<Token>> {
        self.expanding.insert(name.to_string());
        let result = self.process(tokens, strings);
        self.expanding.remove(name);
        result
    }

    fn expand_builtin<I>(
        &mut self,
        name: &str,
        builtin: BuiltinMacro,
        pos: Position,
        iter: &mut Peekable<I>,
        strings: &mut StringTable,
    ) -> PResult<Option<Vec<Token>>>
    where
        I: Iterator<Item = Token>,
    {
        match builtin {
            BuiltinMacro::Line => Ok(Some(vec![Token::with_value(
                TokenType::Number,
                pos,
                TokenValue::Number(pos.line.to_string()),
            )])),
            BuiltinMacro::File => Ok(Some(vec![Token::with_value(
                TokenType::String,
                pos,
                TokenValue::String(escape_string(&self.current_file)),
            )])),
            _ => {
                if iter.next_if(|t| t.is_special(b'(' as u32)).is_none() {
                    return Ok(None);
                }
                let args = collect_macro_args(iter, name, pos)?;
                let arg = args.first().map_or(&[][..], |a| a.as_slice());
                let result = match builtin {
                    BuiltinMacro::HasInclude | BuiltinMacro::HasIncludeNext => {
                        parse_include_path(arg, strings).is_some_and(|(name, system)| {
                            self.find_include_file(
                                &name,
                                system,
                                builtin == BuiltinMacro::HasIncludeNext,
                            )
                            .is_some()
                        })
                    }
                    BuiltinMacro::HasBuiltin => arg
                        .first()
                        .and_then(|t| t.ident())
                        .is_some_and(|id| strings.get(id) == "__builtin_va_list"),
                    _ => false,
                };
                Ok(Some(vec![number_token(result, pos)]))
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Token belongs to the current directive line
fn on_same_line(token: &Token) -> bool {
    !token.pos.newline && token.typ != TokenType::StreamEnd
}

fn number_token(value: bool, pos: Position) -> Token {
    let text = if value { "1" } else { "0" };
    Token::with_value(TokenType::Number, pos, TokenValue::Number(text.to_string()))
}

/// Give substituted tokens the invocation position
fn relocate(tokens: Vec<Token>, pos: Position, whitespace: bool) -> Vec<Token> {
    tokens
        .into_iter()
        .enumerate()
        .map(|(i, mut tok)| {
            let ws = if i == 0 { whitespace } else { tok.pos.whitespace };
            tok.pos = pos;
            tok.pos.whitespace = ws;
            tok
        })
        .collect()
}

/// Variadic arguments re-joined with commas
fn va_args(mac: &Macro, args: &[Vec<Token>], pos: Position) -> Vec<Token> {
    let mut tokens = Vec::new();
    for (i, arg) in args.iter().enumerate().skip(mac.params.len()) {
        if i > mac.params.len() {
            tokens.push(Token::with_value(
                TokenType::Special,
                pos,
                TokenValue::Special(b',' as u32),
            ));
        }
        tokens.extend(arg.iter().cloned());
    }
    tokens
}

/// Collect the arguments of a function-like macro call; '(' is consumed
fn collect_macro_args<I>(
    iter: &mut Peekable<I>,
    name: &str,
    pos: Position,
) -> PResult<Vec<Vec<Token>>>
where
    I: Iterator<Item = Token>,
{
    let mut args = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0u32;

    loop {
        let token = match iter.next() {
            Some(t) if t.typ != TokenType::StreamEnd => t,
            _ => {
                return Err(ParseError::new(
                    format!("unterminated argument list invoking macro \"{}\"", name),
                    pos,
                ))
            }
        };

        if token.is_special(b'(' as u32) {
            depth += 1;
        } else if token.is_special(b')' as u32) {
            if depth == 0 {
                if !current.is_empty() || !args.is_empty() {
                    args.push(current);
                }
                return Ok(args);
            }
            depth -= 1;
        } else if token.is_special(b',' as u32) && depth == 0 {
            args.push(std::mem::take(&mut current));
            continue;
        }
        current.push(token);
    }
}

fn tokens_to_macro_body(
    tokens: &[Token],
    params: Option<&[String]>,
    va_name: Option<&str>,
    strings: &StringTable,
) -> Vec<MacroToken> {
    let is_function = params.is_some();
    let params = params.unwrap_or(&[]);
    let va_index = params.len();

    // parameter index, with the variadic pack after the named ones
    let param_index = |tok: &Token| -> Option<usize> {
        let name = strings.get(tok.ident()?);
        if !is_function {
            return None;
        }
        if name == "__VA_ARGS__" || Some(name) == va_name {
            return Some(va_index);
        }
        params.iter().position(|p| p == name)
    };

    let mut body = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        let whitespace = token.pos.whitespace;

        if token.is_special(b'#' as u32) && is_function {
            if let Some(idx) = tokens.get(i + 1).and_then(param_index) {
                body.push(MacroToken {
                    typ: TokenType::String,
                    value: MacroTokenValue::Stringify(idx),
                    whitespace,
                });
                i += 2;
                continue;
            }
        }

        let value = if token.is_special(SpecialToken::HashHash as u32) {
            MacroTokenValue::Paste
        } else if let Some(idx) = param_index(token) {
            if idx == va_index {
                MacroTokenValue::VaArgs
            } else {
                MacroTokenValue::Param(idx)
            }
        } else {
            match &token.value {
                TokenValue::Number(n) => MacroTokenValue::Number(n.clone()),
                TokenValue::Ident(id) => MacroTokenValue::Ident(strings.get(*id).to_string()),
                TokenValue::String(s) => MacroTokenValue::String(s.clone()),
                TokenValue::Char(c) => MacroTokenValue::Char(c.clone()),
                TokenValue::Special(code) => MacroTokenValue::Special(*code),
                TokenValue::None => {
                    i += 1;
                    continue;
                }
            }
        };

        body.push(MacroToken {
            typ: token.typ,
            value,
            whitespace,
        });
        i += 1;
    }

    body
}

fn macro_token_to_token(mt: &MacroToken, pos: Position, strings: &mut StringTable) -> Token {
    let mut new_pos = pos;
    new_pos.whitespace = mt.whitespace;

    let value = match &mt.value {
        MacroTokenValue::Number(n) => TokenValue::Number(n.clone()),
        MacroTokenValue::Ident(name) => TokenValue::Ident(strings.intern(name)),
        MacroTokenValue::String(s) => TokenValue::String(s.clone()),
        MacroTokenValue::Char(c) => TokenValue::Char(c.clone()),
        MacroTokenValue::Special(code) => TokenValue::Special(*code),
        _ => TokenValue::None,
    };

    Token::with_value(mt.typ, new_pos, value)
}

/// `left ## right[0]`, re-lexed as one token sequence
fn paste_tokens(
    left: &Token,
    right: &[Token],
    pos: Position,
    strings: &mut StringTable,
) -> PResult<Vec<Token>> {
    let Some(first) = right.first() else {
        return Ok(vec![left.clone()]);
    };

    let combined = format!("{}{}", show_token(left, strings), show_token(first, strings));
    let tokens = Tokenizer::new(combined.as_bytes(), pos.stream, strings).tokenize()?;

    let mut result: Vec<Token> = tokens
        .into_iter()
        .filter(|t| !matches!(t.typ, TokenType::StreamBegin | TokenType::StreamEnd))
        .map(|mut t| {
            t.pos = pos;
            t.pos.whitespace = left.pos.whitespace;
            t
        })
        .collect();
    result.extend(right.iter().skip(1).cloned());
    Ok(result)
}

/// Source text of a token sequence, single spaces where there was whitespace
fn tokens_to_text(tokens: &[Token], strings: &StringTable) -> String {
    let mut result = String::new();
    for token in tokens {
        if !result.is_empty() && token.pos.whitespace {
            result.push(' ');
        }
        result.push_str(&show_token(token, strings));
    }
    result
}

fn escape_string(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Parse `"name"` or `<name>` from directive tokens
fn parse_include_path(tokens: &[Token], strings: &StringTable) -> Option<(String, bool)> {
    let first = tokens.first()?;

    if let TokenValue::String(s) = &first.value {
        return Some((s.clone(), false));
    }

    if first.is_special(b'<' as u32) {
        let mut filename = String::new();
        for token in &tokens[1..] {
            if token.is_special(b'>' as u32) {
                return Some((filename, true));
            }
            if token.pos.whitespace && !filename.is_empty() {
                filename.push(' ');
            }
            filename.push_str(&show_token(token, strings));
        }
    }

    None
}

// ============================================================================
// Expression Evaluator for #if
// ============================================================================

struct ExprEvaluator<'a> {
    tokens: &'a [Token],
    strings: &'a StringTable,
    pos: usize,
    directive_pos: Position,
}

impl<'a> ExprEvaluator<'a> {
    fn new(tokens: &'a [Token], strings: &'a StringTable, directive_pos: Position) -> Self {
        Self {
            tokens,
            strings,
            pos: 0,
            directive_pos,
        }
    }

    fn evaluate(&mut self) -> PResult<i64> {
        let value = self.expr_cond()?;
        if let Some(tok) = self.current() {
            return Err(ParseError::new(
                format!(
                    "missing binary operator before token \"{}\"",
                    show_token(tok, self.strings)
                ),
                tok.pos,
            ));
        }
        Ok(value)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn error_pos(&self) -> Position {
        self.current().map_or(self.directive_pos, |t| t.pos)
    }

    fn is_special(&self, expected: u32) -> bool {
        self.current().is_some_and(|t| t.is_special(expected))
    }

    fn eat(&mut self, expected: u32) -> bool {
        let found = self.is_special(expected);
        if found {
            self.advance();
        }
        found
    }

    // Precedence, lowest first:
    // ?: || && | ^ & (== !=) (< <= > >=) (<< >>) (+ -) (* / %) unary primary

    fn expr_cond(&mut self) -> PResult<i64> {
        let cond = self.expr_or()?;
        if !self.eat(b'?' as u32) {
            return Ok(cond);
        }
        let then_val = self.expr_cond()?;
        if !self.eat(b':' as u32) {
            return Err(ParseError::new("expected ':' in #if expression", self.error_pos()));
        }
        let else_val = self.expr_cond()?;
        Ok(if cond != 0 { then_val } else { else_val })
    }

    fn expr_or(&mut self) -> PResult<i64> {
        let mut left = self.expr_and()?;
        while self.eat(SpecialToken::LogicalOr as u32) {
            let right = self.expr_and()?;
            left = ((left != 0) || (right != 0)) as i64;
        }
        Ok(left)
    }

    fn expr_and(&mut self) -> PResult<i64> {
        let mut left = self.expr_bitor()?;
        while self.eat(SpecialToken::LogicalAnd as u32) {
            let right = self.expr_bitor()?;
            left = ((left != 0) && (right != 0)) as i64;
        }
        Ok(left)
    }

    fn expr_bitor(&mut self) -> PResult<i64> {
        let mut left = self.expr_bitxor()?;
        while self.eat(b'|' as u32) {
            left |= self.expr_bitxor()?;
        }
        Ok(left)
    }

    fn expr_bitxor(&mut self) -> PResult<i64> {
        let mut left = self.expr_bitand()?;
        while self.eat(b'^' as u32) {
            left ^= self.expr_bitand()?;
        }
        Ok(left)
    }

    fn expr_bitand(&mut self) -> PResult<i64> {
        let mut left = self.expr_equality()?;
        while self.eat(b'&' as u32) {
            left &= self.expr_equality()?;
        }
        Ok(left)
    }

    fn expr_equality(&mut self) -> PResult<i64> {
        let mut left = self.expr_relational()?;
        loop {
            if self.eat(SpecialToken::Equal as u32) {
                left = (left == self.expr_relational()?) as i64;
            } else if self.eat(SpecialToken::NotEqual as u32) {
                left = (left != self.expr_relational()?) as i64;
            } else {
                return Ok(left);
            }
        }
    }

    fn expr_relational(&mut self) -> PResult<i64> {
        let mut left = self.expr_shift()?;
        loop {
            if self.eat(b'<' as u32) {
                left = (left < self.expr_shift()?) as i64;
            } else if self.eat(b'>' as u32) {
                left = (left > self.expr_shift()?) as i64;
            } else if self.eat(SpecialToken::Lte as u32) {
                left = (left <= self.expr_shift()?) as i64;
            } else if self.eat(SpecialToken::Gte as u32) {
                left = (left >= self.expr_shift()?) as i64;
            } else {
                return Ok(left);
            }
        }
    }

    fn expr_shift(&mut self) -> PResult<i64> {
        let mut left = self.expr_additive()?;
        loop {
            if self.eat(SpecialToken::LeftShift as u32) {
                left = left.wrapping_shl(self.expr_additive()? as u32);
            } else if self.eat(SpecialToken::RightShift as u32) {
                left = left.wrapping_shr(self.expr_additive()? as u32);
            } else {
                return Ok(left);
            }
        }
    }

    fn expr_additive(&mut self) -> PResult<i64> {
        let mut left = self.expr_multiplicative()?;
        loop {
            if self.eat(b'+' as u32) {
                left = left.wrapping_add(self.expr_multiplicative()?);
            } else if self.eat(b'-' as u32) {
                left = left.wrapping_sub(self.expr_multiplicative()?);
            } else {
                return Ok(left);
            }
        }
    }

    fn expr_multiplicative(&mut self) -> PResult<i64> {
        let mut left = self.expr_unary()?;
        loop {
            if self.eat(b'*' as u32) {
                left = left.wrapping_mul(self.expr_unary()?);
            } else if self.eat(b'/' as u32) {
                let right = self.expr_unary()?;
                left = if right == 0 { 0 } else { left.wrapping_div(right) };
            } else if self.eat(b'%' as u32) {
                let right = self.expr_unary()?;
                left = if right == 0 { 0 } else { left.wrapping_rem(right) };
            } else {
                return Ok(left);
            }
        }
    }

    fn expr_unary(&mut self) -> PResult<i64> {
        if self.eat(b'!' as u32) {
            return Ok((self.expr_unary()? == 0) as i64);
        }
        if self.eat(b'~' as u32) {
            return Ok(!self.expr_unary()?);
        }
        if self.eat(b'-' as u32) {
            return Ok(self.expr_unary()?.wrapping_neg());
        }
        if self.eat(b'+' as u32) {
            return self.expr_unary();
        }
        self.expr_primary()
    }

    fn expr_primary(&mut self) -> PResult<i64> {
        if self.eat(b'(' as u32) {
            let value = self.expr_cond()?;
            if !self.eat(b')' as u32) {
                return Err(ParseError::new(
                    "missing ')' in expression",
                    self.error_pos(),
                ));
            }
            return Ok(value);
        }

        let Some(tok) = self.current() else {
            return Err(ParseError::new(
                "#if with no expression",
                self.directive_pos,
            ));
        };

        let value = match &tok.value {
            TokenValue::Number(n) => parse_number(n),
            TokenValue::Char(c) => char_value(c),
            // identifiers left after expansion are 0
            TokenValue::Ident(_) => 0,
            _ => {
                return Err(ParseError::new(
                    format!(
                        "token \"{}\" is not valid in preprocessor expressions",
                        show_token(tok, self.strings)
                    ),
                    tok.pos,
                ))
            }
        };
        self.advance();
        Ok(value)
    }
}

/// Integer value of a pp-number; unsigned values wrap into i64
fn parse_number(s: &str) -> i64 {
    let s = s.trim_end_matches(['u', 'U', 'l', 'L']);
    let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if let Some(bin) = s.strip_prefix("0b").or_else(|| s.strip_prefix("0B")) {
        u64::from_str_radix(bin, 2)
    } else if s.len() > 1 && s.starts_with('0') {
        u64::from_str_radix(&s[1..], 8)
    } else {
        s.parse::<u64>()
    };
    parsed.map(|v| v as i64).unwrap_or(0)
}

fn char_value(content: &str) -> i64 {
    let mut chars = content.chars();
    match (chars.next(), chars.next()) {
        (Some('\\'), Some(esc)) => match esc {
            'n' => 10,
            't' => 9,
            'r' => 13,
            '0' => 0,
            other => other as i64,
        },
        (Some(c), _) => c as i64,
        (None, _) => 0,
    }
}

// ============================================================================
// Tests
// ============================================================================
