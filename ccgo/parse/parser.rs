//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Parser for ccgo
// Recursive descent over file-scope declarations
//
// Everything that can only contain expressions or statements (function
// bodies, initializers, array sizes, attribute and asm arguments) is
// skipped by matching brackets; the parser never looks inside.
//

use super::ast::{
    DeclSpecifiers, Declaration, Declarator, DeclaratorSuffix, DirectDeclarator, ExternalDecl,
    FunctionDef, ParameterDeclaration, ParameterTypeList, StorageClass, TranslationUnit,
};
use crate::diag::Position;
use crate::error::ParseError;
use crate::strings::{StringId, StringTable};
use crate::symbol::{DeclRef, Symbol, SymbolKind, SymbolTable};
use crate::token::lexer::{show_token, SpecialToken, Token, TokenType, TokenValue};

const DEFAULT_PARAM_CAPACITY: usize = 8;

pub type ParseResult<T> = Result<T, ParseError>;

// ============================================================================
// Keyword Classification
// ============================================================================

fn storage_class(name: &str) -> Option<StorageClass> {
    match name {
        "typedef" => Some(StorageClass::Typedef),
        "extern" => Some(StorageClass::Extern),
        "static" => Some(StorageClass::Static),
        "auto" => Some(StorageClass::Auto),
        "register" => Some(StorageClass::Register),
        "_Thread_local" | "thread_local" | "__thread" => Some(StorageClass::ThreadLocal),
        _ => None,
    }
}

fn is_qualifier(name: &str) -> bool {
    matches!(
        name,
        "const"
            | "volatile"
            | "restrict"
            | "_Atomic"
            | "_Nonnull"
            | "_Nullable"
            | "_Null_unspecified"
    )
}

fn is_function_specifier(name: &str) -> bool {
    matches!(name, "inline" | "_Noreturn" | "noreturn")
}

/// Type keywords, including the GNU and C23 spellings headers use
fn is_basic_type(name: &str) -> bool {
    matches!(
        name,
        "void"
            | "char"
            | "short"
            | "int"
            | "long"
            | "float"
            | "double"
            | "signed"
            | "unsigned"
            | "_Bool"
            | "_Complex"
            | "_Imaginary"
            | "__int128"
            | "__int128_t"
            | "__uint128_t"
            | "__float128"
            | "__float80"
            | "__fp16"
            | "__bf16"
            | "_Float16"
            | "_Float32"
            | "_Float64"
            | "_Float128"
            | "_Float32x"
            | "_Float64x"
            | "_Decimal32"
            | "_Decimal64"
            | "_Decimal128"
            | "__builtin_va_list"
    )
}

fn is_tag_keyword(name: &str) -> bool {
    matches!(name, "struct" | "union" | "enum")
}

// ============================================================================
// Parser
// ============================================================================

pub struct Parser<'a> {
    tokens: &'a [Token],
    strings: &'a StringTable,
    /// File scope, filled as declarations are parsed
    symbols: &'a mut SymbolTable,
    pos: usize,
    /// Returned past the end of `tokens`
    eof: Token,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], strings: &'a StringTable, symbols: &'a mut SymbolTable) -> Self {
        let eof_pos = tokens.last().map(|t| t.pos).unwrap_or_default();
        Self {
            tokens,
            strings,
            symbols,
            pos: 0,
            eof: Token::new(TokenType::StreamEnd, eof_pos),
        }
    }

    // ========================================================================
    // Token Navigation
    // ========================================================================

    fn current(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn peek_at(&self, offset: usize) -> &Token {
        self.tokens.get(self.pos + offset).unwrap_or(&self.eof)
    }

    fn peek(&self) -> TokenType {
        self.current().typ
    }

    fn is_special(&self, c: u8) -> bool {
        self.current().is_special(c as u32)
    }

    fn is_special_token(&self, tok: SpecialToken) -> bool {
        self.current().is_special(tok as u32)
    }

    fn current_pos(&self) -> Position {
        self.current().pos
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.peek() == TokenType::StreamEnd
    }

    fn skip_stream_tokens(&mut self) {
        while self.peek() == TokenType::StreamBegin {
            self.advance();
        }
    }

    /// Name of the current token if it is an identifier
    fn current_ident(&self) -> Option<&'a str> {
        let strings: &'a StringTable = self.strings;
        self.current().ident().map(|id| strings.get(id))
    }

    fn current_text(&self) -> String {
        if self.is_eof() {
            "end of file".to_string()
        } else {
            format!("'{}'", show_token(self.current(), self.strings))
        }
    }

    fn expect_special(&mut self, c: u8) -> ParseResult<()> {
        if self.is_special(c) {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(
                format!("expected '{}'", c as char),
                self.current_pos(),
            ))
        }
    }

    /// Identifier that can start a declaration specifier
    fn starts_specifier(&self, id: StringId) -> bool {
        let name = self.strings.get(id);
        storage_class(name).is_some()
            || is_qualifier(name)
            || is_function_specifier(name)
            || is_basic_type(name)
            || is_tag_keyword(name)
            || matches!(name, "typeof" | "typeof_unqual" | "_Alignas" | "alignas")
            || self.symbols.is_typedef(id)
    }

    // ========================================================================
    // Skipping
    // ========================================================================

    /// Skip a bracketed group starting at the current `(`, `[` or `{`
    fn skip_group(&mut self) -> ParseResult<()> {
        let mut stack: Vec<u8> = Vec::new();
        loop {
            let token = self.current();
            if token.typ == TokenType::StreamEnd {
                let expected = stack.last().copied().unwrap_or(b')');
                return Err(ParseError::new(
                    format!("expected '{}'", expected as char),
                    token.pos,
                ));
            }
            if let TokenValue::Special(code) = token.value {
                match u8::try_from(code).unwrap_or(0) {
                    b'(' => stack.push(b')'),
                    b'[' => stack.push(b']'),
                    b'{' => stack.push(b'}'),
                    closer @ (b')' | b']' | b'}') => match stack.pop() {
                        Some(expected) if expected == closer => {}
                        Some(expected) => {
                            return Err(ParseError::new(
                                format!("expected '{}'", expected as char),
                                token.pos,
                            ))
                        }
                        None => {
                            return Err(ParseError::new(
                                format!("unexpected '{}'", closer as char),
                                token.pos,
                            ))
                        }
                    },
                    _ => {}
                }
            }
            self.advance();
            if stack.is_empty() {
                return Ok(());
            }
        }
    }

    /// Skip an initializer up to the `,` or `;` that ends it
    fn skip_initializer(&mut self) -> ParseResult<()> {
        loop {
            if self.is_special(b',') || self.is_special(b';') {
                return Ok(());
            }
            if self.is_special(b'(') || self.is_special(b'[') || self.is_special(b'{') {
                self.skip_group()?;
            } else if self.is_eof()
                || self.is_special(b')')
                || self.is_special(b']')
                || self.is_special(b'}')
            {
                return Err(ParseError::new(
                    "expected ';' after top level declarator",
                    self.current_pos(),
                ));
            } else {
                self.advance();
            }
        }
    }

    /// Skip a keyword followed by an optional parenthesized argument
    fn skip_keyword_group(&mut self) -> ParseResult<()> {
        self.advance();
        if self.is_special(b'(') {
            self.skip_group()?;
        }
        Ok(())
    }

    /// Skip GCC attributes, asm labels, `__declspec` and `_Pragma`
    fn skip_extensions(&mut self) -> ParseResult<()> {
        while let Some(name) = self.current_ident() {
            match name {
                "__attribute__" | "__declspec" | "_Pragma" => self.skip_keyword_group()?,
                "__asm__" | "__asm" | "asm" => {
                    self.advance();
                    while matches!(self.current_ident(), Some("volatile" | "inline" | "goto")) {
                        self.advance();
                    }
                    if self.is_special(b'(') {
                        self.skip_group()?;
                    }
                }
                _ => break,
            }
        }
        Ok(())
    }

    // ========================================================================
    // Translation Unit
    // ========================================================================

    pub fn parse_translation_unit(&mut self) -> ParseResult<TranslationUnit> {
        let mut tu = TranslationUnit::new();

        self.skip_stream_tokens();

        while !self.is_eof() {
            // empty declaration
            if self.is_special(b';') {
                self.advance();
                continue;
            }

            match self.current_ident() {
                Some("_Static_assert" | "static_assert") => {
                    self.skip_keyword_group()?;
                    self.expect_special(b';')?;
                    continue;
                }
                Some("__asm__" | "__asm" | "asm") => {
                    self.skip_extensions()?;
                    self.expect_special(b';')?;
                    continue;
                }
                _ => {}
            }

            let item = self.parse_external_decl(tu.items.len())?;
            tu.add(item);
        }

        Ok(tu)
    }

    /// Parse one external declaration; `item` is its index in the unit
    fn parse_external_decl(&mut self, item: usize) -> ParseResult<ExternalDecl> {
        let specifiers = self.parse_decl_specifiers()?;
        if specifiers.is_empty() {
            return Err(ParseError::new(
                format!(
                    "expected declaration specifiers before {}",
                    self.current_text()
                ),
                self.current_pos(),
            ));
        }

        let mut declarators: Vec<Declarator> = Vec::new();

        // struct/union/enum declaration without declarators
        if self.is_special(b';') {
            self.advance();
            return Ok(ExternalDecl::Declaration(Declaration {
                specifiers,
                declarators,
            }));
        }

        loop {
            let declarator = self.parse_declarator()?;
            self.skip_extensions()?;

            let decl = DeclRef {
                item,
                declarator: declarators.len(),
            };

            if declarators.is_empty() && declarator.is_function() && self.is_special(b'{') {
                let body_pos = self.current_pos();
                self.skip_group()?;
                self.declare(&specifiers, &declarator, decl);
                return Ok(ExternalDecl::FunctionDef(FunctionDef {
                    specifiers,
                    declarator,
                    body_pos,
                }));
            }

            self.declare(&specifiers, &declarator, decl);
            declarators.push(declarator);

            if self.is_special(b'=') {
                self.advance();
                self.skip_initializer()?;
            }

            if self.is_special(b',') {
                self.advance();
                continue;
            }
            if self.is_special(b';') {
                self.advance();
                break;
            }
            return Err(ParseError::new(
                "expected ';' after top level declarator",
                self.current_pos(),
            ));
        }

        Ok(ExternalDecl::Declaration(Declaration {
            specifiers,
            declarators,
        }))
    }

    /// Bind a named declarator in file scope
    fn declare(&mut self, specifiers: &DeclSpecifiers, declarator: &Declarator, decl: DeclRef) {
        let Some(name) = declarator.name() else {
            return;
        };
        let kind = if specifiers.is_typedef() {
            SymbolKind::Typedef
        } else if declarator.is_function() {
            SymbolKind::Function
        } else {
            SymbolKind::Variable
        };
        self.symbols.declare(Symbol {
            name,
            kind,
            decl,
            pos: declarator.pos,
        });
    }

    // ========================================================================
    // Declaration Specifiers
    // ========================================================================

    fn parse_decl_specifiers(&mut self) -> ParseResult<DeclSpecifiers> {
        let strings = self.strings;
        let mut specs = DeclSpecifiers {
            pos: self.current_pos(),
            ..Default::default()
        };

        loop {
            self.skip_extensions()?;

            let Some(id) = self.current().ident() else {
                break;
            };
            let name = strings.get(id);

            if let Some(storage) = storage_class(name) {
                if specs.storage.is_some() {
                    return Err(ParseError::new(
                        "multiple storage classes in declaration specifiers",
                        self.current_pos(),
                    ));
                }
                specs.storage = Some(storage);
                self.advance();
            } else if name == "_Atomic" && self.peek_at(1).is_special(b'(' as u32) {
                // _Atomic(type) is a type specifier
                self.skip_keyword_group()?;
                specs.type_specifiers.push(name.to_string());
            } else if is_qualifier(name) {
                specs.qualifiers.push(name.to_string());
                self.advance();
            } else if is_function_specifier(name) {
                specs.function_specifiers.push(name.to_string());
                self.advance();
            } else if matches!(name, "_Alignas" | "alignas") {
                self.skip_keyword_group()?;
            } else if is_basic_type(name) {
                specs.type_specifiers.push(name.to_string());
                self.advance();
            } else if is_tag_keyword(name) {
                let spelled = self.parse_tagged_type(name)?;
                specs.type_specifiers.push(spelled);
            } else if matches!(name, "typeof" | "typeof_unqual") {
                let pos = self.current_pos();
                self.advance();
                if !self.is_special(b'(') {
                    return Err(ParseError::new(format!("expected '(' after '{}'", name), pos));
                }
                self.skip_group()?;
                specs.type_specifiers.push(name.to_string());
            } else if specs.type_specifiers.is_empty() && self.symbols.is_typedef(id) {
                specs.type_specifiers.push(name.to_string());
                self.advance();
            } else if specs.type_specifiers.is_empty() && self.next_starts_declarator() {
                return Err(ParseError::new(
                    format!("unknown type name '{}'", name),
                    self.current_pos(),
                ));
            } else {
                break;
            }
        }

        Ok(specs)
    }

    /// The token after the current one continues a declaration
    fn next_starts_declarator(&self) -> bool {
        let next = self.peek_at(1);
        next.typ == TokenType::Ident || next.is_special(b'*' as u32)
    }

    /// `struct tag`, `struct tag { ... }` or `struct { ... }`
    fn parse_tagged_type(&mut self, keyword: &str) -> ParseResult<String> {
        let pos = self.current_pos();
        self.advance();
        self.skip_extensions()?;

        let tag = self.current_ident().map(str::to_string);
        if tag.is_some() {
            self.advance();
        }

        let has_body = self.is_special(b'{');
        if has_body {
            self.skip_group()?;
        }

        match tag {
            Some(tag) => Ok(format!("{} {}", keyword, tag)),
            None if has_body => Ok(keyword.to_string()),
            None => Err(ParseError::new(
                format!("declaration of anonymous {} must be a definition", keyword),
                pos,
            )),
        }
    }

    // ========================================================================
    // Declarators
    // ========================================================================

    /// Called at a `(` inside a declarator: does it open a grouped
    /// declarator rather than a parameter list?
    fn is_grouped_declarator(&self) -> bool {
        let next = self.peek_at(1);
        if next.is_special(b'*' as u32) || next.is_special(b'^' as u32) || next.is_special(b'(' as u32) {
            return true;
        }
        match next.ident() {
            Some(id) => !self.starts_specifier(id),
            None => false,
        }
    }

    fn parse_declarator(&mut self) -> ParseResult<Declarator> {
        self.skip_extensions()?;
        let start = self.current_pos();

        let mut pointer = 0;
        while self.is_special(b'*') {
            self.advance();
            pointer += 1;
            loop {
                self.skip_extensions()?;
                match self.current_ident() {
                    Some(name) if is_qualifier(name) => self.advance(),
                    _ => break,
                }
            }
        }

        let (direct, pos) = if self.is_special(b'(') && self.is_grouped_declarator() {
            self.advance();
            let inner = self.parse_declarator()?;
            self.expect_special(b')')?;
            let pos = inner.pos;
            (DirectDeclarator::Grouped(Box::new(inner)), pos)
        } else if let Some(id) = self.current().ident() {
            let pos = self.current_pos();
            self.advance();
            (DirectDeclarator::Ident(id), pos)
        } else {
            (DirectDeclarator::Abstract, start)
        };

        let mut suffixes = Vec::new();
        loop {
            if self.is_special(b'[') {
                self.skip_group()?;
                suffixes.push(DeclaratorSuffix::Array);
            } else if self.is_special(b'(') {
                let open = self.current_pos();
                self.advance();
                let params = self.parse_parameter_list(open)?;
                suffixes.push(DeclaratorSuffix::Function(params));
            } else {
                break;
            }
        }

        Ok(Declarator {
            pointer,
            direct,
            suffixes,
            pos,
        })
    }

    /// Parse a parameter type list; the `(` at `open` is already consumed
    fn parse_parameter_list(&mut self, open: Position) -> ParseResult<ParameterTypeList> {
        let mut list = ParameterTypeList {
            params: Vec::with_capacity(DEFAULT_PARAM_CAPACITY),
            ellipsis: None,
            pos: open,
        };

        if self.is_special(b')') {
            self.advance();
            return Ok(list);
        }

        // (void)
        if self.current_ident() == Some("void") && self.peek_at(1).is_special(b')' as u32) {
            self.advance();
            self.advance();
            return Ok(list);
        }

        // f(a, b): identifier list of an old-style definition
        if let Some(id) = self.current().ident() {
            let next = self.peek_at(1);
            if !self.starts_specifier(id)
                && (next.is_special(b',' as u32) || next.is_special(b')' as u32))
            {
                return Err(ParseError::new(
                    "K&R-style parameter lists are not supported",
                    self.current_pos(),
                ));
            }
        }

        loop {
            if self.is_special_token(SpecialToken::Ellipsis) {
                list.ellipsis = Some(self.current_pos());
                self.advance();
                break;
            }

            let pos = self.current_pos();
            let specifiers = self.parse_decl_specifiers()?;
            if specifiers.is_empty() {
                return Err(ParseError::new(
                    format!(
                        "expected parameter declaration before {}",
                        self.current_text()
                    ),
                    pos,
                ));
            }

            let declarator = self.parse_declarator()?;
            self.skip_extensions()?;

            list.params.push(ParameterDeclaration {
                specifiers,
                declarator,
                pos,
            });

            if self.is_special(b',') {
                self.advance();
            } else {
                break;
            }
        }

        self.expect_special(b')')?;
        Ok(list)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag;
    use crate::parse::ast::Derivation;
    use crate::target::Target;
    use crate::token::{Preprocessor, Tokenizer};

    fn parse(input: &str) -> ParseResult<(TranslationUnit, SymbolTable, StringTable)> {
        diag::clear_streams();
        let stream = diag::init_stream("test.c");
        let mut strings = StringTable::new();
        let tokens = Tokenizer::new(input.as_bytes(), stream, &mut strings).tokenize()?;
        let mut pp = Preprocessor::new(&Target::host(), "test.c", &[]);
        let tokens = pp.preprocess(tokens, &mut strings)?;
        let mut symbols = SymbolTable::new();
        let tu = Parser::new(&tokens, &strings, &mut symbols).parse_translation_unit()?;
        Ok((tu, symbols, strings))
    }

    fn parse_ok(input: &str) -> (TranslationUnit, SymbolTable, StringTable) {
        parse(input).unwrap()
    }

    fn first_declarator(tu: &TranslationUnit) -> &Declarator {
        &tu.items[0].declarators()[0]
    }

    fn param_names(d: &Declarator, strings: &StringTable) -> Vec<String> {
        d.function_params()
            .unwrap()
            .params
            .iter()
            .map(|p| {
                p.declarator
                    .name()
                    .map(|id| strings.get(id).to_string())
                    .unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn test_prototype() {
        let (tu, symbols, strings) =
            parse_ok("#include <stdint.h>\nint64_t add(int64_t a, int64_t b);\n");
        let add = tu
            .items
            .iter()
            .flat_map(|item| item.declarators())
            .find(|d| d.name().is_some_and(|id| strings.get(id) == "add"))
            .unwrap();
        assert!(add.is_function());
        assert_eq!(param_names(add, &strings), vec!["a", "b"]);
        assert_eq!(add.pos.line, 2);
        assert_eq!(add.pos.col, 9);

        let params = &add.function_params().unwrap().params;
        assert_eq!(params[0].specifiers.type_name(), "int64_t");
        assert_eq!(params[1].pos.col, 24);

        let id = strings.lookup("add").unwrap();
        assert_eq!(symbols.lookup(id).len(), 1);
        assert_eq!(symbols.lookup(id)[0].kind, SymbolKind::Function);
    }

    #[test]
    fn test_void_and_empty_params() {
        let (tu, _, _) = parse_ok("int f(void);\nint g();\n");
        for item in &tu.items {
            let d = &item.declarators()[0];
            assert!(d.is_function());
            assert!(d.function_params().unwrap().params.is_empty());
        }
    }

    #[test]
    fn test_function_definition_body_skipped() {
        let (tu, _, strings) = parse_ok(
            "static int sq(int x) { int y = x * x; if (y) { return y; } return 0; }\nint after;\n",
        );
        assert_eq!(tu.items.len(), 2);
        let ExternalDecl::FunctionDef(def) = &tu.items[0] else {
            panic!("expected function definition");
        };
        assert_eq!(def.specifiers.storage, Some(StorageClass::Static));
        assert_eq!(param_names(&def.declarator, &strings), vec!["x"]);
        assert_eq!(def.body_pos.col, 22);
    }

    #[test]
    fn test_pointer_array_and_function_pointer_params() {
        let (tu, _, strings) =
            parse_ok("void scale(double *x, const char *restrict s, int v[4], int (*cb)(int));\n");
        let d = first_declarator(&tu);
        assert_eq!(param_names(d, &strings), vec!["x", "s", "v", "cb"]);
        let params = &d.function_params().unwrap().params;
        assert_eq!(params[0].declarator.derivation(), Derivation::Pointer);
        assert_eq!(params[1].specifiers.type_name(), "char");
        assert_eq!(params[1].specifiers.qualifiers, vec!["const"]);
        assert_eq!(params[2].declarator.derivation(), Derivation::Array);
        assert_eq!(params[3].declarator.derivation(), Derivation::Pointer);
    }

    #[test]
    fn test_abstract_params_and_variadic() {
        let (tu, _, _) = parse_ok("int printf(const char *, ...);\n");
        let list = first_declarator(&tu).function_params().unwrap();
        assert_eq!(list.params.len(), 1);
        assert!(list.params[0].declarator.name().is_none());
        assert_eq!(list.params[0].declarator.derivation(), Derivation::Pointer);
        assert!(list.is_variadic());
        assert_eq!(list.ellipsis.unwrap().col, 26);
    }

    #[test]
    fn test_function_returning_function_pointer() {
        let (tu, _, strings) = parse_ok("void (*signal(int sig, void (*h)(int)))(int);\n");
        let d = first_declarator(&tu);
        assert!(d.is_function());
        assert_eq!(strings.get(d.name().unwrap()), "signal");
        assert_eq!(param_names(d, &strings), vec!["sig", "h"]);
    }

    #[test]
    fn test_variables_and_initializers() {
        let (tu, symbols, strings) =
            parse_ok("int a = 1, *b = &a, c[3] = {1, 2, 3};\nint (*fp)(int) = 0;\n");
        assert_eq!(tu.items[0].declarators().len(), 3);
        let fp = strings.lookup("fp").unwrap();
        assert_eq!(symbols.lookup(fp)[0].kind, SymbolKind::Variable);
        assert!(!tu.items[1].declarators()[0].is_function());
    }

    #[test]
    fn test_typedefs_and_tags() {
        let (tu, symbols, strings) = parse_ok(
            "typedef struct point { int x, y; } point_t;\n\
             typedef long (*op_fn)(long);\n\
             struct point;\n\
             enum color { RED, GREEN };\n\
             point_t origin(void);\n\
             unsigned long count(struct point *p, enum color c);\n",
        );
        let point_t = strings.lookup("point_t").unwrap();
        assert!(symbols.is_typedef(point_t));
        assert_eq!(tu.items.len(), 6);

        let count = tu.items[5].declarators()[0].clone();
        assert_eq!(tu.items[5].specifiers().type_name(), "unsigned long");
        let params = &count.function_params().unwrap().params;
        assert_eq!(params[0].specifiers.type_name(), "struct point");
        assert_eq!(params[1].specifiers.type_name(), "enum color");
    }

    #[test]
    fn test_gnu_extensions_skipped() {
        let (tu, _, strings) = parse_ok(
            "__extension__ extern int f(int x) __attribute__((__nonnull__(1))) __asm__(\"_f\");\n\
             _Static_assert(sizeof(int) == 4, \"int\");\n\
             __attribute__((visibility(\"default\"))) int g(int y);\n",
        );
        assert_eq!(tu.items.len(), 2);
        assert_eq!(param_names(&tu.items[1].declarators()[0], &strings), vec!["y"]);
    }

    #[test]
    fn test_redeclaration_recorded_twice() {
        let (_, symbols, strings) = parse_ok("int f(int a);\nint f(int a) { return a; }\n");
        let f = strings.lookup("f").unwrap();
        assert_eq!(symbols.lookup(f).len(), 2);
    }

    #[test]
    fn test_unknown_type_name() {
        let err = parse("void bad(float32 x);\n").unwrap_err();
        assert_eq!(err.message, "unknown type name 'float32'");
        assert_eq!(err.pos.line, 1);
        assert_eq!(err.pos.col, 10);
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse("int a\nint b;\n").unwrap_err();
        assert_eq!(err.message, "expected ';' after top level declarator");
        assert_eq!(err.pos.line, 2);
    }

    #[test]
    fn test_unbalanced_body() {
        let err = parse("int f(void) { return 0;\n").unwrap_err();
        assert_eq!(err.message, "expected '}'");
    }

    #[test]
    fn test_knr_rejected() {
        let err = parse("int f(a, b) int a; int b; { return a; }\n").unwrap_err();
        assert_eq!(err.message, "K&R-style parameter lists are not supported");
    }

    #[test]
    fn test_stray_tokens() {
        let err = parse("}\n").unwrap_err();
        assert_eq!(err.message, "expected declaration specifiers before '}'");
    }
}
