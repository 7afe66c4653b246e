//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// C preprocessing-token lexer for ccgo
//

use crate::error::ParseError;
use crate::strings::{StringId, StringTable};

pub use crate::diag::Position;

// ============================================================================
// Token Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Ident,
    Number,
    Char,
    String,
    Special,
    StreamBegin,
    StreamEnd,
}

/// Multi-character punctuators. Single-character punctuators are
/// carried as their ASCII value, so these start at 256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SpecialToken {
    AddAssign = 256, // +=
    Increment,       // ++
    SubAssign,       // -=
    Decrement,       // --
    Arrow,           // ->
    MulAssign,       // *=
    DivAssign,       // /=
    ModAssign,       // %=
    Lte,             // <=
    Gte,             // >=
    Equal,           // ==
    NotEqual,        // !=
    LogicalAnd,      // &&
    AndAssign,       // &=
    LogicalOr,       // ||
    OrAssign,        // |=
    XorAssign,       // ^=
    HashHash,        // ##
    LeftShift,       // <<
    RightShift,      // >>
    DotDot,          // ..
    ShlAssign,       // <<=
    ShrAssign,       // >>=
    Ellipsis,        // ...
}

impl SpecialToken {
    pub const BASE: u32 = 256;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenValue {
    None,
    Number(String),
    Ident(StringId),
    Special(u32),
    String(String),
    Char(String),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub typ: TokenType,
    pub pos: Position,
    pub value: TokenValue,
}

impl Token {
    pub fn new(typ: TokenType, pos: Position) -> Self {
        Self {
            typ,
            pos,
            value: TokenValue::None,
        }
    }

    pub fn with_value(typ: TokenType, pos: Position, value: TokenValue) -> Self {
        Self { typ, pos, value }
    }

    pub fn is_special(&self, code: u32) -> bool {
        matches!(self.value, TokenValue::Special(c) if c == code)
    }

    pub fn ident(&self) -> Option<StringId> {
        match self.value {
            TokenValue::Ident(id) => Some(id),
            _ => None,
        }
    }
}

// ============================================================================
// Character Classification
// ============================================================================

const LETTER: u8 = 1;
const DIGIT: u8 = 2;
const EXP: u8 = 4;
const DOT: u8 = 8;
const VALID_SECOND: u8 = 16;

fn char_class(c: u8) -> u8 {
    match c {
        b'0'..=b'9' => DIGIT,
        b'E' | b'P' | b'e' | b'p' => LETTER | EXP,
        b'A'..=b'Z' | b'a'..=b'z' | b'_' | b'$' => LETTER,
        b'.' => DOT | VALID_SECOND,
        b'=' | b'+' | b'-' | b'>' | b'<' | b'&' | b'|' | b'#' => VALID_SECOND,
        _ => 0,
    }
}

#[inline]
fn is_digit(c: u8) -> bool {
    char_class(c) & DIGIT != 0
}

#[inline]
fn is_letter_or_digit(c: u8) -> bool {
    char_class(c) & (LETTER | DIGIT) != 0
}

// ============================================================================
// Tokenizer
// ============================================================================

const EOF: i32 = -1;

static TWO_CHAR_OPS: &[(u8, u8, SpecialToken)] = &[
    (b'+', b'=', SpecialToken::AddAssign),
    (b'+', b'+', SpecialToken::Increment),
    (b'-', b'=', SpecialToken::SubAssign),
    (b'-', b'-', SpecialToken::Decrement),
    (b'-', b'>', SpecialToken::Arrow),
    (b'*', b'=', SpecialToken::MulAssign),
    (b'/', b'=', SpecialToken::DivAssign),
    (b'%', b'=', SpecialToken::ModAssign),
    (b'<', b'=', SpecialToken::Lte),
    (b'>', b'=', SpecialToken::Gte),
    (b'=', b'=', SpecialToken::Equal),
    (b'!', b'=', SpecialToken::NotEqual),
    (b'&', b'&', SpecialToken::LogicalAnd),
    (b'&', b'=', SpecialToken::AndAssign),
    (b'|', b'|', SpecialToken::LogicalOr),
    (b'|', b'=', SpecialToken::OrAssign),
    (b'^', b'=', SpecialToken::XorAssign),
    (b'#', b'#', SpecialToken::HashHash),
    (b'<', b'<', SpecialToken::LeftShift),
    (b'>', b'>', SpecialToken::RightShift),
    (b'.', b'.', SpecialToken::DotDot),
];

/// Tokenizer over one source buffer. Backslash-newline pairs are spliced
/// away before anything else sees the characters.
pub struct Tokenizer<'a, 'b> {
    buffer: &'a [u8],
    offset: usize,

    stream_id: u16,
    line: u32,
    col: u16,
    newline: bool,
    whitespace: bool,

    strings: &'b mut StringTable,
}

impl<'a, 'b> Tokenizer<'a, 'b> {
    pub fn new(buffer: &'a [u8], stream_id: u16, strings: &'b mut StringTable) -> Self {
        Self {
            buffer,
            offset: 0,
            stream_id,
            line: 1,
            col: 0,
            newline: true,
            whitespace: false,
            strings,
        }
    }

    fn pos(&self) -> Position {
        let mut pos = Position::new(self.stream_id, self.line, self.col);
        pos.newline = self.newline;
        pos.whitespace = self.whitespace;
        pos
    }

    /// Length of a line splice starting at `offset`, or 0
    fn splice_len(&self, offset: usize) -> usize {
        if self.buffer.get(offset) != Some(&b'\\') {
            return 0;
        }
        match self.buffer.get(offset + 1) {
            Some(b'\n') => 2,
            Some(b'\r') if self.buffer.get(offset + 2) == Some(&b'\n') => 3,
            Some(b'\r') => 2,
            _ => 0,
        }
    }

    fn nextchar(&mut self) -> i32 {
        loop {
            let splice = self.splice_len(self.offset);
            if splice > 0 {
                self.offset += splice;
                self.line += 1;
                self.col = 0;
                continue;
            }

            let Some(&c) = self.buffer.get(self.offset) else {
                return EOF;
            };
            self.offset += 1;

            match c {
                b'\r' | b'\n' => {
                    if c == b'\r' && self.buffer.get(self.offset) == Some(&b'\n') {
                        self.offset += 1;
                    }
                    self.line += 1;
                    self.col = 0;
                    self.newline = true;
                    return b'\n' as i32;
                }
                b'\t' => self.col = (self.col + 8) & !7,
                _ => self.col = self.col.saturating_add(1),
            }
            return c as i32;
        }
    }

    fn peekchar(&self) -> i32 {
        let mut offset = self.offset;
        loop {
            let splice = self.splice_len(offset);
            if splice == 0 {
                break;
            }
            offset += splice;
        }
        match self.buffer.get(offset) {
            None => EOF,
            Some(b'\r') => b'\n' as i32,
            Some(&c) => c as i32,
        }
    }

    fn skip_whitespace(&mut self) -> i32 {
        loop {
            let c = self.nextchar();
            match c {
                EOF => return EOF,
                0x20 | 0x09 | 0x0B | 0x0C => self.whitespace = true,
                0x0A => {
                    self.newline = true;
                    self.whitespace = true;
                }
                _ => return c,
            }
        }
    }

    /// pp-number: digit | . digit | pp-number (digit|letter|.|[eEpP][+-])
    fn get_number(&mut self, first: u8) -> Token {
        let pos = self.pos();
        let mut num = String::new();
        num.push(first as char);

        loop {
            let c = self.peekchar();
            if c == EOF {
                break;
            }
            let class = char_class(c as u8);
            if class & (DIGIT | LETTER | DOT) == 0 {
                break;
            }
            self.nextchar();
            num.push(c as u8 as char);

            if class & EXP != 0 {
                let sign = self.peekchar();
                if sign == b'+' as i32 || sign == b'-' as i32 {
                    num.push(self.nextchar() as u8 as char);
                }
            }
        }

        Token::with_value(TokenType::Number, pos, TokenValue::Number(num))
    }

    fn get_identifier(&mut self, first: u8) -> Result<Token, ParseError> {
        let pos = self.pos();
        let mut name = String::new();
        name.push(first as char);

        loop {
            let c = self.peekchar();
            if c == EOF || !is_letter_or_digit(c as u8) {
                // encoding prefixes: L"", u"", U"", u8""
                if (c == b'"' as i32 || c == b'\'' as i32)
                    && matches!(name.as_str(), "L" | "u" | "U" | "u8")
                {
                    self.nextchar();
                    return self.get_string_or_char(c as u8, pos);
                }
                break;
            }
            self.nextchar();
            name.push(c as u8 as char);
        }

        let id = self.strings.intern(&name);
        Ok(Token::with_value(TokenType::Ident, pos, TokenValue::Ident(id)))
    }

    fn get_string_or_char(&mut self, delim: u8, pos: Position) -> Result<Token, ParseError> {
        let mut content = String::new();
        let mut escape = false;

        loop {
            let c = self.nextchar();
            if c == EOF || c == b'\n' as i32 {
                return Err(ParseError::new(
                    format!("missing terminating {} character", delim as char),
                    pos,
                ));
            }
            let cu = c as u8;

            if escape {
                content.push(cu as char);
                escape = false;
                continue;
            }
            if cu == b'\\' {
                content.push('\\');
                escape = true;
                continue;
            }
            if cu == delim {
                break;
            }
            content.push(cu as char);
        }

        Ok(if delim == b'"' {
            Token::with_value(TokenType::String, pos, TokenValue::String(content))
        } else {
            Token::with_value(TokenType::Char, pos, TokenValue::Char(content))
        })
    }

    fn skip_line_comment(&mut self) {
        loop {
            let c = self.nextchar();
            if c == EOF || c == b'\n' as i32 {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self, pos: Position) -> Result<(), ParseError> {
        let mut next = self.nextchar();
        loop {
            let curr = next;
            if curr == EOF {
                return Err(ParseError::new("unterminated comment", pos));
            }
            next = self.nextchar();
            if curr == b'*' as i32 && next == b'/' as i32 {
                break;
            }
        }
        // a comment spanning lines does not start a new logical line
        self.newline = pos.newline;
        self.whitespace = true;
        Ok(())
    }

    fn special(pos: Position, code: u32) -> Token {
        Token::with_value(TokenType::Special, pos, TokenValue::Special(code))
    }

    /// Operators, punctuators, literals and comments. Comments yield None.
    fn get_special(&mut self, first: u8) -> Result<Option<Token>, ParseError> {
        let pos = self.pos();

        if first == b'"' || first == b'\'' {
            return self.get_string_or_char(first, pos).map(Some);
        }

        if first == b'.' {
            let next = self.peekchar();
            if next != EOF && is_digit(next as u8) {
                return Ok(Some(self.get_number(first)));
            }
        }

        if first == b'/' {
            let next = self.peekchar();
            if next == b'/' as i32 {
                self.nextchar();
                self.skip_line_comment();
                return Ok(None);
            }
            if next == b'*' as i32 {
                self.nextchar();
                self.skip_block_comment(pos)?;
                return Ok(None);
            }
        }

        let next = self.peekchar();
        if next != EOF && char_class(next as u8) & VALID_SECOND != 0 {
            let second = next as u8;
            if let Some(&(_, _, op)) = TWO_CHAR_OPS
                .iter()
                .find(|(c0, c1, _)| *c0 == first && *c1 == second)
            {
                self.nextchar();
                let third = self.peekchar();
                let three = match op {
                    SpecialToken::LeftShift if third == b'=' as i32 => Some(SpecialToken::ShlAssign),
                    SpecialToken::RightShift if third == b'=' as i32 => {
                        Some(SpecialToken::ShrAssign)
                    }
                    SpecialToken::DotDot if third == b'.' as i32 => Some(SpecialToken::Ellipsis),
                    _ => None,
                };
                if let Some(op3) = three {
                    self.nextchar();
                    return Ok(Some(Self::special(pos, op3 as u32)));
                }
                return Ok(Some(Self::special(pos, op as u32)));
            }
        }

        Ok(Some(Self::special(pos, first as u32)))
    }

    fn get_one_token(&mut self, c: u8) -> Result<Option<Token>, ParseError> {
        let class = char_class(c);
        if class & DIGIT != 0 {
            return Ok(Some(self.get_number(c)));
        }
        if class & LETTER != 0 {
            return self.get_identifier(c).map(Some);
        }
        self.get_special(c)
    }

    /// Tokenize the whole buffer, bracketed by StreamBegin/StreamEnd
    pub fn tokenize(&mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = vec![Token::new(TokenType::StreamBegin, self.pos())];

        loop {
            let c = self.skip_whitespace();
            if c == EOF {
                break;
            }
            if let Some(token) = self.get_one_token(c as u8)? {
                tokens.push(token);
                self.newline = false;
                self.whitespace = false;
            }
        }

        tokens.push(Token::new(TokenType::StreamEnd, self.pos()));
        Ok(tokens)
    }
}

// ============================================================================
// Token Display
// ============================================================================

pub fn show_special(value: u32) -> String {
    if value < SpecialToken::BASE {
        return (value as u8 as char).to_string();
    }
    let text = TWO_CHAR_OPS
        .iter()
        .find(|(_, _, op)| *op as u32 == value)
        .map(|(c0, c1, _)| format!("{}{}", *c0 as char, *c1 as char));
    match text {
        Some(s) => s,
        None if value == SpecialToken::ShlAssign as u32 => "<<=".to_string(),
        None if value == SpecialToken::ShrAssign as u32 => ">>=".to_string(),
        None if value == SpecialToken::Ellipsis as u32 => "...".to_string(),
        None => format!("<special:{}>", value),
    }
}

/// Source spelling of a token
pub fn show_token(token: &Token, strings: &StringTable) -> String {
    match &token.value {
        TokenValue::Ident(id) => strings.get(*id).to_string(),
        TokenValue::Number(n) => n.clone(),
        TokenValue::String(s) => format!("\"{}\"", s),
        TokenValue::Char(s) => format!("'{}'", s),
        TokenValue::Special(v) => show_special(*v),
        TokenValue::None => match token.typ {
            TokenType::StreamBegin => "<STREAM_BEGIN>".to_string(),
            TokenType::StreamEnd => "<STREAM_END>".to_string(),
            _ => String::new(),
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize_str(input: &str) -> (Vec<Token>, StringTable) {
        let mut strings = StringTable::new();
        let tokens = Tokenizer::new(input.as_bytes(), 0, &mut strings)
            .tokenize()
            .unwrap();
        (tokens, strings)
    }

    fn spellings(input: &str) -> Vec<String> {
        let (tokens, strings) = tokenize_str(input);
        tokens[1..tokens.len() - 1]
            .iter()
            .map(|t| show_token(t, &strings))
            .collect()
    }

    #[test]
    fn test_prototype() {
        assert_eq!(
            spellings("int64_t add(int64_t a, int64_t b);"),
            vec!["int64_t", "add", "(", "int64_t", "a", ",", "int64_t", "b", ")", ";"]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            spellings("123 0x1F 3.14 1e+10 .5e-3 42UL"),
            vec!["123", "0x1F", "3.14", "1e+10", ".5e-3", "42UL"]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            spellings("-> ... << <<= >>= ## && || != .."),
            vec!["->", "...", "<<", "<<=", ">>=", "##", "&&", "||", "!=", ".."]
        );
    }

    #[test]
    fn test_comments_removed() {
        assert_eq!(spellings("a // line\nb /* block\n */ c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_line_splice() {
        assert_eq!(spellings("in\\\nt x"), vec!["int", "x"]);
    }

    #[test]
    fn test_strings_and_chars() {
        let (tokens, _) = tokenize_str(r#""hello\"x" 'a' L"wide""#);
        assert_eq!(tokens[1].value, TokenValue::String("hello\\\"x".to_string()));
        assert_eq!(tokens[2].typ, TokenType::Char);
        assert_eq!(tokens[3].value, TokenValue::String("wide".to_string()));
    }

    #[test]
    fn test_positions() {
        let (tokens, _) = tokenize_str("void bad(float x);\n  int y;");
        // "float" starts at column 10 on line 1
        assert_eq!(tokens[4].pos.line, 1);
        assert_eq!(tokens[4].pos.col, 10);
        // "int" on line 2, column 3
        assert_eq!(tokens[8].pos.line, 2);
        assert_eq!(tokens[8].pos.col, 3);
        assert!(tokens[8].pos.newline);
        assert!(!tokens[4].pos.newline);
    }

    #[test]
    fn test_tab_column() {
        let (tokens, _) = tokenize_str("\tx");
        assert_eq!(tokens[1].pos.col, 9);
    }

    #[test]
    fn test_newline_flag_first_token() {
        let (tokens, _) = tokenize_str("#define X");
        assert!(tokens[1].pos.newline);
        assert!(!tokens[2].pos.newline);
    }

    #[test]
    fn test_function_macro_whitespace_flag() {
        let (tokens, _) = tokenize_str("#define F(x) x\n#define G (x)");
        // F( has no whitespace before '('
        assert!(!tokens[4].pos.whitespace);
        // G (x) does
        assert!(tokens[11].pos.whitespace);
    }

    #[test]
    fn test_unterminated_comment() {
        let mut strings = StringTable::new();
        let err = Tokenizer::new(b"int x; /* never closed", 0, &mut strings)
            .tokenize()
            .unwrap_err();
        assert_eq!(err.message, "unterminated comment");
        assert_eq!(err.pos.line, 1);
        assert_eq!(err.pos.col, 8);
    }

    #[test]
    fn test_unterminated_string() {
        let mut strings = StringTable::new();
        let err = Tokenizer::new(b"char *s = \"abc\n;", 0, &mut strings)
            .tokenize()
            .unwrap_err();
        assert_eq!(err.message, "missing terminating \" character");
    }
}
