// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tidemark-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tidemark and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use std::fmt;

use smallvec::SmallVec;

use super::{strip_reference_markers, CommandValidator, Completeness};

/// Operators and keywords that cannot end a complete expression.
const DANGLING_TAIL: &[&str] = &[
    "=", "==", "!=", "===", "!==", "=~", "|>", "<>", "++", "--", "+", "-", "*", "/", ",", "->",
    "<-", "=>", "&&", "||", "|", "\\\\", "::", ".", "..", "<", "<=", "^", "&&&", "|||", "~>",
    "<~", "and", "or", "when", "in", "not",
];

const OPERATOR_CHARS: &str = "=|<>+-*/\\&!.:^~@%";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Paren,
    Bracket,
    Brace,
    Bits,
    Block,
}

impl Frame {
    fn closer(self) -> &'static str {
        match self {
            Self::Paren => ")",
            Self::Bracket => "]",
            Self::Brace => "}",
            Self::Bits => ">>",
            Self::Block => "end",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    /// Input ended inside an open construct or after a dangling operator.
    Incomplete,
    /// A closer that does not match the innermost open construct.
    Unbalanced { found: String, expected: Option<&'static str> },
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Incomplete => f.write_str("incomplete input"),
            Self::Unbalanced {
                found,
                expected: Some(expected),
            } => write!(f, "unexpected {found:?}, expected {expected:?}"),
            Self::Unbalanced {
                found,
                expected: None,
            } => write!(f, "unexpected {found:?}"),
        }
    }
}

impl std::error::Error for ScanError {}

/// Structural completeness check for Elixir-style expressions.
///
/// Tracks brackets, binaries, `do`/`fn` … `end` blocks, strings, heredocs, sigils, char
/// literals, comments and string interpolation, and treats a trailing binary operator as a
/// request for more input. It does not build an AST.
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimiterValidator;

impl DelimiterValidator {
    pub fn scan(&self, text: &str) -> Result<(), ScanError> {
        let prepared = strip_reference_markers(text);
        let chars: Vec<char> = prepared.chars().collect();
        let mut scanner = Scanner { chars, pos: 0 };
        scanner.scan_code(false)
    }
}

impl CommandValidator for DelimiterValidator {
    fn is_complete(&self, text: &str) -> bool {
        self.scan(text).is_ok()
    }

    fn check(&self, text: &str) -> Completeness {
        match self.scan(text) {
            Ok(()) => Completeness::Complete,
            Err(ScanError::Incomplete) => Completeness::Incomplete,
            Err(ScanError::Unbalanced { .. }) => Completeness::Invalid,
        }
    }
}

struct Scanner {
    chars: Vec<char>,
    pos: usize,
}

impl Scanner {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn starts_with(&self, pattern: &str) -> bool {
        pattern
            .chars()
            .enumerate()
            .all(|(idx, c)| self.peek_at(idx) == Some(c))
    }

    fn prev(&self) -> Option<char> {
        self.pos.checked_sub(1).and_then(|idx| self.chars.get(idx).copied())
    }

    /// Scans code until end of input, or until the `}` closing an interpolation when
    /// `interpolation` is set.
    fn scan_code(&mut self, interpolation: bool) -> Result<(), ScanError> {
        let mut stack: SmallVec<[Frame; 16]> = SmallVec::new();
        let mut last_token = String::new();

        loop {
            let Some(c) = self.peek() else {
                if interpolation || !stack.is_empty() {
                    return Err(ScanError::Incomplete);
                }
                if DANGLING_TAIL.contains(&last_token.as_str()) {
                    return Err(ScanError::Incomplete);
                }
                return Ok(());
            };

            match c {
                c if c.is_whitespace() => self.pos += 1,
                '#' => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.pos += 1;
                    }
                }
                '"' | '\'' => {
                    let triple: String = std::iter::repeat(c).take(3).collect();
                    if self.starts_with(&triple) {
                        self.pos += 3;
                        self.scan_string(&triple, true)?;
                    } else {
                        self.pos += 1;
                        self.scan_string(&c.to_string(), true)?;
                    }
                    last_token = c.to_string();
                }
                '?' => {
                    // Char literal: `?a`, `?\n`, `?(`.
                    self.pos += 1;
                    if self.peek() == Some('\\') {
                        self.pos += 1;
                    }
                    if self.peek().is_none() {
                        return Err(ScanError::Incomplete);
                    }
                    self.pos += 1;
                    last_token = "?".to_owned();
                }
                '~' if self.peek_at(1).is_some_and(|n| n.is_ascii_alphabetic()) => {
                    self.scan_sigil()?;
                    last_token = "~".to_owned();
                }
                '(' | '[' | '{' => {
                    stack.push(match c {
                        '(' => Frame::Paren,
                        '[' => Frame::Bracket,
                        _ => Frame::Brace,
                    });
                    self.pos += 1;
                    last_token = c.to_string();
                }
                '<' if self.peek_at(1) == Some('<') && self.peek_at(2) != Some('<') => {
                    stack.push(Frame::Bits);
                    self.pos += 2;
                    last_token = "<<".to_owned();
                }
                '>' if self.peek_at(1) == Some('>') && stack.last() == Some(&Frame::Bits) => {
                    stack.pop();
                    self.pos += 2;
                    last_token = ">>".to_owned();
                }
                '}' if interpolation && stack.is_empty() => {
                    self.pos += 1;
                    return Ok(());
                }
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => Frame::Paren,
                        ']' => Frame::Bracket,
                        _ => Frame::Brace,
                    };
                    match stack.pop() {
                        Some(frame) if frame == expected => {}
                        other => {
                            return Err(ScanError::Unbalanced {
                                found: c.to_string(),
                                expected: other.map(Frame::closer),
                            })
                        }
                    }
                    self.pos += 1;
                    last_token = c.to_string();
                }
                ',' | ';' => {
                    self.pos += 1;
                    last_token = c.to_string();
                }
                c if c.is_alphanumeric() || c == '_' => {
                    let word = self.scan_word();
                    self.apply_keyword(&word, &mut stack)?;
                    last_token = word;
                }
                c if OPERATOR_CHARS.contains(c) => {
                    let start = self.pos;
                    while self.peek().is_some_and(|c| OPERATOR_CHARS.contains(c)) {
                        // `<<` inside an operator run still opens a binary, e.g. `a = <<1>>`.
                        if self.pos > start && self.starts_with("<<") {
                            break;
                        }
                        self.pos += 1;
                    }
                    last_token = self.chars[start..self.pos].iter().collect();
                }
                _ => {
                    self.pos += 1;
                    last_token = c.to_string();
                }
            }
        }
    }

    fn scan_word(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        if matches!(self.peek(), Some('?' | '!')) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    fn apply_keyword(
        &self,
        word: &str,
        stack: &mut SmallVec<[Frame; 16]>,
    ) -> Result<(), ScanError> {
        let start = self.pos - word.chars().count();
        let qualified = start
            .checked_sub(1)
            .and_then(|idx| self.chars.get(idx))
            .is_some_and(|c| matches!(c, '.' | ':'));
        // `do:` / `end:` keyword-list keys are not block keywords.
        let keyword_key = self.peek() == Some(':') && self.peek_at(1) != Some(':');
        if qualified || keyword_key {
            return Ok(());
        }

        match word {
            "do" | "fn" => stack.push(Frame::Block),
            "end" => match stack.pop() {
                Some(Frame::Block) => {}
                other => {
                    return Err(ScanError::Unbalanced {
                        found: "end".to_owned(),
                        expected: other.map(Frame::closer),
                    })
                }
            },
            _ => {}
        }
        Ok(())
    }

    fn scan_string(&mut self, terminator: &str, interpolate: bool) -> Result<(), ScanError> {
        loop {
            let Some(c) = self.peek() else {
                return Err(ScanError::Incomplete);
            };
            if self.starts_with(terminator) {
                self.pos += terminator.chars().count();
                return Ok(());
            }
            match c {
                '\\' => self.pos += 2,
                '#' if interpolate && self.peek_at(1) == Some('{') => {
                    self.pos += 2;
                    self.scan_code(true)?;
                }
                _ => self.pos += 1,
            }
        }
    }

    fn scan_sigil(&mut self) -> Result<(), ScanError> {
        self.pos += 1;
        let lowercase = self.peek().is_some_and(|c| c.is_ascii_lowercase());
        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        let Some(open) = self.peek() else {
            return Err(ScanError::Incomplete);
        };

        let triple: String = std::iter::repeat(open).take(3).collect();
        if matches!(open, '"' | '\'') && self.starts_with(&triple) {
            self.pos += 3;
            self.scan_string(&triple, lowercase)?;
        } else {
            let close = match open {
                '(' => ')',
                '[' => ']',
                '{' => '}',
                '<' => '>',
                other => other,
            };
            self.pos += 1;
            self.scan_string(&close.to_string(), lowercase)?;
        }

        while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.pos += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{DelimiterValidator, ScanError};
    use crate::validate::{CommandValidator, Completeness};

    #[rstest]
    #[case("1 + 2")]
    #[case("Enum.map([1, 2, 3], fn x -> x * 2 end)")]
    #[case("if true do\n  :yes\nelse\n  :no\nend")]
    #[case("%{a: 1, do: 2}")]
    #[case("\"interpolated #{inspect(%{a: \"}\"})}\"")]
    #[case("<<1, 2, 3>>")]
    #[case("bin = <<0::size(8)>>")]
    #[case("~r/(a|b)+/i")]
    #[case("~s(nested \"quotes\")")]
    #[case("?( == 40")]
    #[case("valid? = true")]
    #[case("send(#PID<0.110.0>, :ping)")]
    #[case("x = 1 # trailing comment with (")]
    #[case("\"\"\"\nheredoc (\n\"\"\"")]
    #[case("")]
    fn complete_inputs(#[case] text: &str) {
        assert!(DelimiterValidator.is_complete(text), "expected complete: {text:?}");
    }

    #[rstest]
    #[case("Enum.map([1, 2, 3],")]
    #[case("defmodule Foo do")]
    #[case("fn x ->")]
    #[case("x =")]
    #[case("list\n|>")]
    #[case("\"unterminated")]
    #[case("\"\"\"\nopen heredoc")]
    #[case("<<1, 2")]
    #[case("%{a: 1")]
    #[case("\"#{open")]
    #[case("a and")]
    fn incomplete_inputs(#[case] text: &str) {
        assert!(!DelimiterValidator.is_complete(text), "expected incomplete: {text:?}");
    }

    #[test]
    fn reports_mismatched_closers() {
        assert_eq!(
            DelimiterValidator.scan("foo(]"),
            Err(ScanError::Unbalanced {
                found: "]".to_owned(),
                expected: Some(")"),
            })
        );
        assert_eq!(
            DelimiterValidator.scan("x end"),
            Err(ScanError::Unbalanced {
                found: "end".to_owned(),
                expected: None,
            })
        );
    }

    #[rstest]
    #[case("1 + 2", Completeness::Complete)]
    #[case("Enum.map([1,", Completeness::Incomplete)]
    #[case("foo(]", Completeness::Invalid)]
    #[case("x end", Completeness::Invalid)]
    fn check_separates_dead_ends_from_partial_input(
        #[case] text: &str,
        #[case] expected: Completeness,
    ) {
        assert_eq!(DelimiterValidator.check(text), expected);
    }

    #[test]
    fn keyword_and_qualified_block_words_are_plain() {
        assert!(DelimiterValidator.is_complete("if x, do: 1, else: 2"));
        assert!(DelimiterValidator.is_complete("opts[:do]"));
        assert!(DelimiterValidator.is_complete("Kernel.fn"));
    }
}
