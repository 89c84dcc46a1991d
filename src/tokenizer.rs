//! Quote-aware `key=value` scanner.
//!
//! Keys are runs of anything except whitespace, `=` and `"`. A value is
//! either a double-quoted string with backslash escapes or a run of
//! non-whitespace. Every other whitespace-delimited token is a bare word.
//! Scanning never fails; malformed pieces degrade to bare words or to a
//! value running to the end of the input.

use std::iter::Peekable;
use std::str::CharIndices;

/// Result of scanning one payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tokens {
    /// `key=value` pairs in input order, duplicates kept.
    pub pairs: Vec<(String, String)>,
    /// Tokens that were not part of a pair, verbatim and in order.
    pub bare: Vec<String>,
}

impl Tokens {
    /// Bare words joined by single spaces.
    pub fn message(&self) -> String {
        self.bare.join(" ")
    }

    /// Value of the last non-empty pair whose key matches `key`, ignoring
    /// ASCII case.
    pub fn value_of(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, v)| k.eq_ignore_ascii_case(key) && !v.is_empty())
            .map(|(_, v)| v.as_str())
    }
}

pub fn tokenize(input: &str) -> Tokens {
    Scanner::new(input).run()
}

struct Scanner<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
    tokens: Tokens,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
            tokens: Tokens::default(),
        }
    }

    fn run(mut self) -> Tokens {
        while let Some(&(start, c)) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }

            if c == '=' || c == '"' {
                let end = self.skip_word();
                self.bare(start, end);
                continue;
            }

            self.scan_key_value(start);
        }

        self.tokens
    }

    fn scan_key_value(&mut self, start: usize) {
        let key_end = self.advance_while(|c| !c.is_whitespace() && c != '=' && c != '"');

        match self.chars.peek() {
            Some(&(_, '=')) => {
                self.chars.next();
            }
            Some(&(_, '"')) => {
                // `key"...` is not a pair
                let end = self.skip_word();
                self.bare(start, end);
                return;
            }
            _ => {
                self.bare(start, key_end);
                return;
            }
        }

        let key = self.input[start..key_end].to_string();
        let value = match self.chars.peek() {
            Some(&(_, '"')) => {
                self.chars.next();
                self.quoted()
            }
            Some(&(value_start, c)) if !c.is_whitespace() => {
                let end = self.skip_word();
                self.input[value_start..end].to_string()
            }
            _ => String::new(),
        };

        self.tokens.pairs.push((key, value));
    }

    /// Read a quoted value after its opening quote. An unterminated quote
    /// takes the rest of the input.
    fn quoted(&mut self) -> String {
        let mut value = String::new();

        while let Some((_, c)) = self.chars.next() {
            match c {
                '"' => break,
                '\\' => match self.chars.next() {
                    Some((_, escaped)) => self.unescape(escaped, &mut value),
                    None => value.push('\\'),
                },
                c => value.push(c),
            }
        }

        value
    }

    fn unescape(&mut self, escaped: char, out: &mut String) {
        match escaped {
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'u' => match self.unicode_escape() {
                Some(c) => out.push(c),
                None => out.push_str("\\u"),
            },
            other => out.push(other),
        }
    }

    fn unicode_escape(&mut self) -> Option<char> {
        let mut code = 0u32;
        let mut probe = self.chars.clone();
        for _ in 0..4 {
            let (_, c) = probe.next()?;
            code = code * 16 + c.to_digit(16)?;
        }
        let c = char::from_u32(code)?;
        self.chars = probe;
        Some(c)
    }

    fn advance_while(&mut self, keep: impl Fn(char) -> bool) -> usize {
        while let Some(&(i, c)) = self.chars.peek() {
            if !keep(c) {
                return i;
            }
            self.chars.next();
        }
        self.input.len()
    }

    fn skip_word(&mut self) -> usize {
        self.advance_while(|c| !c.is_whitespace())
    }

    fn bare(&mut self, start: usize, end: usize) {
        if end > start {
            self.tokens.bare.push(self.input[start..end].to_string());
        }
    }
}
