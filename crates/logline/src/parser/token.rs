//! Token: splits a raw log line into special tokens, whitespace runs and text runs.
//!
//! The tokenizer knows nothing about nesting. It only guarantees that the
//! emitted tokens cover the input exactly once, in order.

/// Special tokens of the access-log grammar.
pub const LOG_LINE_SPECIAL_TOKENS: &[&str] = &["[", "]", "-", "\\", "\""];

/// Tokenizer over a fixed alphabet of special tokens plus whitespace runs.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    /// Sorted longest-first so that a shorter token never shadows a longer one.
    specials: Vec<&'static str>,
}

impl Tokenizer {
    pub fn new(special_tokens: &[&'static str]) -> Self {
        let mut specials: Vec<&'static str> = special_tokens
            .iter()
            .copied()
            .filter(|t| !t.is_empty())
            .collect();
        specials.sort_by(|a, b| b.len().cmp(&a.len()));
        Self { specials }
    }

    /// Tokenizer for Apache/NCSA access log lines.
    pub fn log_line() -> Self {
        Self::new(LOG_LINE_SPECIAL_TOKENS)
    }

    /// Iterate over the tokens of `line`.
    pub fn tokenize<'t, 'a>(&'t self, line: &'a str) -> Tokens<'t, 'a> {
        Tokens {
            tokenizer: self,
            rest: line,
        }
    }

    /// Length in bytes of a special token or whitespace run at the start of `s`.
    fn match_at(&self, s: &str) -> Option<usize> {
        if let Some(special) = self.specials.iter().find(|t| s.starts_with(**t)) {
            return Some(special.len());
        }
        let run = s
            .char_indices()
            .find(|(_, c)| !is_whitespace(*c))
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        if run > 0 {
            Some(run)
        } else {
            None
        }
    }

    /// Byte offset of the next position where a special token or whitespace begins.
    fn scan_until(&self, s: &str) -> usize {
        s.char_indices()
            .skip(1)
            .find(|(i, _)| self.match_at(&s[*i..]).is_some())
            .map(|(i, _)| i)
            .unwrap_or(s.len())
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::log_line()
    }
}

/// Whitespace as understood by the log grammar (ASCII whitespace and vertical tab).
pub fn is_whitespace(c: char) -> bool {
    c.is_ascii_whitespace() || c == '\x0b'
}

/// True when `token` is a non-empty whitespace run.
pub fn is_whitespace_token(token: &str) -> bool {
    !token.is_empty() && token.chars().all(is_whitespace)
}

/// Borrowing iterator returned by [`Tokenizer::tokenize`].
pub struct Tokens<'t, 'a> {
    tokenizer: &'t Tokenizer,
    rest: &'a str,
}

impl<'t, 'a> Iterator for Tokens<'t, 'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.rest.is_empty() {
            return None;
        }
        let len = self
            .tokenizer
            .match_at(self.rest)
            .unwrap_or_else(|| self.tokenizer.scan_until(self.rest));
        let (token, rest) = self.rest.split_at(len);
        self.rest = rest;
        Some(token)
    }
}
