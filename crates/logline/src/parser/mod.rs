/// Log line parsing module
///
/// Turns one raw access-log line into its ordered list of field values.
/// Nothing in here knows field names; that is the job of `format` and
/// `record`.
///
/// # Architecture
///
/// - `token.rs`: flat tokenizer (special tokens, whitespace runs, text runs)
/// - `grammar.rs`: node kinds and their static rules
/// - `stack.rs`: node stack that nests tokens and renders fields
///
/// The tokenizer and the stack never fail. Unterminated quotes or brackets
/// are rendered with whatever they accumulated; malformed lines are caught
/// later by the arity check.

pub mod token;
pub mod grammar;
pub mod stack;

pub use grammar::{Grammar, NodeKind};
pub use stack::NodeStack;
pub use token::Tokenizer;

/// Tokenizer and grammar pair used to split lines into field values.
///
/// Cheap to clone and safe to share between threads; every call to
/// [`LineParser::parse`] builds its own [`NodeStack`].
#[derive(Debug, Clone)]
pub struct LineParser {
    tokenizer: Tokenizer,
    grammar: &'static Grammar,
}

impl LineParser {
    pub fn new(tokenizer: Tokenizer, grammar: &'static Grammar) -> Self {
        Self { tokenizer, grammar }
    }

    pub fn parse(&self, line: &str) -> Vec<String> {
        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        let mut stack = NodeStack::new(self.grammar);
        for token in self.tokenizer.tokenize(line) {
            stack.push(token);
        }
        stack.to_fields()
    }
}

impl Default for LineParser {
    fn default() -> Self {
        Self::new(Tokenizer::log_line(), Grammar::access_log())
    }
}

/// Split an access-log line into its field values (escapes decoded).
pub fn parse(line: &str) -> Vec<String> {
    LineParser::default().parse(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMMON_LINE: &str = r#"192.168.3.4 - quidam [07/Feb/2016:07:39:42 +0900] "GET /index.html HTTP/1.1" 200 432"#;

    #[test]
    fn test_parse_common_line() {
        assert_eq!(
            parse(COMMON_LINE),
            vec![
                "192.168.3.4",
                "-",
                "quidam",
                "07/Feb/2016:07:39:42 +0900",
                "GET /index.html HTTP/1.1",
                "200",
                "432"
            ]
        );
    }

    #[test]
    fn test_parse_strips_line_terminator() {
        let with_crlf = format!("{}\r\n", COMMON_LINE);
        assert_eq!(parse(&with_crlf), parse(COMMON_LINE));
    }

    #[test]
    fn test_parse_combined_line_with_user_agent() {
        let line = r#"192.168.3.4 - quidam [07/Feb/2016:07:39:42 +0900] "GET /index.html HTTP/1.1" 200 432 "http://www.example.org/start.html" "Mozilla/5.0 (X11; U; Linux i686; ja-JP; rv:1.7.5) Gecko/20041108 Firefox/1.0""#;
        let fields = parse(line);
        assert_eq!(fields.len(), 9);
        assert_eq!(fields[7], "http://www.example.org/start.html");
        assert_eq!(
            fields[8],
            "Mozilla/5.0 (X11; U; Linux i686; ja-JP; rv:1.7.5) Gecko/20041108 Firefox/1.0"
        );
    }

    #[test]
    fn test_parse_is_idempotent() {
        assert_eq!(parse(COMMON_LINE), parse(COMMON_LINE));
    }

    #[test]
    fn test_line_parser_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LineParser>();
    }
}
