//! JSONC tolerance: the configuration file and simple-modification values may
//! carry JavaScript-style comments. We strip them (preserving string
//! contents and line numbers) before handing the text to `serde_json`.

use serde_json::Value;

/// Replace `//` line comments and `/* */` block comments with spaces.
/// Newlines inside block comments are kept so parse errors still point at
/// the right line.
pub fn strip_comments(input: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        Str,
        StrEscape,
        LineComment,
        BlockComment,
    }

    let mut output = String::with_capacity(input.len());
    let mut state = State::Code;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '"' => {
                    state = State::Str;
                    output.push(c);
                }
                '/' => match chars.peek() {
                    Some('/') => {
                        chars.next();
                        state = State::LineComment;
                        output.push_str("  ");
                    }
                    Some('*') => {
                        chars.next();
                        state = State::BlockComment;
                        output.push_str("  ");
                    }
                    _ => output.push(c),
                },
                _ => output.push(c),
            },
            State::Str => {
                output.push(c);
                match c {
                    '\\' => state = State::StrEscape,
                    '"' => state = State::Code,
                    _ => {}
                }
            }
            State::StrEscape => {
                output.push(c);
                state = State::Str;
            }
            State::LineComment => {
                if c == '\n' {
                    state = State::Code;
                    output.push(c);
                } else {
                    output.push(' ');
                }
            }
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                    output.push_str("  ");
                } else if c == '\n' {
                    output.push(c);
                } else {
                    output.push(' ');
                }
            }
        }
    }

    output
}

/// Parse JSON that may contain comments.
pub fn parse_jsonc(input: &str) -> Result<Value, serde_json::Error> {
    serde_json::from_str(&strip_comments(input))
}
