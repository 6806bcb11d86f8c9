//! Command-line argument codec.
//!
//! Worker processes receive every value as a single double-quoted
//! command-line token. [`encode_arg_text`] prepares arbitrary text for that
//! position so that, after the platform argument parser has split the line,
//! [`decode_arg_text`] restores the original text exactly.
//!
//! Encoding, in order:
//!
//! 1. Every `[` is doubled, then a literal `\n` already present is escaped
//!    as [`ESCAPED_SLASH_N`].
//! 2. Line separators become a literal `\n`.
//! 3. Backslash runs directly before a `"` are doubled.
//! 4. Every `"` is doubled.
//! 5. A trailing backslash run is doubled.
//!
//! Decoding only reverses steps 1–2; the argument parser undoes 3–5.
//! [`parse_command_line`] implements that parser (Windows C runtime rules),
//! so the same argv is produced on every platform.

use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Placeholder for a literal backslash-n present in the original text.
///
/// Original `[` characters are doubled before the placeholder is inserted,
/// so text that already contains `[SlashN]` still decodes to itself.
pub const ESCAPED_SLASH_N: &str = "[SlashN]";

/// Platform line separator.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";

/// Platform line separator.
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

const SLASH_N: &str = "\\n";

/// Encode text for use inside a double-quoted command-line token.
#[must_use]
pub fn encode_arg_text(original: &str) -> String {
    let result = encode_new_lines(original);
    let result = encode_slashes_before_quotes(&result);
    let result = result.replace('"', "\"\"");
    encode_trailing_slashes(&result)
}

/// Decode a token produced by [`encode_arg_text`] after argument parsing.
///
/// One left-to-right pass: a literal `\n` becomes a line separator, `[[`
/// becomes `[` and [`ESCAPED_SLASH_N`] becomes a literal `\n`.
#[must_use]
#[allow(clippy::expect_used)] // Pattern is a compile-time constant
pub fn decode_arg_text(encoded: &str) -> String {
    static ESCAPES: OnceLock<Regex> = OnceLock::new();
    let re = ESCAPES
        .get_or_init(|| Regex::new(r"\\n|\[\[|\[SlashN\]").expect("escape regex is valid"));

    re.replace_all(encoded, |caps: &Captures| match &caps[0] {
        SLASH_N => LINE_SEPARATOR,
        "[[" => "[",
        _ => SLASH_N,
    })
    .into_owned()
}

/// Encode and wrap text in double quotes.
#[must_use]
pub fn quote_arg(text: &str) -> String {
    format!("\"{}\"", encode_arg_text(text))
}

/// Join tokens into one command line, each encoded and quoted.
#[must_use]
pub fn render_command_line<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|token| quote_arg(token.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Split a command line into arguments using the Windows C runtime rules.
///
/// - Spaces and tabs outside quotes separate arguments.
/// - `2n` backslashes before `"` yield `n` backslashes and the quote toggles
///   quoting; `2n + 1` backslashes yield `n` backslashes and a literal `"`.
/// - Backslashes not followed by `"` are literal.
/// - Inside quotes, `""` yields a literal `"`.
#[must_use]
pub fn parse_command_line(line: &str) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let run = chars[i..].iter().take_while(|&&c| c == '\\').count();
                i += run;
                in_token = true;
                if chars.get(i) == Some(&'"') {
                    current.extend(std::iter::repeat_n('\\', run / 2));
                    if run % 2 == 1 {
                        current.push('"');
                        i += 1;
                    }
                } else {
                    current.extend(std::iter::repeat_n('\\', run));
                }
                continue;
            }
            '"' => {
                in_token = true;
                if in_quotes && chars.get(i + 1) == Some(&'"') {
                    current.push('"');
                    i += 2;
                    continue;
                }
                in_quotes = !in_quotes;
            }
            ' ' | '\t' if !in_quotes => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
        i += 1;
    }

    if in_token {
        args.push(current);
    }

    args
}

fn encode_new_lines(original: &str) -> String {
    original
        .replace('[', "[[")
        .replace(SLASH_N, ESCAPED_SLASH_N)
        .replace(LINE_SEPARATOR, SLASH_N)
}

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
fn encode_slashes_before_quotes(original: &str) -> String {
    static SLASHES_BEFORE_QUOTE: OnceLock<Regex> = OnceLock::new();
    let re = SLASHES_BEFORE_QUOTE
        .get_or_init(|| Regex::new(r#"\\+""#).expect("slash-quote regex is valid"));

    re.replace_all(original, |caps: &Captures| {
        let slashes = caps[0].trim_end_matches('"');
        format!("{slashes}{slashes}\"")
    })
    .into_owned()
}

#[allow(clippy::expect_used)] // Pattern is a compile-time constant
fn encode_trailing_slashes(original: &str) -> String {
    static TRAILING_SLASHES: OnceLock<Regex> = OnceLock::new();
    let re = TRAILING_SLASHES
        .get_or_init(|| Regex::new(r"\\+$").expect("trailing-slash regex is valid"));

    re.replace(original, |caps: &Captures| format!("{0}{0}", &caps[0]))
        .into_owned()
}
