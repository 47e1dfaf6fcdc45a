//! Code payload extraction from model responses.

use std::sync::OnceLock;

use regex::Regex;

fn closed_fence() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[^\n`]*\r?\n(.*?)\r?\n[ \t]*```").ok())
        .as_ref()
}

fn open_fence() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[^\n`]*\r?\n(.*)").ok())
        .as_ref()
}

fn captured<'a>(re: Option<&Regex>, text: &'a str) -> Option<&'a str> {
    re?.captures(text)?.get(1).map(|m| m.as_str())
}

/// Return the body of the first fenced code block, or the trimmed text when
/// there is none.
///
/// A fence only closes at the start of a line, so backticks inside the code
/// stay part of it. A block left open runs to the end of the response.
pub fn extract_code(response: &str) -> String {
    if let Some(body) = captured(closed_fence(), response) {
        return body.to_string();
    }
    match captured(open_fence(), response) {
        Some(rest) => {
            let rest = rest.trim_end();
            rest.strip_suffix("```").unwrap_or(rest).trim_end().to_string()
        }
        None => response.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_fenced_block_wins() {
        let response = "Here you go:\n```rust\n#![no_std]\nfn a() {}\n```\nAnd tests:\n```rust\nfn b() {}\n```\n";
        assert_eq!(extract_code(response), "#![no_std]\nfn a() {}");
    }

    #[test]
    fn test_untagged_fence() {
        assert_eq!(extract_code("```\nlet x = 1;\n```"), "let x = 1;");
    }

    #[test]
    fn test_no_fence_returns_trimmed_text() {
        assert_eq!(extract_code("\n\n  #![no_std]\nfn main() {}  \n"), "#![no_std]\nfn main() {}");
    }

    #[test]
    fn test_crlf_fences() {
        assert_eq!(extract_code("```rust\r\nfn a() {}\r\n```"), "fn a() {}");
    }

    #[test]
    fn test_inline_backticks_stay_in_block() {
        let response = "Here:\n```rust\n#![no_std]\n/// Example: ```let x = 1;```\n#[multiversx_sc::contract]\npub trait A {}\n```\n";
        assert_eq!(
            extract_code(response),
            "#![no_std]\n/// Example: ```let x = 1;```\n#[multiversx_sc::contract]\npub trait A {}"
        );
    }

    #[test]
    fn test_doc_test_fence_inside_block() {
        let response = "```rust\n/// ```\n/// let a = 1;\n/// ```\nfn a() {}\n```";
        assert_eq!(extract_code(response), "/// ```\n/// let a = 1;\n/// ```\nfn a() {}");
    }

    #[test]
    fn test_unclosed_block_runs_to_end() {
        assert_eq!(extract_code("```rust\nfn a() {}\n"), "fn a() {}");
        assert_eq!(extract_code("```rust\nfn a() {}```"), "fn a() {}");
    }
}
