//! Diagnostics extraction from build output.
//!
//! Extraction is a best-effort heuristic over text. It never fails: output
//! without recognizable diagnostics yields an empty string.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Pulls error and warning text out of raw build output.
pub trait DiagnosticExtractor: Send + Sync {
    /// Error text in source order, empty when none is found.
    fn errors(&self, output: &str) -> String;

    /// Warning text in source order, empty when none is found.
    fn warnings(&self, output: &str) -> String;
}

/// Collects line runs that start at a marker line and end at the next blank
/// line (inclusive).
#[derive(Debug, Clone)]
pub struct LineScrapeExtractor {
    error_markers: Vec<String>,
    warning_markers: Vec<String>,
}

impl Default for LineScrapeExtractor {
    fn default() -> Self {
        Self {
            error_markers: vec!["error[E".to_string(), "error:".to_string()],
            warning_markers: vec!["warning:".to_string()],
        }
    }
}

impl LineScrapeExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_markers(error_markers: Vec<String>, warning_markers: Vec<String>) -> Self {
        Self {
            error_markers,
            warning_markers,
        }
    }

    fn collect_runs(output: &str, markers: &[String]) -> String {
        let mut collected: Vec<&str> = Vec::new();
        let mut in_run = false;

        for line in output.lines() {
            if markers.iter().any(|m| line.contains(m.as_str())) {
                in_run = true;
            }
            if in_run {
                collected.push(line);
                if line.trim().is_empty() {
                    in_run = false;
                }
            }
        }

        collected.join("\n").trim_end().to_string()
    }
}

impl DiagnosticExtractor for LineScrapeExtractor {
    fn errors(&self, output: &str) -> String {
        Self::collect_runs(output, &self.error_markers)
    }

    fn warnings(&self, output: &str) -> String {
        Self::collect_runs(output, &self.warning_markers)
    }
}

#[derive(Debug, Deserialize)]
struct CargoRecord {
    reason: String,
    message: Option<CargoMessage>,
}

#[derive(Debug, Deserialize)]
struct CargoMessage {
    level: String,
    message: String,
    rendered: Option<String>,
}

/// Reads `cargo --message-format=json` compiler messages.
///
/// Falls back to line scraping when the output carries no JSON records, so
/// it is safe to use with toolchains that ignore the format flag.
#[derive(Debug, Clone, Default)]
pub struct CargoJsonExtractor {
    fallback: LineScrapeExtractor,
}

impl CargoJsonExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect(output: &str, level: &str) -> Option<String> {
        let mut saw_record = false;
        let mut rendered = Vec::new();

        for line in output.lines() {
            let trimmed = line.trim_start();
            if !trimmed.starts_with('{') {
                continue;
            }
            let Ok(record) = serde_json::from_str::<CargoRecord>(trimmed) else {
                continue;
            };
            saw_record = true;
            if record.reason != "compiler-message" {
                continue;
            }
            if let Some(message) = record.message {
                if message.level == level {
                    rendered.push(message.rendered.unwrap_or(message.message).trim_end().to_string());
                }
            }
        }

        saw_record.then(|| rendered.join("\n\n"))
    }
}

impl DiagnosticExtractor for CargoJsonExtractor {
    fn errors(&self, output: &str) -> String {
        Self::collect(output, "error").unwrap_or_else(|| self.fallback.errors(output))
    }

    fn warnings(&self, output: &str) -> String {
        Self::collect(output, "warning").unwrap_or_else(|| self.fallback.warnings(output))
    }
}

/// A rustc error with a code and a source location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompilerDiagnostic {
    pub code: String,
    pub message: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

fn diagnostic_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"error\[(E\d+)\]: (.+)\r?\n\s+-->\s+(.+):(\d+):(\d+)").ok())
        .as_ref()
}

/// Structured `error[Exxxx]` diagnostics found in rustc output.
pub fn parse_compiler_errors(output: &str) -> Vec<CompilerDiagnostic> {
    let Some(re) = diagnostic_regex() else {
        return Vec::new();
    };
    re.captures_iter(output)
        .filter_map(|caps| {
            Some(CompilerDiagnostic {
                code: caps.get(1)?.as_str().to_string(),
                message: caps.get(2)?.as_str().trim().to_string(),
                file: caps.get(3)?.as_str().trim().to_string(),
                line: caps.get(4)?.as_str().parse().ok()?,
                column: caps.get(5)?.as_str().parse().ok()?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_ERRORS: &str = "   Compiling contract v0.0.0\n\
error[E0412]: cannot find type `BigUint` in this scope\n  \
--> src/lib.rs:12:24\n   \
|\n\
12 |     fn execute(&self, amount: BigUint) {\n   \
|                               ^^^^^^^ not found in this scope\n\
\n\
warning: unused variable: `caller`\n  \
--> src/lib.rs:14:13\n\
\n\
error: aborting due to 1 previous error\n\
\n\
Some trailing noise\n";

    #[test]
    fn test_no_markers_yields_empty() {
        let extractor = LineScrapeExtractor::new();
        let output = "Compiling...\nFinished release target\n";
        assert_eq!(extractor.errors(output), "");
        assert_eq!(extractor.warnings(output), "");
        assert_eq!(extractor.errors(""), "");
    }

    #[test]
    fn test_two_error_blocks_in_order() {
        let extractor = LineScrapeExtractor::new();
        let errors = extractor.errors(TWO_ERRORS);

        let first = errors.find("error[E0412]").unwrap();
        let second = errors.find("error: aborting").unwrap();
        assert!(first < second);
        assert!(errors.contains("--> src/lib.rs:12:24"));
        assert!(!errors.contains("warning: unused variable"));
        assert!(!errors.contains("Some trailing noise"));
    }

    #[test]
    fn test_warnings_extracted_separately() {
        let extractor = LineScrapeExtractor::new();
        let warnings = extractor.warnings(TWO_ERRORS);
        assert!(warnings.starts_with("warning: unused variable"));
        assert!(warnings.contains("src/lib.rs:14:13"));
        assert!(!warnings.contains("E0412"));
    }

    #[test]
    fn test_unterminated_block_runs_to_end() {
        let extractor = LineScrapeExtractor::new();
        let errors = extractor.errors("error: linker failed\nnote: see above");
        assert_eq!(errors, "error: linker failed\nnote: see above");
    }

    #[test]
    fn test_malformed_output_does_not_panic() {
        let extractor = CargoJsonExtractor::new();
        let output = "{not json\n\u{0}\u{1}binary garbage\n{\"reason\":";
        assert_eq!(extractor.errors(output), "");
    }

    #[test]
    fn test_cargo_json_records() {
        let output = [
            r#"{"reason":"compiler-artifact","package_id":"x"}"#,
            r#"{"reason":"compiler-message","message":{"level":"warning","message":"unused","rendered":"warning: unused\n"}}"#,
            r#"{"reason":"compiler-message","message":{"level":"error","message":"mismatched types","rendered":"error[E0308]: mismatched types\n"}}"#,
            r#"{"reason":"build-finished","success":false}"#,
        ]
        .join("\n");

        let extractor = CargoJsonExtractor::new();
        assert_eq!(extractor.errors(&output), "error[E0308]: mismatched types");
        assert_eq!(extractor.warnings(&output), "warning: unused");
    }

    #[test]
    fn test_cargo_json_falls_back_to_scraping() {
        let extractor = CargoJsonExtractor::new();
        assert!(extractor.errors(TWO_ERRORS).contains("error[E0412]"));
    }

    #[test]
    fn test_parse_compiler_errors() {
        let diagnostics = parse_compiler_errors(TWO_ERRORS);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "E0412");
        assert_eq!(diagnostics[0].file, "src/lib.rs");
        assert_eq!(diagnostics[0].line, 12);
        assert_eq!(diagnostics[0].column, 24);
        assert!(diagnostics[0].message.contains("BigUint"));
    }
}
