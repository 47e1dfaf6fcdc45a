//! Structural checks on generated contract source.

use serde::Serialize;

use crate::error::{GenerationError, GenerationResult};

/// Outcome of an advisory validation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Required-marker validator for MultiversX contract source.
#[derive(Debug, Clone)]
pub struct StructuralValidator {
    required: Vec<(String, String)>,
    advisory: Vec<(String, String)>,
    min_length: usize,
}

impl Default for StructuralValidator {
    fn default() -> Self {
        Self {
            required: vec![
                ("#![no_std]".into(), "Missing #![no_std] declaration".into()),
                (
                    "#[multiversx_sc::contract]".into(),
                    "Missing contract attribute".into(),
                ),
            ],
            advisory: vec![("#[init]".into(), "Missing init function".into())],
            min_length: 100,
        }
    }
}

impl StructuralValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hard requirement.
    pub fn require(mut self, marker: impl Into<String>, problem: impl Into<String>) -> Self {
        self.required.push((marker.into(), problem.into()));
        self
    }

    /// Hard check: every required marker must be present.
    pub fn check(&self, source: &str) -> GenerationResult<()> {
        let problems: Vec<String> = self
            .required
            .iter()
            .filter(|(marker, _)| !source.contains(marker.as_str()))
            .map(|(_, problem)| problem.clone())
            .collect();

        if problems.is_empty() {
            Ok(())
        } else {
            Err(GenerationError::Validation { problems })
        }
    }

    /// Full report including advisory findings.
    pub fn report(&self, source: &str) -> ValidationReport {
        let mut errors: Vec<String> = self
            .required
            .iter()
            .chain(self.advisory.iter())
            .filter(|(marker, _)| !source.contains(marker.as_str()))
            .map(|(_, problem)| problem.clone())
            .collect();

        if source.len() < self.min_length {
            errors.push("Code too short, likely incomplete".to_string());
        }

        ValidationReport {
            valid: errors.is_empty(),
            errors,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = "#![no_std]\n\nmultiversx_sc::imports!();\n\n#[multiversx_sc::contract]\npub trait Counter {\n    #[init]\n    fn init(&self) {}\n}\n";

    #[test]
    fn test_check_accepts_required_markers() {
        assert!(StructuralValidator::new().check(MINIMAL).is_ok());
    }

    #[test]
    fn test_check_names_missing_markers() {
        let err = StructuralValidator::new().check("pub fn main() {}").unwrap_err();
        match err {
            GenerationError::Validation { problems } => assert_eq!(problems.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_report_is_advisory() {
        let source = "#![no_std]\n#[multiversx_sc::contract]\npub trait A {}";
        let validator = StructuralValidator::new();
        assert!(validator.check(source).is_ok());

        let report = validator.report(source);
        assert!(!report.valid);
        assert!(report.errors.contains(&"Missing init function".to_string()));
        assert!(report.errors.contains(&"Code too short, likely incomplete".to_string()));
    }

    #[test]
    fn test_extra_requirement() {
        let validator = StructuralValidator::new().require("#[upgrade]", "Missing upgrade function");
        assert!(validator.check(MINIMAL).is_err());
    }
}
