use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

/// File name suffix that marks a lesson file.
pub const LESSON_SUFFIX: &str = ".lesson.toml";

/// One playground exercise, loaded from a `.lesson.toml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct Lesson {
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Steps shown to the learner, in order.
    #[serde(default)]
    pub instructions: Vec<String>,

    /// Code the editor starts with. Lesson files ship a working version, so
    /// running it must satisfy the lesson's own checks.
    pub starter_code: String,

    /// Expected output (trimmed comparison).
    #[serde(default)]
    pub expected_output: Option<String>,

    /// Extra predicates over the output.
    #[serde(default)]
    pub checks: Vec<OutputCheck>,
}

/// A predicate over a run's output. Written in TOML as an inline table,
/// e.g. `{ contains = "Hello" }` or `{ line_count = 2 }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputCheck {
    Contains(String),
    NotContains(String),
    /// Some output line equals this text (ignoring trailing whitespace).
    EqualsLine(String),
    /// Number of output lines, not counting trailing blank lines.
    LineCount(usize),
}

impl OutputCheck {
    pub fn passes(&self, output: &str) -> bool {
        match self {
            OutputCheck::Contains(s) => output.contains(s.as_str()),
            OutputCheck::NotContains(s) => !output.contains(s.as_str()),
            OutputCheck::EqualsLine(s) => output.lines().any(|line| line.trim_end() == s.as_str()),
            OutputCheck::LineCount(n) => output.trim_end().lines().count() == *n,
        }
    }
}

impl fmt::Display for OutputCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputCheck::Contains(s) => write!(f, "output contains \"{}\"", s),
            OutputCheck::NotContains(s) => write!(f, "output does not contain \"{}\"", s),
            OutputCheck::EqualsLine(s) => write!(f, "output has the line \"{}\"", s),
            OutputCheck::LineCount(n) => write!(f, "output has {} line(s)", n),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LessonError {
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid lesson '{}': {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Outcome of a single check against one output.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub description: String,
    pub passed: bool,
    /// Extra lines explaining a failure.
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LessonReport {
    pub results: Vec<CheckResult>,
}

impl LessonReport {
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Failed checks with their details, one block per check.
    pub fn failure_summary(&self) -> String {
        self.results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| match &r.detail {
                Some(detail) => format!("{}\n{}", r.description, detail),
                None => r.description.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Lesson {
    pub fn load(path: &Path) -> Result<Lesson, LessonError> {
        let content = std::fs::read_to_string(path).map_err(|source| LessonError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let content = content.trim_start_matches('\u{feff}'); // strip BOM
        toml::from_str(content).map_err(|source| LessonError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check a run's output against the expected output and every predicate.
    pub fn check(&self, output: &str) -> LessonReport {
        let mut results = Vec::new();

        if let Some(expected) = &self.expected_output {
            let expected = expected.trim();
            let actual = output.trim();
            let passed = actual == expected;
            results.push(CheckResult {
                description: "output matches the expected output".to_string(),
                passed,
                detail: (!passed).then(|| {
                    format!("  expected: {}\n  actual:   {}", expected, actual)
                }),
            });
        }

        for check in &self.checks {
            results.push(CheckResult {
                description: check.to_string(),
                passed: check.passes(output),
                detail: None,
            });
        }

        LessonReport { results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LESSON: &str = r#"
title = "Variables and Numbers"
description = "Create variables and perform basic arithmetic operations."
instructions = [
    "Create a variable called 'number' and assign it a value",
    "Multiply it by 2 and store the result in a new variable",
]
starter_code = """
number = 5
result = number * 2
print(f'Original number: {number}')
print(f'Result: {result}')
"""
expected_output = "Original number: 5\nResult: 10"
checks = [
    { contains = "Result" },
    { equals_line = "Result: 10" },
    { line_count = 2 },
    { not_contains = "NaN" },
]
"#;

    #[test]
    fn parses_lesson_with_checks() {
        let lesson: Lesson = toml::from_str(LESSON).expect("lesson should parse");
        assert_eq!(lesson.title, "Variables and Numbers");
        assert_eq!(lesson.instructions.len(), 2);
        assert_eq!(
            lesson.checks,
            vec![
                OutputCheck::Contains("Result".into()),
                OutputCheck::EqualsLine("Result: 10".into()),
                OutputCheck::LineCount(2),
                OutputCheck::NotContains("NaN".into()),
            ]
        );
    }

    #[test]
    fn starter_code_passes_its_own_checks() {
        let lesson: Lesson = toml::from_str(LESSON).unwrap();
        let output = interpreter::run(&lesson.starter_code);
        let report = lesson.check(&output);
        assert!(report.passed(), "{}", report.failure_summary());
        assert_eq!(report.results.len(), 5);
    }

    #[test]
    fn wrong_output_reports_each_failure() {
        let lesson: Lesson = toml::from_str(LESSON).unwrap();
        let report = lesson.check("Result: 11\n");
        assert!(!report.passed());
        let failed: Vec<&str> = report
            .results
            .iter()
            .filter(|r| !r.passed)
            .map(|r| r.description.as_str())
            .collect();
        assert_eq!(
            failed,
            vec![
                "output matches the expected output",
                "output has the line \"Result: 10\"",
                "output has 2 line(s)",
            ]
        );
        assert!(report.failure_summary().contains("actual:   Result: 11"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = Lesson::load(Path::new("does/not/exist.lesson.toml")).unwrap_err();
        assert!(matches!(err, LessonError::Io { .. }));
        assert!(err.to_string().starts_with("cannot read 'does/not/exist.lesson.toml'"));
    }

    #[test]
    fn missing_title_is_a_toml_error() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let path = dir.path().join("broken.lesson.toml");
        std::fs::write(&path, "starter_code = \"print(1)\"").unwrap();
        let err = Lesson::load(&path).unwrap_err();
        assert!(matches!(err, LessonError::Toml { .. }));
    }
}
