use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use codespan_reporting::term::termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use crate::lesson::{LESSON_SUFFIX, Lesson, LessonReport};

pub enum LessonOutcome {
    Pass,
    Fail(String),
}

pub struct LessonResult {
    pub path: PathBuf,
    pub title: Option<String>,
    pub outcome: LessonOutcome,
}

impl LessonResult {
    fn label(&self) -> &str {
        self.title.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| s.trim_end_matches(LESSON_SUFFIX))
                .unwrap_or("?")
        })
    }
}

/// Load a lesson, run its starter code and check the output.
fn run_single_lesson(path: &Path) -> LessonResult {
    let lesson = match Lesson::load(path) {
        Ok(lesson) => lesson,
        Err(e) => {
            return LessonResult {
                path: path.to_path_buf(),
                title: None,
                outcome: LessonOutcome::Fail(e.to_string()),
            };
        }
    };

    let output = interpreter::run(&lesson.starter_code);
    let report = lesson.check(&output);
    tracing::debug!(lesson = %path.display(), passed = report.passed(), "checked lesson");

    LessonResult {
        path: path.to_path_buf(),
        title: Some(lesson.title),
        outcome: if report.passed() {
            LessonOutcome::Pass
        } else {
            LessonOutcome::Fail(report.failure_summary())
        },
    }
}

/// Discover lesson files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "".
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_lessons(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_lessons(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_lessons(&path, root, out);
        } else if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if name.ends_with(LESSON_SUFFIX) {
                let category = path
                    .parent()
                    .and_then(|p| p.strip_prefix(root).ok())
                    .map(|p| p.to_string_lossy().replace('\\', "/"))
                    .unwrap_or_default();
                out.entry(category).or_default().push(path);
            }
        }
    }
}

fn category_label(category: &str) -> &str {
    if category.is_empty() { "(root)" } else { category }
}

/// Keep the categories named in `requested`, including their subfolders.
/// An empty request keeps everything.
fn filter_categories<'a>(
    all: &'a BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<&'a str, &'a Vec<PathBuf>> {
    if requested.is_empty() {
        return all.iter().map(|(k, v)| (k.as_str(), v)).collect();
    }

    let mut filtered = BTreeMap::new();
    for requested in requested {
        let req = requested.trim_matches('/');
        let mut found = false;
        for (cat, files) in all {
            if cat == req || cat.starts_with(&format!("{}/", req)) {
                filtered.insert(cat.as_str(), files);
                found = true;
            }
        }
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                all.keys()
                    .map(|k| category_label(k))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
    }
    filtered
}

/// Print the lessons under `path`, grouped by category.
pub fn list_lessons(path: &Path) {
    if path.is_file() {
        match Lesson::load(path) {
            Ok(lesson) => eprintln!("{}", lesson.title),
            Err(e) => eprintln!("error: {}", e),
        }
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no {} files found in {}", LESSON_SUFFIX, path.display());
        return;
    }

    for (cat, files) in &categories {
        eprintln!("{} ({} lessons)", category_label(cat), files.len());
        for file in files {
            let title = Lesson::load(file)
                .map(|lesson| lesson.title)
                .unwrap_or_else(|e| format!("<{}>", e));
            eprintln!("  {}", title);
        }
    }
}

/// Write a colored status word such as `PASS` or `FAIL`.
fn write_status(out: &mut dyn WriteColor, text: &str, color: Color) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(out, "{}", text)?;
    out.reset()
}

/// Write one `PASS`/`FAIL` line per check of a single lesson.
pub fn write_report(out: &mut dyn WriteColor, title: &str, report: &LessonReport) -> io::Result<()> {
    writeln!(out)?;
    write_bold(out, title)?;
    writeln!(out)?;
    for result in &report.results {
        write!(out, "  ")?;
        if result.passed {
            write_status(out, "PASS", Color::Green)?;
        } else {
            write_status(out, "FAIL", Color::Red)?;
        }
        writeln!(out, "  {}", result.description)?;
        if let Some(detail) = &result.detail {
            writeln!(out, "{}", detail)?;
        }
    }
    Ok(())
}

fn write_bold(out: &mut dyn WriteColor, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_bold(true))?;
    write!(out, "{}", text)?;
    out.reset()
}

fn write_result_line(out: &mut dyn WriteColor, result: &LessonResult) -> io::Result<()> {
    write!(out, "  ")?;
    match result.outcome {
        LessonOutcome::Pass => write_status(out, "PASS", Color::Green)?,
        LessonOutcome::Fail(_) => write_status(out, "FAIL", Color::Red)?,
    }
    writeln!(out, "  {}", result.label())
}

fn write_summary(out: &mut dyn WriteColor, failures: &[LessonResult], passed: usize) -> io::Result<()> {
    if !failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "failures:")?;
        for f in failures {
            writeln!(out)?;
            writeln!(out, "  --- {} ---", f.path.display())?;
            if let LessonOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    writeln!(out, "  {}", line)?;
                }
            }
        }
    }

    writeln!(out)?;
    write!(out, "lesson result: ")?;
    if failures.is_empty() {
        write_status(out, "ok", Color::Green)?;
        writeln!(out, ". {} passed, 0 failed", passed)
    } else {
        write_status(out, "FAILED", Color::Red)?;
        writeln!(
            out,
            ". {} passed, {} failed (of {})",
            passed,
            failures.len(),
            passed + failures.len()
        )
    }
}

/// Check every lesson under `path` (or a single lesson file) by running its
/// starter code. If `categories` is non-empty, only those categories run.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_lessons(path: &Path, color_choice: ColorChoice, categories: &[String]) -> i32 {
    let stream = StandardStream::stderr(color_choice);
    let mut out = stream.lock();
    match run_lessons_to(&mut out, path, categories) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: cannot write report: {}", e);
            1
        }
    }
}

fn run_lessons_to(out: &mut dyn WriteColor, path: &Path, categories: &[String]) -> io::Result<i32> {
    if path.is_file() {
        let result = run_single_lesson(path);
        write_result_line(out, &result)?;
        let (passed, failures) = match result.outcome {
            LessonOutcome::Pass => (1, Vec::new()),
            LessonOutcome::Fail(_) => (0, vec![result]),
        };
        write_summary(out, &failures, passed)?;
        return Ok(if failures.is_empty() { 0 } else { 1 });
    }

    let all_categories = discover_categorized(path);
    if all_categories.is_empty() {
        writeln!(out, "no {} files found in {}", LESSON_SUFFIX, path.display())?;
        return Ok(1);
    }

    let run_categories = filter_categories(&all_categories, categories);
    if run_categories.is_empty() {
        writeln!(out, "no matching categories found")?;
        return Ok(1);
    }

    let mut passed = 0usize;
    let mut failures: Vec<LessonResult> = Vec::new();

    for (cat, files) in &run_categories {
        writeln!(out)?;
        write_bold(out, category_label(cat))?;
        writeln!(out)?;

        for file in *files {
            let result = run_single_lesson(file);
            write_result_line(out, &result)?;
            match result.outcome {
                LessonOutcome::Pass => passed += 1,
                LessonOutcome::Fail(_) => failures.push(result),
            }
        }
    }

    write_summary(out, &failures, passed)?;
    Ok(if failures.is_empty() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codespan_reporting::term::termcolor::NoColor;

    const PASSING: &str = r#"
title = "Hello"
starter_code = "print('Hello, World!')"
expected_output = "Hello, World!"
"#;

    const FAILING: &str = r#"
title = "Broken"
starter_code = "x = 1"
expected_output = "1"
"#;

    fn write_lesson(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn report(path: &Path, categories: &[String]) -> (i32, String) {
        let mut out = NoColor::new(Vec::new());
        let code = run_lessons_to(&mut out, path, categories).unwrap();
        (code, String::from_utf8(out.into_inner()).unwrap())
    }

    #[test]
    fn discovers_lessons_by_category() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        write_lesson(dir.path(), "top.lesson.toml", PASSING);
        write_lesson(dir.path(), "basics/b.lesson.toml", PASSING);
        write_lesson(dir.path(), "basics/a.lesson.toml", PASSING);
        write_lesson(dir.path(), "basics/notes.toml", PASSING);

        let categories = discover_categorized(dir.path());
        let keys: Vec<&str> = categories.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["", "basics"]);
        let names: Vec<_> = categories["basics"]
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.lesson.toml", "b.lesson.toml"]);
    }

    #[test]
    fn all_passing_exits_zero() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        write_lesson(dir.path(), "basics/hello.lesson.toml", PASSING);

        let (code, text) = report(dir.path(), &[]);
        assert_eq!(code, 0);
        assert!(text.contains("PASS  Hello"));
        assert!(text.contains("lesson result: ok. 1 passed, 0 failed"));
    }

    #[test]
    fn failing_lesson_reports_the_mismatch() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        write_lesson(dir.path(), "basics/hello.lesson.toml", PASSING);
        write_lesson(dir.path(), "basics/broken.lesson.toml", FAILING);

        let (code, text) = report(dir.path(), &[]);
        assert_eq!(code, 1);
        assert!(text.contains("FAIL  Broken"));
        assert!(text.contains("actual:   No output"));
        assert!(text.contains("1 passed, 1 failed (of 2)"));
    }

    #[test]
    fn category_filter_includes_subfolders() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        write_lesson(dir.path(), "basics/hello.lesson.toml", PASSING);
        write_lesson(dir.path(), "basics/more/hello.lesson.toml", PASSING);
        write_lesson(dir.path(), "advanced/broken.lesson.toml", FAILING);

        let (code, text) = report(dir.path(), &["basics".to_string()]);
        assert_eq!(code, 0);
        assert!(text.contains("2 passed, 0 failed"));
        assert!(!text.contains("Broken"));
    }

    #[test]
    fn unknown_category_runs_nothing() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        write_lesson(dir.path(), "basics/hello.lesson.toml", PASSING);

        let (code, text) = report(dir.path(), &["missing".to_string()]);
        assert_eq!(code, 1);
        assert!(text.contains("no matching categories found"));
    }

    #[test]
    fn unreadable_lesson_fails_with_file_label() {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        write_lesson(dir.path(), "bad.lesson.toml", "title = ");

        let (code, text) = report(&dir.path().join("bad.lesson.toml"), &[]);
        assert_eq!(code, 1);
        assert!(text.contains("FAIL  bad"));
        assert!(text.contains("invalid lesson"));
    }

    #[test]
    fn report_lists_every_check() {
        let lesson: Lesson = toml::from_str(PASSING).unwrap();
        let report = lesson.check("Hello, World?\n");
        let mut out = NoColor::new(Vec::new());
        write_report(&mut out, &lesson.title, &report).unwrap();
        let text = String::from_utf8(out.into_inner()).unwrap();
        assert!(text.contains("FAIL  output matches the expected output"));
        assert!(text.contains("  expected: Hello, World!"));
    }

    #[test]
    fn shipped_lessons_pass() {
        let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../lessons");
        let (code, text) = report(&root, &[]);
        assert_eq!(code, 0, "{}", text);
    }
}
