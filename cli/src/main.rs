mod lesson;
mod lesson_runner;

use std::io::{Read, Write};
use std::path::Path;
use std::process;

use clap::{Parser, Subcommand};
use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use interpreter::{DiagnosticError, FALLBACK_OUTPUT, VariableTable};
use wizard::parser::ParseDiagnostic;

use crate::lesson::Lesson;

const SUBCOMMANDS: &[&str] = &["run", "check", "lesson", "help"];

/// Name shown in diagnostics when the program is read from stdin.
const STDIN_NAME: &str = "<stdin>";

#[derive(Parser)]
#[command(name = "pywiz", version, about = "Python Wizard playground interpreter")]
struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a program
    Run(RunArgs),

    /// Check a solution against a lesson
    Check(CheckArgs),

    /// Verify that lesson files pass with their own starter code
    Lesson(LessonArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Source file to execute ("-" reads stdin)
    file: String,

    /// Parse only, don't execute
    #[arg(long)]
    check: bool,

    /// Dump parsed statements
    #[arg(long)]
    ast: bool,

    /// Print final variables to stderr after the run
    #[arg(long)]
    vars: bool,

    /// Don't report warnings
    #[arg(long)]
    no_warnings: bool,

    /// Suppress program output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::Args)]
struct CheckArgs {
    /// Path to a .lesson.toml file
    lesson: String,

    /// Solution source file; the lesson's starter code when omitted
    solution: Option<String>,
}

#[derive(clap::Args)]
struct LessonArgs {
    /// Path to a .lesson.toml file or a directory containing them
    path: String,

    /// Only check lessons in these categories (subfolder names). Repeatable.
    #[arg(short, long)]
    category: Vec<String>,

    /// List lessons and exit
    #[arg(long)]
    list: bool,
}

fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let args = with_default_subcommand(std::env::args().collect());
    let cli = Cli::parse_from(&args);
    let color_choice = if cli.no_color {
        ColorChoice::Never
    } else {
        ColorChoice::Auto
    };

    match cli.command {
        Command::Run(run_args) => do_run(run_args, color_choice),
        Command::Check(check_args) => do_check(check_args, color_choice),
        Command::Lesson(lesson_args) => {
            let path = Path::new(&lesson_args.path);
            if lesson_args.list {
                lesson_runner::list_lessons(path);
                return;
            }
            let exit_code = lesson_runner::run_lessons(path, color_choice, &lesson_args.category);
            process::exit(exit_code);
        }
    }
}

/// `pywiz [flags] file.py` works like `pywiz run [flags] file.py`. `run` goes
/// right after the binary name so run-only flags before the file still parse.
fn with_default_subcommand(mut args: Vec<String>) -> Vec<String> {
    let first_positional = args.iter().skip(1).find(|a| !a.starts_with('-'));
    if first_positional.is_some_and(|a| !SUBCOMMANDS.contains(&a.as_str())) {
        args.insert(1, "run".to_string());
    }
    args
}

fn read_source(file: &str) -> std::io::Result<String> {
    if file == "-" {
        let mut source = String::new();
        std::io::stdin().read_to_string(&mut source)?;
        Ok(source)
    } else {
        std::fs::read_to_string(file)
    }
}

fn do_run(args: RunArgs, color_choice: ColorChoice) {
    let source = match read_source(&args.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", args.file, e);
            process::exit(1);
        }
    };

    let name = if args.file == "-" {
        STDIN_NAME.to_string()
    } else {
        args.file.clone()
    };
    let mut files = SimpleFiles::new();
    let file_id = files.add(name.clone(), source.clone());

    let program = wizard::parser::Parser::new(source, file_id).parse();

    let writer = StandardStream::stderr(color_choice);
    let config = term::Config::default();

    if !args.no_warnings || args.check {
        emit_parse_warnings(&writer, &config, &files, &program.warnings);
    }

    if args.check {
        eprintln!(
            "ok: {} parsed ({} statements, {} warnings)",
            name,
            program.statements.len(),
            program.warnings.len()
        );
        return;
    }

    if args.ast {
        println!("{:#?}", program);
        return;
    }

    // Buffered so an empty run can show the fallback text instead.
    let mut buffer = Vec::new();
    let result = interpreter::execute_program(&program, &mut buffer);

    if !args.quiet {
        let output = String::from_utf8_lossy(&buffer);
        let mut stdout = std::io::stdout().lock();
        let written = if output.is_empty() {
            writeln!(stdout, "{}", FALLBACK_OUTPUT)
        } else {
            write!(stdout, "{}", output)
        };
        if let Err(e) = written.and_then(|()| stdout.flush()) {
            eprintln!("error: cannot write output: {}", e);
            process::exit(1);
        }
    }

    match result {
        Ok((variables, warnings)) => {
            if !args.no_warnings {
                emit_diagnostics(&writer, &config, &files, &warnings);
            }
            if args.vars {
                print_variables(&variables);
            }
        }
        Err(error) => {
            emit_diagnostic_error(&writer, &config, &files, &error);
            process::exit(1);
        }
    }
}

fn do_check(args: CheckArgs, color_choice: ColorChoice) {
    let lesson = match Lesson::load(Path::new(&args.lesson)) {
        Ok(lesson) => lesson,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    let source = match &args.solution {
        Some(file) => match read_source(file) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("error: cannot read '{}': {}", file, e);
                process::exit(1);
            }
        },
        None => lesson.starter_code.clone(),
    };

    let output = interpreter::run(&source);
    print!("{}", output);
    if !output.ends_with('\n') {
        println!();
    }

    let report = lesson.check(&output);
    let stream = StandardStream::stderr(color_choice);
    let mut err = stream.lock();
    let written = lesson_runner::write_report(&mut err, &lesson.title, &report);
    if let Err(e) = written {
        eprintln!("error: cannot write report: {}", e);
    }

    process::exit(if report.passed() { 0 } else { 1 });
}

fn print_variables(variables: &VariableTable) {
    for (name, value) in variables.sorted() {
        eprintln!("{} = {} ({})", name, value, value.type_name());
    }
}

fn emit_parse_warnings(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    warnings: &[ParseDiagnostic],
) {
    for warning in warnings {
        let diagnostic = warning.to_diagnostic();
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
    }
}

fn emit_diagnostic_error(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    error: &DiagnosticError,
) {
    if let Some(span) = &error.span {
        let severity = if error.is_warning {
            Severity::Warning
        } else {
            Severity::Error
        };
        let diagnostic = Diagnostic::new(severity)
            .with_message(error.to_string())
            .with_labels(vec![Label::primary(error.source_id, span.clone())]);
        let _ = term::emit_to_write_style(&mut writer.lock(), config, files, &diagnostic);
    } else {
        let prefix = if error.is_warning {
            "warning"
        } else {
            "runtime error"
        };
        eprintln!("{}: {}", prefix, error);
    }
}

fn emit_diagnostics(
    writer: &StandardStream,
    config: &term::Config,
    files: &SimpleFiles<String, String>,
    diagnostics: &[DiagnosticError],
) {
    for diag in diagnostics {
        emit_diagnostic_error(writer, config, files, diag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_file_gets_run_subcommand() {
        assert_eq!(
            with_default_subcommand(args(&["pywiz", "prog.py"])),
            args(&["pywiz", "run", "prog.py"])
        );
    }

    #[test]
    fn run_flags_before_the_file_still_parse() {
        let rewritten = with_default_subcommand(args(&["pywiz", "-q", "--vars", "prog.py"]));
        assert_eq!(rewritten, args(&["pywiz", "run", "-q", "--vars", "prog.py"]));

        let cli = Cli::try_parse_from(&rewritten).expect("arguments should parse");
        let Command::Run(run) = cli.command else {
            panic!("expected run");
        };
        assert!(run.quiet && run.vars);
        assert_eq!(run.file, "prog.py");
    }

    #[test]
    fn global_flag_before_a_bare_file() {
        let rewritten = with_default_subcommand(args(&["pywiz", "--no-color", "prog.py"]));
        let cli = Cli::try_parse_from(&rewritten).expect("arguments should parse");
        assert!(cli.no_color);
        assert!(matches!(cli.command, Command::Run(_)));
    }

    #[test]
    fn known_subcommands_are_left_alone() {
        let original = args(&["pywiz", "--no-color", "lesson", "lessons"]);
        assert_eq!(with_default_subcommand(original.clone()), original);
    }
}
