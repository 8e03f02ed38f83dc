use cjs_lexer_core::logger::init_logger;
use cjs_lexer_core::{parse_cjs_with, CjsExports, ExportIndex, IndexOptions, LexError, LexerOptions};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(author, version, about = "Detect CommonJS exports without evaluating code", long_about = None)]
struct Cli {
    /// Debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Errors only
    #[arg(long, short, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lex one module (file or STDIN) and print its exports as JSON
    Parse(ParseArgs),
    /// Lex every CommonJS file under a directory and print the index as JSON
    Index(IndexArgs),
}

#[derive(Args, Debug)]
struct ParseArgs {
    /// Read from this file instead of STDIN
    #[arg(long)]
    file: Option<PathBuf>,
    /// Name used in error diagnostics (defaults to the file path, or "@")
    #[arg(long)]
    label: Option<String>,
    /// Maximum bracket nesting before giving up
    #[arg(long)]
    max_depth: Option<usize>,
}

#[derive(Args, Debug)]
struct IndexArgs {
    root: PathBuf,
    /// File extension to include (repeatable, default: js and cjs)
    #[arg(long = "ext")]
    extensions: Vec<String>,
    /// Skip paths matching this regex
    #[arg(long)]
    exclude: Option<String>,
    /// Persist per-file results here between runs
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

/// Exit status for a source that could not be lexed.
const EXIT_LEX_FAILURE: u8 = 1;
/// Exit status for unreadable input.
const EXIT_IO_FAILURE: u8 = 2;

#[derive(Serialize)]
struct ErrorBody<'a> {
    kind: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    label: Option<&'a str>,
}

#[derive(Serialize)]
struct ErrorOut<'a> {
    error: ErrorBody<'a>,
}

impl<'a> ErrorOut<'a> {
    fn lex(err: &'a LexError) -> Self {
        ErrorOut {
            error: ErrorBody {
                kind: err.kind.as_str(),
                code: err.code(),
                message: &err.message,
                offset: Some(err.offset),
                label: Some(&err.label),
            },
        }
    }

    fn other(kind: &'a str, message: &'a str) -> Self {
        ErrorOut { error: ErrorBody { kind, code: None, message, offset: None, label: None } }
    }
}

enum ParseFailure {
    Io(io::Error),
    Lex(LexError),
}

impl ParseFailure {
    fn exit_code(&self) -> u8 {
        match self {
            ParseFailure::Io(_) => EXIT_IO_FAILURE,
            ParseFailure::Lex(_) => EXIT_LEX_FAILURE,
        }
    }
}

fn emit<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string(value).unwrap_or_else(|_| "{}".into()));
}

fn read_source(file: Option<&PathBuf>) -> io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            let mut src = String::new();
            io::stdin().read_to_string(&mut src)?;
            Ok(src)
        }
    }
}

/// `--label`, else the file path; `None` lets the lexer use its default.
fn parse_label(args: &ParseArgs) -> Option<String> {
    args.label.clone().or_else(|| args.file.as_ref().map(|p| p.display().to_string()))
}

fn lexer_options(args: &ParseArgs) -> LexerOptions {
    let mut options = LexerOptions::default();
    if let Some(depth) = args.max_depth {
        options.max_depth = depth;
    }
    options
}

fn parse_command(args: &ParseArgs) -> Result<CjsExports, ParseFailure> {
    let source = read_source(args.file.as_ref()).map_err(ParseFailure::Io)?;
    parse_cjs_with(&source, parse_label(args).as_deref(), &lexer_options(args)).map_err(ParseFailure::Lex)
}

fn run_parse(args: ParseArgs) -> ExitCode {
    match parse_command(&args) {
        Ok(out) => {
            emit(&out);
            ExitCode::SUCCESS
        }
        Err(failure) => {
            match &failure {
                ParseFailure::Io(err) => {
                    error!(error = %err, "failed to read input");
                    let message = err.to_string();
                    emit(&ErrorOut::other("Io", &message));
                }
                ParseFailure::Lex(err) => emit(&ErrorOut::lex(err)),
            }
            ExitCode::from(failure.exit_code())
        }
    }
}

/// `--ext .js` and `--ext js` both mean `js`.
fn normalize_extensions(extensions: &[String]) -> Vec<String> {
    extensions.iter().map(|e| e.trim_start_matches('.').to_string()).collect()
}

fn index_options(args: &IndexArgs) -> IndexOptions {
    let mut options =
        IndexOptions { exclude: args.exclude.clone(), cache_dir: args.cache_dir.clone(), ..IndexOptions::default() };
    if !args.extensions.is_empty() {
        options.extensions = normalize_extensions(&args.extensions);
    }
    options
}

fn run_index(args: IndexArgs) -> ExitCode {
    let snapshot = ExportIndex::index_project(&args.root, &index_options(&args))
        .map_err(|err| err.to_string())
        .and_then(|index| index.to_json().map_err(|err| err.to_string()));
    match snapshot {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            error!(error = %message, "indexing failed");
            emit(&ErrorOut::other("Index", &message));
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.verbose, cli.quiet);
    match cli.command {
        Commands::Parse(args) => run_parse(args),
        Commands::Index(args) => run_index(args),
    }
}
