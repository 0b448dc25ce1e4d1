//! Purpose: `recops` CLI entry point.
//! Role: Binary crate root; parses args, runs one record command, emits JSON on stdout.
//! Invariants: Results are JSON on stdout; errors are JSON on stderr unless it is a terminal.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: All store access goes through `api::Client`.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use recops::api::{Error, ErrorKind, StatusCode, to_exit_code};
use recops::store_paths::default_store_dir;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(&err)
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, ColorMode)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::store(StatusCode::Client)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Param)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Try `recops --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let store_dir = cli.dir.unwrap_or_else(default_store_dir);
    let color_mode = cli.color;
    command_dispatch::dispatch_command(cli.command, store_dir, cli.default_ttl)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "recops",
    version,
    about = "Compile and run atomic record operations against a local store",
    long_about = r#"Compile and run atomic record operations against a local store.

Keys, operation lists, bins, and options are JSON arguments.
Results are printed as JSON; errors go to stderr."#,
    after_help = r#"EXAMPLES
  $ recops put '{"ns":"test","set":"demo","key":"k1"}' '{"name":"ada","visits":1}'
  $ recops operate '{"ns":"test","set":"demo","key":"k1"}' \
      '[{"op":"incr","bin":"visits","val":1},{"op":"read","bin":"visits"}]'
  $ recops exists '{"ns":"test","set":"demo","key":"k1"}'"#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        help = "Store directory (default: $RECOPS_DIR, else ~/.recops/store)",
        value_hint = ValueHint::DirPath
    )]
    dir: Option<PathBuf>,
    #[arg(
        long,
        default_value_t = 0,
        help = "ttl in seconds for writes that do not set one (0 never expires)"
    )]
    default_ttl: u32,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        arg_required_else_help = true,
        about = "Apply an operation list atomically",
        long_about = r#"Apply an ordered operation list to one record in a single request.

Each entry is {"op": .., "bin": .., "val": ..}. Ops: read (1), write (2),
incr (5), append (9), prepend (10), touch (11). Prints the bins read."#,
        after_help = r#"EXAMPLES
  $ recops operate '{"ns":"test","set":"demo","key":1}' '[{"op":"write","bin":"a","val":1},{"op":"read","bin":"a"}]'
  $ recops operate '{"ns":"test","set":"demo","key":1}' '[{"op":"touch","val":60}]' --options '{"generation":2}'"#
    )]
    Operate {
        #[arg(help = "Key as JSON")]
        key: String,
        #[arg(help = "Operation list as a JSON array")]
        operations: String,
        #[arg(long, help = "Options as a JSON object")]
        options: Option<String>,
    },
    #[command(arg_required_else_help = true, about = "Append text to a string bin")]
    Append {
        key: String,
        bin: String,
        text: String,
        #[arg(long, help = "Options as a JSON object")]
        options: Option<String>,
    },
    #[command(arg_required_else_help = true, about = "Prepend text to a string bin")]
    Prepend {
        key: String,
        bin: String,
        text: String,
        #[arg(long, help = "Options as a JSON object")]
        options: Option<String>,
    },
    #[command(
        arg_required_else_help = true,
        about = "Increment an integer bin, initializing it when it has no value",
        after_help = r#"EXAMPLES
  $ recops increment '{"ns":"test","set":"demo","key":1}' visits 1
  $ recops increment '{"ns":"test","set":"demo","key":1}' visits -5 --initial 100"#
    )]
    Increment {
        key: String,
        bin: String,
        #[arg(allow_negative_numbers = true)]
        offset: i64,
        #[arg(
            long,
            default_value_t = 0,
            allow_negative_numbers = true,
            help = "Value written when the bin is absent or null"
        )]
        initial: i64,
        #[arg(long, help = "Options as a JSON object")]
        options: Option<String>,
    },
    #[command(arg_required_else_help = true, about = "Reset a record's ttl")]
    Touch {
        key: String,
        ttl: u32,
        #[arg(long, help = "Options as a JSON object")]
        options: Option<String>,
    },
    #[command(
        arg_required_else_help = true,
        about = "Print a record's {generation, ttl}"
    )]
    Exists {
        key: String,
        #[arg(long, help = "Options as a JSON object")]
        options: Option<String>,
    },
    #[command(arg_required_else_help = true, about = "Delete a whole record")]
    Remove {
        key: String,
        #[arg(long, help = "Options as a JSON object")]
        options: Option<String>,
    },
    #[command(
        name = "remove-bins",
        arg_required_else_help = true,
        about = "Delete the listed bins from a record",
        after_help = r#"EXAMPLES
  $ recops remove-bins '{"ns":"test","set":"demo","key":1}' '["x","y"]'"#
    )]
    RemoveBins {
        key: String,
        #[arg(help = "Bin names as a JSON array of strings")]
        bins: String,
        #[arg(long, help = "Options as a JSON object")]
        options: Option<String>,
    },
    #[command(arg_required_else_help = true, about = "Read a record's bins and metadata")]
    Get {
        key: String,
        #[arg(long = "bin", help = "Restrict output to this bin (repeatable)")]
        bins: Vec<String>,
        #[arg(long, help = "Options as a JSON object")]
        options: Option<String>,
    },
    #[command(
        arg_required_else_help = true,
        about = "Write bins; null values remove bins"
    )]
    Put {
        key: String,
        #[arg(help = "Bins as a JSON object")]
        bins: String,
        #[arg(long, help = "Options as a JSON object")]
        options: Option<String>,
    },
    #[command(about = "Print version info as JSON")]
    Version,
    #[command(
        arg_required_else_help = true,
        about = "Generate shell completions",
        after_help = r#"EXAMPLES
  $ recops completion bash > ~/.local/share/bash-completion/completions/recops
  $ recops completion zsh > ~/.zfunc/_recops"#
    )]
    Completion {
        #[arg(help = "Shell to generate completions for")]
        shell: Shell,
    },
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_json(value: Value) {
    let json = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    }
    .unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string());
    println!("{json}");
}

fn emit_version_output() {
    if io::stdout().is_terminal() {
        println!("recops {}", env!("CARGO_PKG_VERSION"));
    } else {
        emit_json(json!({
            "name": "recops",
            "version": env!("CARGO_PKG_VERSION"),
        }));
    }
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Store\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("code".to_string(), json!(err.code()));
    inner.insert("message".to_string(), json!(err.describe()));
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(format!("{status:?}")));
    }
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(bin) = err.bin() {
        inner.insert("bin".to_string(), json!(bin));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn colorize_label(label: &str, enabled: bool, code: &str) -> String {
    if !enabled {
        return label.to_string();
    }
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {} (code {})",
        colorize_label("error:", use_color, "31"),
        err.describe(),
        err.code()
    )];
    if let Some(bin) = err.bin() {
        lines.push(format!("{} {bin}", colorize_label("bin:", use_color, "33")));
    }
    if let Some(hint) = err.hint() {
        lines.push(format!("{} {hint}", colorize_label("hint:", use_color, "33")));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, "33")
        ));
    }
    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn parse_inline_json(label: &str, data: &str) -> Result<Value, Error> {
    serde_json::from_str(data).map_err(|err| {
        Error::new(ErrorKind::Param)
            .with_message(format!("invalid {label} json"))
            .with_hint("Provide a single JSON value (e.g. '{\"x\":1}').")
            .with_source(err)
    })
}
