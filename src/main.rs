//! Purpose: `spycats` CLI entry point.
//! Role: Binary crate root; parses args, drives the console controllers, emits JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: Every remote call goes through the dashboard or the breed cache, never raw HTTP.
#![allow(clippy::result_large_err)]
use std::io::{self, IsTerminal};
use std::net::SocketAddr;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum, error::ErrorKind as ClapErrorKind};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod serve;

use spycats::api::{Error, ErrorKind, to_exit_code};

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
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
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
                        Error::new(ErrorKind::Io)
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
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint(clap_error_hint(&err)),
                    ColorMode::Auto,
                ));
            }
        },
    };

    let color_mode = cli.color;
    let default_level = if matches!(cli.command, Command::Serve { .. }) {
        "info"
    } else {
        "warn"
    };
    init_tracing(default_level);

    let globals = GlobalArgs {
        api_url: cli.api_url,
        breeds_url: cli.breeds_url,
        timeout: cli.timeout,
    };
    command_dispatch::dispatch_command(cli.command, globals, color_mode)
        .map_err(add_request_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, color_mode))
}

#[derive(Parser)]
#[command(
    name = "spycats",
    version,
    about = "Manage the Spy Cat roster from the terminal",
    help_template = r#"{about-with-newline}
{before-help}USAGE
  {usage}

COMMANDS
{subcommands}

OPTIONS
{options}

{after-help}
"#,
    long_about = None,
    before_help = r#"Talks to a spy cat service over HTTP. Every change is followed by a fresh list.

Mental model:
  - `list` shows the roster, headcount, and total salary
  - `create`, `salary`, `delete` change one cat and re-read the roster
  - `serve` runs an in-memory service to try it all locally
"#,
    after_help = r#"EXAMPLES
  $ spycats serve                                   # Terminal 1
  $ spycats create --name Tom --experience 3 --breed Abyssinian --salary 50000
  $ spycats salary 1 52000
  $ spycats list

ENVIRONMENT
  SPYCATS_API_BASE_URL      service base URL (default http://127.0.0.1:8000)
  SPYCATS_BREEDS_URL        breed directory URL (default TheCatAPI)
  SPYCATS_TIMEOUT           per-request timeout, e.g. 5s
  SPYCATS_SUGGEST_DEBOUNCE  breed suggestion debounce, e.g. 300ms
  RUST_LOG                  log filter, e.g. spycats=debug"#,
    arg_required_else_help = true,
    args_override_self = true
)]
struct Cli {
    #[arg(long, global = true, help = "Spy cat service base URL")]
    api_url: Option<String>,
    #[arg(long, global = true, help = "Breed directory URL")]
    breeds_url: Option<String>,
    #[arg(long, global = true, help = "Per-request timeout: number plus ms|s|m|h")]
    timeout: Option<String>,
    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics and pretty JSON output: auto|always|never"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

struct GlobalArgs {
    api_url: Option<String>,
    breeds_url: Option<String>,
    timeout: Option<String>,
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
    #[command(about = "List spy cats with headcount and total salary")]
    List,
    #[command(
        about = "Create a spy cat",
        after_help = r#"EXAMPLES
  $ spycats create --name Tom --experience 3 --breed Abyssinian --salary 50000

NOTES
  - Checked locally first: name and breed required, experience 0..15, salary >= 0.
  - When the breed directory loads, the breed must be one of its names."#
    )]
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        experience: String,
        #[arg(long)]
        breed: String,
        #[arg(long, allow_hyphen_values = true)]
        salary: String,
    },
    #[command(about = "Change one spy cat's salary")]
    Salary {
        id: u64,
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    #[command(about = "Delete a spy cat")]
    Delete { id: u64 },
    #[command(about = "Show breed suggestions for a query (all breeds when omitted)")]
    Breeds { query: Option<String> },
    #[command(about = "Run an in-memory spy cat service")]
    Serve {
        #[arg(long, default_value = "127.0.0.1:8000")]
        bind: String,
        #[arg(long, help = "Permit binding to non-loopback addresses")]
        allow_non_loopback: bool,
        #[arg(long, help = "Accept any breed name on create")]
        any_breed: bool,
    },
    #[command(about = "Print shell completions")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn parse_bind(raw: &str) -> Result<SocketAddr, Error> {
    raw.parse().map_err(|_| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid bind address")
            .with_hint("Use a host:port value like 127.0.0.1:8000.")
    })
}

fn add_request_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::RequestFailed if err.status().is_none() => err.with_hint(
            "Check that the spy cat service is running (see --api-url or SPYCATS_API_BASE_URL).",
        ),
        ErrorKind::DirectoryUnavailable => {
            err.with_hint("Check --breeds-url or SPYCATS_BREEDS_URL, or retry later.")
        }
        ErrorKind::Io => err.with_hint("I/O error. Check the address and permissions."),
        _ => err,
    }
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_LOG=debug and share the command if it persists.",
    )
}

fn emit_json(value: Value, color_mode: ColorMode) {
    let is_tty = io::stdout().is_terminal();
    let pretty = is_tty || color_mode.use_color(is_tty);
    let encoded = if pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    println!(
        "{}",
        encoded.unwrap_or_else(|_| "{\"error\":\"json encode failed\"}".to_string())
    );
}

fn emit_table(headers: &[&str], rows: &[Vec<String>]) {
    let mut widths: Vec<usize> = headers.iter().map(|header| header.chars().count()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    let header_cells: Vec<String> = headers.iter().map(|header| header.to_string()).collect();
    println!("{}", table_line(&header_cells, &widths));
    for row in rows {
        println!("{}", table_line(row, &widths));
    }
}

fn table_line(cells: &[String], widths: &[usize]) -> String {
    let padded: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(idx, width)| {
            let cell = cells.get(idx).map(String::as_str).unwrap_or("");
            format!("{cell:<width$}")
        })
        .collect();
    padded.join("  ").trim_end().to_string()
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_notice(message: &str, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        let label = colorize_label("notice:", color_mode.use_color(is_tty), AnsiColor::Yellow);
        eprintln!("{label} {message}");
        return;
    }
    eprintln!("{}", json!({ "notice": { "message": message } }));
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let json = serde_json::to_string(&error_json(err)).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Validation => "rejected by the service".to_string(),
        ErrorKind::RequestFailed => "request failed".to_string(),
        ErrorKind::DirectoryUnavailable => "breed directory unavailable".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
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
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(fields) = err.fields().filter(|fields| !fields.is_empty()) {
        inner.insert("fields".to_string(), json!(fields));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = vec![format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    )];

    if let Some(fields) = err.fields() {
        for (field, messages) in fields.iter() {
            lines.push(format!(
                "  {} {}",
                colorize_label(&format!("{field}:"), use_color, AnsiColor::Yellow),
                messages.join(", ")
            ));
        }
    }
    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(cause) = error_causes(err).first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
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

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);
    let subcommand = usage.and_then(|usage| {
        let mut tokens = usage.split_whitespace();
        tokens.find(|token| *token == "spycats")?;
        tokens.next().filter(|token| {
            !token.starts_with('-') && !token.starts_with('<') && !token.starts_with('[')
        })
    });
    match subcommand {
        Some(subcommand) => format!("Try `spycats {subcommand} --help`."),
        None => "Try `spycats --help`.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command, error_json, error_text, parse_bind, table_line};
    use clap::Parser;
    use spycats::api::{Error, ErrorKind, FieldErrors};

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["spycats", "list", "--api-url", "http://x.test", "--timeout", "2s"])
            .expect("parse");
        assert!(matches!(cli.command, Command::List));
        assert_eq!(cli.api_url.as_deref(), Some("http://x.test"));
        assert_eq!(cli.timeout.as_deref(), Some("2s"));
    }

    #[test]
    fn salary_accepts_negative_amounts_for_local_rejection() {
        let cli = Cli::try_parse_from(["spycats", "salary", "4", "-5"]).expect("parse");
        match cli.command {
            Command::Salary { id, amount } => assert_eq!((id, amount.as_str()), (4, "-5")),
            _ => panic!("expected salary command"),
        }
    }

    #[test]
    fn error_json_carries_fields_and_status() {
        let mut fields = FieldErrors::new();
        fields.push("name", "This field may not be blank.");
        let err = Error::validation(fields)
            .with_message("Bad Request")
            .with_status(400);
        let value = error_json(&err);
        assert_eq!(value["error"]["kind"], "Validation");
        assert_eq!(value["error"]["status"], 400);
        assert_eq!(value["error"]["fields"]["name"][0], "This field may not be blank.");
    }

    #[test]
    fn error_text_lists_fields_without_color() {
        let mut fields = FieldErrors::new();
        fields.push("salary", "A valid number is required.");
        let err = Error::validation(fields).with_hint("fix it");
        let text = error_text(&err, false);
        assert!(text.starts_with("error: rejected by the service"));
        assert!(text.contains("  salary: A valid number is required."));
        assert!(text.ends_with("hint: fix it"));
    }

    #[test]
    fn bind_must_be_host_and_port() {
        assert!(parse_bind("127.0.0.1:0").is_ok());
        let err = parse_bind("localhost").expect_err("usage");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn table_line_pads_columns() {
        let line = table_line(&["1".to_string(), "Tom".to_string()], &[2, 5]);
        assert_eq!(line, "1   Tom");
    }
}
