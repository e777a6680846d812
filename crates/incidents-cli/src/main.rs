#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use incidents_core::config::{DATA_DIR_ENV, resolve_data_dir};
use incidents_core::error::ErrorCode;
use output::{CliError, OutputMode};
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "inc: track incidents from report to resolution",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (overridden by INCIDENTS_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Data directory (default: $INCIDENTS_DIR, then ./.incidents).
    #[arg(long, global = true, value_name = "PATH")]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Derive the output mode from flags.
    fn output_mode(&self) -> OutputMode {
        output::resolve_output_mode(self.format, self.json)
    }

    fn data_dir(&self, cwd: &Path) -> PathBuf {
        resolve_data_dir(self.dir.as_deref(), env::var(DATA_DIR_ENV).ok(), cwd)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize an incident store",
        long_about = "Create the data directory, a default config.toml, and an empty incident store.",
        after_help = "EXAMPLES:\n    # Initialize in ./.incidents\n    inc init\n\n    # Use another directory\n    inc --dir /var/lib/incidents init"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Report a new incident",
        long_about = "Validate the fields and create an OPEN incident.",
        after_help = "EXAMPLES:\n    # Report an outage\n    inc create --title \"Server down\" --description \"Main server offline\" --category IT --severity HIGH\n\n    # Emit machine-readable output\n    inc create -t \"Wet floor\" -d \"Spill near the lobby\" -c SAFETY -s LOW --json"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Read",
        about = "List incidents",
        long_about = "List incidents in reporting order. ARCHIVED incidents are hidden unless --all is given.",
        after_help = "EXAMPLES:\n    # Active incidents\n    inc list\n\n    # Everything, including archived, as JSON\n    inc list --all --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Read",
        about = "Show one incident",
        after_help = "EXAMPLES:\n    inc show 0b6f6c1e-8d6e-4a57-9d59-0c1d2e3f4a5b"
    )]
    Show(cmd::show::ShowArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Change an incident's status",
        long_about = "Move an incident OPEN -> INVESTIGATING -> RESOLVED. ARCHIVED is accepted from OPEN or RESOLVED.",
        after_help = "EXAMPLES:\n    # Start investigating\n    inc status <ID> investigating\n\n    # Close it out\n    inc status <ID> resolved"
    )]
    Status(cmd::status::StatusArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Archive an OPEN or RESOLVED incident"
    )]
    Archive(cmd::archive::ArchiveArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Return an ARCHIVED incident to OPEN"
    )]
    Unarchive(cmd::unarchive::UnarchiveArgs),

    #[command(
        next_help_heading = "Lifecycle",
        about = "Permanently delete an incident"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Interoperability",
        about = "Bulk-create incidents from JSON",
        long_about = "Read JSON Lines or a JSON array of incident records and create each valid one. Invalid rows are reported and skipped.",
        after_help = "EXAMPLES:\n    # From a file\n    inc import --file batch.jsonl\n\n    # From stdin\n    cat batch.json | inc import --json"
    )]
    Import(cmd::import::ImportArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("INCIDENTS_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "incidents=debug,info"
        } else {
            "incidents=info,warn"
        })
    });

    let format = env::var("INCIDENTS_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout stays parseable.
    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode, data_dir: &Path) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, data_dir),
        Commands::Create(args) => cmd::create::run_create(args, output, data_dir),
        Commands::List(args) => cmd::list::run_list(args, output, data_dir),
        Commands::Show(args) => cmd::show::run_show(args, output, data_dir),
        Commands::Status(args) => cmd::status::run_status(args, output, data_dir),
        Commands::Archive(args) => cmd::archive::run_archive(args, output, data_dir),
        Commands::Unarchive(args) => cmd::unarchive::run_unarchive(args, output, data_dir),
        Commands::Delete(args) => cmd::delete::run_delete(args, output, data_dir),
        Commands::Import(args) => cmd::import::run_import(args, output, data_dir),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    if cli.verbose {
        info!("Verbose mode enabled");
    }

    let output = cli.output_mode();
    let result = env::current_dir()
        .map_err(anyhow::Error::from)
        .and_then(|cwd| run(&cli, output, &cli.data_dir(&cwd)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.is::<cmd::Reported>() => {
            debug!(error = %err, "command failed");
            ExitCode::FAILURE
        }
        Err(err) => {
            let error = CliError::from_code(ErrorCode::InternalUnexpected, format!("{err:#}"));
            if output::render_error(output, &error).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["inc", "--json", "list"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["inc", "list", "--json"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_wins() {
        let cli = Cli::parse_from(["inc", "--json", "--format", "text", "list"]);
        assert_eq!(cli.output_mode(), OutputMode::Text);
    }

    #[test]
    fn dir_flag_is_global() {
        let cli = Cli::parse_from(["inc", "list", "--dir", "/tmp/inc-data"]);
        assert_eq!(
            cli.data_dir(Path::new("/work")),
            PathBuf::from("/tmp/inc-data")
        );
    }

    #[test]
    fn status_subcommand_parses() {
        let cli = Cli::parse_from(["inc", "status", "abc", "RESOLVED"]);
        assert!(matches!(cli.command, Commands::Status(_)));
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["inc", "init"],
            vec!["inc", "create", "--title", "x"],
            vec!["inc", "list", "--all"],
            vec!["inc", "show", "x"],
            vec!["inc", "status", "x", "open"],
            vec!["inc", "archive", "x"],
            vec!["inc", "unarchive", "x"],
            vec!["inc", "delete", "x"],
            vec!["inc", "import", "--file", "batch.jsonl"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(
                result.is_ok(),
                "Failed to parse: {:?} error: {:?}",
                args,
                result.err()
            );
        }
    }

    #[test]
    fn status_requires_target() {
        assert!(Cli::try_parse_from(["inc", "status", "x"]).is_err());
    }
}
