//! reledit CLI - Edit the values of a deployed release and upgrade it

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod display;
mod editor;
mod error;
mod exit_codes;

use commands::edit::EditOptions;
use commands::get_values::OutputFormat;
use config::{Config, StorageKind};
use editor::CommandEditor;
use error::CliError;

const DEFAULT_NAMESPACE: &str = "default";

#[derive(Parser)]
#[command(name = "reledit")]
#[command(author = "reledit Contributors")]
#[command(version)]
#[command(about = "Edit the values of a deployed release, then upgrade it", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Configuration file
    #[arg(long, global = true, env = "RELEDIT_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Edit the values of a release in an editor and upgrade it
    Edit {
        /// Release name
        name: String,

        /// Release namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// Edit all (computed) values instead of the user-supplied ones
        #[arg(short, long)]
        all: bool,

        /// Edit the values of this revision (0 = latest)
        #[arg(long, default_value_t = 0)]
        revision: u32,

        /// Editor command, `$VAR` references are expanded
        #[arg(short, long, env = "RELEDIT_EDITOR")]
        editor: Option<String>,

        /// Keep values that equal the pack defaults
        #[arg(short = 'm', long)]
        disable_default_subtraction: bool,

        /// Wait until the new revision is deployed
        #[arg(long)]
        wait: bool,

        /// Timeout for the upgrade (e.g. `300s`, `5m`; a bare number is seconds)
        #[arg(long, value_parser = parse_timeout)]
        timeout: Option<Duration>,

        /// Show the override diff before upgrading
        #[arg(long)]
        diff: bool,

        #[command(flatten)]
        storage: StorageArgs,
    },

    /// Print the values of a release
    GetValues {
        /// Release name
        name: String,

        /// Release namespace
        #[arg(short, long)]
        namespace: Option<String>,

        /// Print all (computed) values
        #[arg(short, long)]
        all: bool,

        /// Values of this revision (0 = latest)
        #[arg(long, default_value_t = 0)]
        revision: u32,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Yaml)]
        output: OutputFormat,

        #[command(flatten)]
        storage: StorageArgs,
    },
}

#[derive(clap::Args)]
struct StorageArgs {
    /// Release store
    #[arg(long = "storage", value_enum)]
    kind: Option<StorageKind>,

    /// Directory of the file release store
    #[arg(long = "storage-dir")]
    dir: Option<PathBuf>,
}

/// Parse a `--timeout` value with the same syntax as the config file
fn parse_timeout(value: &str) -> Result<Duration, String> {
    if let Ok(secs) = value.parse::<u64>() {
        return Ok(Duration::from_secs(secs));
    }
    humantime::parse_duration(value).map_err(|e| e.to_string())
}

fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("RELEDIT_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(cli).await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::from(code as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Edit {
            name,
            namespace,
            all,
            revision,
            editor,
            disable_default_subtraction,
            wait,
            timeout,
            diff,
            storage,
        } => {
            let namespace = namespace_or_default(namespace, &config);
            let editor = CommandEditor::resolve(editor.as_deref(), config.editor.as_deref());
            let timeout = timeout
                .or(config.timeout)
                .unwrap_or(reledit_kube::actions::DEFAULT_UPGRADE_TIMEOUT);

            let options = EditOptions {
                all_values: all,
                revision,
                disable_default_subtraction,
                wait,
                timeout,
                show_diff: diff,
                max_history: config.max_history,
            };

            let store = commands::open_storage(storage.kind, storage.dir.as_deref(), &config).await?;
            commands::edit::run(&name, &namespace, store, editor, &options).await
        }

        Commands::GetValues {
            name,
            namespace,
            all,
            revision,
            output,
            storage,
        } => {
            let namespace = namespace_or_default(namespace, &config);
            let store = commands::open_storage(storage.kind, storage.dir.as_deref(), &config).await?;
            commands::get_values::run(&name, &namespace, store, all, revision, output).await
        }
    }
}

fn namespace_or_default(flag: Option<String>, config: &Config) -> String {
    flag.or_else(|| config.namespace.clone())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}
