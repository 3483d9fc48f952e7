//! Callsheet CLI
//!
//! Reads NFC prop tags through the serial reader and resolves them against
//! the callsheet record store.

use callsheet_core::cli::{print_exit_codes, CliResult, ExitCodes};
use callsheet_core::config::{AppConfig, ConfigError, LoggingConfig};
use callsheet_core::core::error::TagError;
use callsheet_core::core::record::{FieldsError, NdefPayload, Record, RecordFields};
use callsheet_core::core::store::JsonFileStore;
use callsheet_core::core::transport::{self, Interrupt, LazyChannel};
use callsheet_core::core::TagOperations;
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

type Operations = TagOperations<LazyChannel, JsonFileStore>;

/// CLI output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format for scripting
    Json,
}

/// Callsheet CLI
#[derive(Parser, Debug)]
#[command(
    name = "callsheet",
    version,
    about = "Read and write NFC prop tags for the motion capture callsheet",
    long_about = None
)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    /// Verbose output (protocol traffic)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Serial port of the NFC reader (e.g., COM3, /dev/ttyACM0)
    #[arg(short, long, env = "CALLSHEET_PORT", global = true)]
    port: Option<String>,

    /// Baud rate
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Record store file
    #[arg(long, env = "CALLSHEET_STORE", global = true)]
    store: Option<PathBuf>,

    /// Config file
    #[arg(long, env = "CALLSHEET_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read a tag and show its record
    Read {
        /// Show the raw tag payload instead of the record
        #[arg(long)]
        raw: bool,
    },

    /// Read a tag and print its hardware id
    Id,

    /// Register a fresh tag with a new record
    Create {
        /// Comma-separated key:value pairs (name:Xample, recordType:example)
        fields: String,
    },

    /// Read a tag and merge new values into its record
    Update {
        /// Comma-separated key:value pairs
        fields: String,
    },

    /// Move an existing record onto a new tag
    Assign {
        /// Load the record from an existing tag first
        #[arg(long, conflicts_with = "name", required_unless_present = "name")]
        from_tag: bool,

        /// Load the record by name
        #[arg(long)]
        name: Option<String>,
    },

    /// Look up a record by name without touching the reader
    Find {
        /// Record name
        name: String,
    },

    /// List available serial ports
    ListPorts,

    /// Print the exit code table
    ExitCodes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(ExitCodes::CONFIG_ERROR);
        }
    };

    let _log_guard = init_logging(&cli, &config.logging);
    tracing::debug!("Starting callsheet v{}", env!("CARGO_PKG_VERSION"));

    let interrupt = Interrupt::new();
    let handler_interrupt = interrupt.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("You pressed Ctrl+C. Shutting down.");
        handler_interrupt.trigger();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {e}");
    }

    let result = match run(&cli, &config, &interrupt) {
        Ok(result) => result,
        Err(e) => classify_error(&e),
    };
    transport::shutdown();

    match &result {
        CliResult::Success(Some(msg)) if !cli.quiet => eprintln!("{msg}"),
        CliResult::Error(_, msg) => eprintln!("Error: {msg}"),
        _ => {}
    }
    result.to_exit_code()
}

fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if let Some(port) = &cli.port {
        config.serial.port.clone_from(port);
    }
    if let Some(baud) = cli.baud {
        config.serial.baud_rate = baud;
    }
    if let Some(store) = &cli.store {
        config.store.path.clone_from(store);
    }
    Ok(config)
}

fn init_logging(cli: &Cli, logging: &LoggingConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match (logging.file_enabled, &logging.directory) {
        (true, Some(dir)) => {
            let appender = tracing_appender::rolling::daily(dir, "callsheet.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().json().with_writer(writer)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(file_layer)
        .init();

    guard
}

fn classify_error(err: &anyhow::Error) -> CliResult {
    if let Some(tag) = err.downcast_ref::<TagError>() {
        return CliResult::from(tag);
    }
    if err.downcast_ref::<FieldsError>().is_some() {
        return CliResult::error(ExitCodes::INVALID_ARGS, err.to_string());
    }
    CliResult::error(ExitCodes::ERROR, format!("{err:#}"))
}

fn run(cli: &Cli, config: &AppConfig, interrupt: &Interrupt) -> anyhow::Result<CliResult> {
    match &cli.command {
        Commands::ListPorts => return list_ports(cli),
        Commands::ExitCodes => {
            print_exit_codes();
            return Ok(CliResult::success());
        }
        _ => {}
    }

    let channel = LazyChannel::new(config.serial.clone(), interrupt.clone());
    let store = JsonFileStore::open(&config.store.path);
    let mut ops = TagOperations::new(channel, store)
        .with_settings(config.session_settings())
        .with_defaults(config.records.clone());

    match &cli.command {
        Commands::Read { raw: true } => {
            status(cli, "Present a tag to the reader.");
            let payload = ops.read_tag()?;
            print_payload(cli, &payload)?;
            Ok(CliResult::success())
        }
        Commands::Read { raw: false } => {
            status(cli, "Present a tag to the reader.");
            let record = ops.get_record_from_tag()?;
            print_record(cli, &record)?;
            Ok(CliResult::success())
        }
        Commands::Id => {
            status(cli, "Present a tag to the reader.");
            let id = ops.get_id_from_tag()?;
            match cli.format {
                OutputFormat::Json => println!("{}", serde_json::json!({ "uid": id })),
                OutputFormat::Text => println!("{id}"),
            }
            Ok(CliResult::success())
        }
        Commands::Create { fields } => {
            let fields = RecordFields::parse(fields)?;
            status(cli, "Present a fresh tag, and keep it on the reader until the write completes.");
            let record = ops.create_record(&fields)?;
            print_record(cli, &record)?;
            Ok(CliResult::success_with_message("DONE: You may remove the tag from the reader."))
        }
        Commands::Update { fields } => update(cli, &mut ops, fields),
        Commands::Assign { from_tag, name } => assign(cli, &mut ops, *from_tag, name.as_deref()),
        Commands::Find { name } => {
            let record = ops.get_record_by_name(name)?;
            print_record(cli, &record)?;
            Ok(CliResult::success())
        }
        Commands::ListPorts | Commands::ExitCodes => Ok(CliResult::success()),
    }
}

fn update(cli: &Cli, ops: &mut Operations, fields: &str) -> anyhow::Result<CliResult> {
    let mut fields = RecordFields::parse(fields)?;
    status(cli, "Present the tag of the record to update.");
    let record = ops.get_record_from_tag()?;
    print_record(cli, &record)?;

    fields.insert("uuid", record.uuid.as_str());
    let record = ops.update_record(&fields)?;
    print_record(cli, &record)?;
    Ok(CliResult::success_with_message("Update complete"))
}

fn assign(
    cli: &Cli,
    ops: &mut Operations,
    from_tag: bool,
    name: Option<&str>,
) -> anyhow::Result<CliResult> {
    let record = match (from_tag, name) {
        (_, Some(name)) => {
            let record = ops.get_record_by_name(name)?;
            status(cli, &format!("Record for {} retrieved.", record.name));
            record
        }
        (true, None) => {
            status(cli, "Present the existing tag.");
            let record = ops.get_record_from_tag()?;
            print_record(cli, &record)?;
            if !confirm_new_tag()? {
                return Ok(CliResult::error(ExitCodes::CANCELLED, "Canceling"));
            }
            record
        }
        (false, None) => {
            return Ok(CliResult::error(
                ExitCodes::INVALID_ARGS,
                "either --from-tag or --name is required",
            ))
        }
    };

    status(cli, "Swipe new tag to associate with this record.");
    let record = ops.assign_tag(record)?;
    print_record(cli, &record)?;
    Ok(CliResult::success_with_message("DONE: You may remove the tag from the reader."))
}

/// Give the operator time to swap tags
fn confirm_new_tag() -> anyhow::Result<bool> {
    eprint!("Hit enter when ready with new tag or type \"cancel\": ");
    io::stderr().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(!answer.trim().eq_ignore_ascii_case("cancel"))
}

fn status(cli: &Cli, msg: &str) {
    if !cli.quiet {
        eprintln!("{msg}");
    }
}

fn print_record(cli: &Cli, record: &Record) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(record)?),
        OutputFormat::Text => {
            println!("---------- {} ----------", record.name);
            for (key, value) in record.fields() {
                if key == "name" {
                    continue;
                }
                println!("{key:>13}: {value}");
            }
            println!();
        }
    }
    Ok(())
}

fn print_payload(cli: &Cli, payload: &NdefPayload) -> anyhow::Result<()> {
    match cli.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(payload)?),
        OutputFormat::Text => {
            for (key, value) in payload.iter() {
                println!("{key:>13}: {value}");
            }
        }
    }
    Ok(())
}

fn list_ports(cli: &Cli) -> anyhow::Result<CliResult> {
    let ports = transport::list_ports()?;

    if ports.is_empty() {
        status(cli, "No serial ports found.");
        return Ok(CliResult::success());
    }

    match cli.format {
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = ports
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "name": p.port_name,
                        "type": format!("{:?}", p.port_type)
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Text => {
            for port in &ports {
                println!("{} [{:?}]", port.port_name, port.port_type);
            }
        }
    }
    Ok(CliResult::success())
}
