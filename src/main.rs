//! gpcc - packet classifier compiler
//!
//! Command-line front end for the resource-group commit service, the
//! packet-classifier config service and the rule fetch server.
//!
//! # Usage
//!
//! ```bash
//! gpcc commit < new-config.json         # Diff against the baseline and provision
//! gpcc commit --input cfg.json --dry-run
//! gpcc get-config                       # Last applied resource-group config
//! gpcc gpc-set --input gpc.json         # Compile and persist packet classifiers
//! gpcc compile my-group --format text   # Show one compiled ruleset
//! gpcc serve                            # Answer ruleset requests
//! gpcc proto 58                         # Protocol number/name lookup
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use gpc_compiler::core::error::{Error, Result};
use gpc_compiler::core::gpc_service::GpcService;
use gpc_compiler::core::protocols;
use gpc_compiler::core::res_grp_service::ResGrpService;
use gpc_compiler::core::store::SocketStore;
use gpc_compiler::{audit, config, server};
use serde_json::Value;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info};

/// Exit status when the control-plane store cannot be reached
const EXIT_STORE_UNREACHABLE: u8 = 3;

#[derive(Parser)]
#[command(name = "gpcc")]
#[command(about = "Packet classifier compiler and resource-group provisioner", long_about = None)]
struct Cli {
    /// Service configuration file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision a new resource-group config (read from stdin by default)
    Commit {
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
        /// Print the operations instead of sending them
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the last applied resource-group config
    GetConfig,
    /// Print resource-group operational state
    GetState,
    /// Validate a proposed resource-group config
    Validate {
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Compile and persist a new packet-classifier config
    GpcSet {
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Print the current packet-classifier config
    GpcGet,
    /// Check a proposed packet-classifier config
    GpcCheck {
        #[arg(short, long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Compile one group or classifier from the persisted config
    Compile {
        /// Group or classifier name
        name: String,
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Hex)]
        format: OutputFormat,
    },
    /// Serve compiled rulesets over the fetch socket
    Serve {
        #[arg(short, long, value_name = "PATH")]
        socket: Option<PathBuf>,
    },
    /// Resolve a protocol name to its number, or a number to its name
    Proto {
        #[arg(value_name = "NAME|NUMBER")]
        value: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Hex,
    Text,
    Raw,
}

fn read_input(input: Option<&Path>) -> Result<Value> {
    let content = match input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            content
        }
    };
    Ok(serde_json::from_str(&content)?)
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn to_hex(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let app_config = config::load_config(cli.config.as_deref());

    match handle_cli(cli.command, &app_config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_unreachable() => {
            error!("{e}");
            ExitCode::from(EXIT_STORE_UNREACHABLE)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn handle_cli(command: Commands, app_config: &config::AppConfig) -> Result<()> {
    let audit_path = app_config.audit_log_path();

    match command {
        Commands::Commit { input, dry_run } => {
            let new = read_input(input.as_deref())?;
            let mut service = ResGrpService::new(&app_config.res_grp_config_file);

            if dry_run {
                for op in service.plan(&new) {
                    println!("{op}");
                }
                return Ok(());
            }

            let result = SocketStore::connect(&app_config.controller_socket)
                .map_err(Error::from)
                .and_then(|mut store| service.commit(&new, &mut store));

            audit::log_commit(
                audit_path.as_deref(),
                result.as_ref().map_or(0, |count| *count),
                result.is_ok(),
                result.as_ref().err().map(ToString::to_string),
            );
            result?;
        }
        Commands::GetConfig => {
            print_json(&ResGrpService::new(&app_config.res_grp_config_file).get_config())?;
        }
        Commands::GetState => {
            print_json(&ResGrpService::new(&app_config.res_grp_config_file).get_state())?;
        }
        Commands::Validate { input } => {
            let proposed = read_input(input.as_deref())?;
            ResGrpService::new(&app_config.res_grp_config_file).validate(&proposed)?;
        }
        Commands::GpcSet { input } => {
            let new = read_input(input.as_deref())?;
            let mut service = GpcService::new(&app_config.gpc_config_file);
            let result = service.set(new);

            audit::log_gpc_set(
                audit_path.as_deref(),
                service.compiled().map_or(0, |c| c.len()),
                result.is_ok(),
                result.as_ref().err().map(ToString::to_string),
            );
            result?;
        }
        Commands::GpcGet => {
            let mut service = GpcService::new(&app_config.gpc_config_file);
            print_json(service.get())?;
        }
        Commands::GpcCheck { input } => {
            let proposed = read_input(input.as_deref())?;
            GpcService::new(&app_config.gpc_config_file).check(&proposed)?;
        }
        Commands::Compile { name, format } => {
            let service = GpcService::start(&app_config.gpc_config_file);
            let compiled = service
                .compiled()
                .and_then(|c| c.get(&name))
                .ok_or_else(|| {
                    Error::config("compile", format!("no group or classifier named '{name}'"))
                })?;

            let bytes = compiled.serialize();
            match format {
                OutputFormat::Hex => println!("{}", to_hex(&bytes)),
                OutputFormat::Text => print!("{}", compiled.message()),
                OutputFormat::Raw => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&bytes)?;
                    stdout.flush()?;
                }
            }
        }
        Commands::Serve { socket } => {
            let socket = socket.unwrap_or_else(|| app_config.fetch_socket.clone());
            let service = GpcService::start(&app_config.gpc_config_file);

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            runtime.block_on(async {
                let listener = server::bind(&socket)?;
                info!("Listening on {}", socket.display());
                server::serve(listener, service).await
            })?;
        }
        Commands::Proto { value } => match value.parse::<u32>() {
            Ok(number) => println!("{}", protocols::number_to_name(number)),
            Err(_) => println!("{}", protocols::name_to_number(&value)),
        },
    }

    Ok(())
}
