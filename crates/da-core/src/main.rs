//! Device Audit Core
//!
//! The main entry point for da-core, handling:
//! - The HTTP layer for the browser front end (`serve`)
//! - One-shot device queries (`devices`, `packages`, `ls`, `cat`, ...)
//! - Offline parsing of captured bridge output (`parse`)
//! - Schema and configuration introspection

use clap::{Args, Parser, Subcommand, ValueEnum};
use da_common::error::format_error_human;
use da_common::{DeviceId, DevicePath, Error, OutputFormat, PackageName, Result, StructuredError};
use da_core::collect::{
    analyze_package, enrich_entries, parse_app_links, parse_devices, parse_listing,
    parse_package_list, parse_probe_output, sort_entries, AdbClient,
};
use da_core::config::{load_config, validate_config, ConfigOptions, ResolvedConfig};
use da_core::exit_codes::ExitCode;
use da_core::inspect::DeviceInspector;
use da_core::logging::{init_logging, LogConfig, LogFormat, LogLevel};
use da_core::schema::{
    available_schemas, format_schema, generate_all_schemas, generate_schema, SchemaFormat,
};
use da_core::server::HttpServer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Device Audit Core - inspect attached Android devices through adb
#[derive(Parser)]
#[command(name = "da-core")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Configuration file (default: $DA_CONFIG_DIR/config.json)
    #[arg(long, global = true, env = "DA_CONFIG")]
    config: Option<PathBuf>,

    /// adb executable (overrides config, ADB_PATH and SDK lookup)
    #[arg(long, global = true)]
    adb: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr (human, jsonl)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API and front end
    Serve(ServeArgs),

    /// List attached devices
    Devices,

    /// List installed packages with install and update times
    Packages {
        /// Device serial
        device: String,
    },

    /// Security profile of one package
    Package {
        /// Device serial
        device: String,
        /// Package name, e.g. com.example.app
        package: String,
    },

    /// List a device directory
    Ls {
        /// Device serial
        device: String,
        /// Absolute path on the device
        path: String,
    },

    /// Read a device file (text, printable strings, base64)
    Cat {
        /// Device serial
        device: String,
        /// Absolute path on the device
        path: String,
    },

    /// Search the device log buffer
    Logs {
        /// Device serial
        device: String,
        /// Text to match
        query: String,
    },

    /// Parse captured bridge output without a device
    Parse(ParseArgs),

    /// Print JSON schemas for output types
    Schema(SchemaArgs),

    /// Configuration management
    Config(ConfigArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Bind address (overrides config)
    #[arg(long)]
    bind: Option<String>,

    /// Port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Worker threads (overrides config)
    #[arg(long)]
    workers: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ParseKind {
    /// `ls -l` output
    Listing,
    /// `file *` output
    Probe,
    /// `pm get-app-links` output
    AppLinks,
    /// `dumpsys package <name>` output
    Package,
    /// `adb devices` output
    Devices,
    /// `pm list packages` output
    PackageList,
}

#[derive(Args, Debug)]
struct ParseArgs {
    /// Kind of captured output
    #[arg(value_enum)]
    kind: ParseKind,

    /// Read from this file instead of stdin
    #[arg(long, short = 'i')]
    input: Option<PathBuf>,

    /// With `probe`: listing to enrich with the probe descriptions
    #[arg(long)]
    listing: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Type name to print
    name: Option<String>,

    /// List available schema types
    #[arg(long, conflicts_with_all = ["name", "all"])]
    list: bool,

    /// Print all schemas
    #[arg(long, conflicts_with = "name")]
    all: bool,

    /// Single-line JSON
    #[arg(long)]
    compact: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Show the effective configuration and where it came from
    Show,
}

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let code = if e.use_stderr() {
                ExitCode::ArgsError
            } else {
                ExitCode::Clean
            };
            std::process::exit(code.as_i32());
        }
    };

    let level = LogLevel::from_flags(cli.global.verbose, cli.global.quiet);
    init_logging(&LogConfig::from_env(level, cli.global.log_format));

    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(err) => report_error(&cli.global, &err),
    };

    std::process::exit(exit_code.as_i32());
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let global = &cli.global;
    match &cli.command {
        Commands::Serve(args) => run_serve(global, args),
        Commands::Devices => {
            let response = inspector(global)?.devices();
            emit(global, &response, || {
                let mut out = format!("{} device(s)", response.devices.len());
                for d in &response.devices {
                    out.push_str(&format!("\n{}\t{}", d.id, d.status));
                }
                out
            })
        }
        Commands::Packages { device } => {
            let device = DeviceId::parse(device)?;
            let response = inspector(global)?.packages(&device)?;
            emit(global, &response, || {
                format!("{}: {} packages", response.device_id, response.total_count)
            })
        }
        Commands::Package { device, package } => {
            let device = DeviceId::parse(device)?;
            let package = PackageName::parse(package)?;
            let response = inspector(global)?.package_details(&device, &package)?;
            emit(global, &response, || {
                let a = &response.analysis;
                format!(
                    "{} {} ({}) uid={} debuggable={} requested={} granted={} blocked_domains={}",
                    response.package,
                    a.version_name,
                    a.version_code,
                    a.user_id,
                    a.is_debuggable,
                    a.requested_permissions.len(),
                    a.granted_permissions.len(),
                    a.blocked_domains().count()
                )
            })
        }
        Commands::Ls { device, path } => {
            let device = DeviceId::parse(device)?;
            let path = DevicePath::parse(path)?;
            let response = inspector(global)?.list_files(&device, &path)?;
            emit(global, &response, || match &response.error {
                Some(message) => format!("{}: {}", response.path, message),
                None => {
                    let mut out = format!("{}: {} entries", response.path, response.files.len());
                    for f in &response.files {
                        out.push_str(&format!("\n{} {:>10} {} {}", f.permissions, f.size, f.modified, f.name));
                    }
                    out
                }
            })?;
            Ok(response
                .failure()
                .map(|err| ExitCode::from(&err))
                .unwrap_or(ExitCode::Clean))
        }
        Commands::Cat { device, path } => {
            let device = DeviceId::parse(device)?;
            let path = DevicePath::parse(path)?;
            let response = inspector(global)?.read_file(&device, &path)?;
            emit(global, &response, || {
                format!(
                    "{}: {} bytes, {} printable runs",
                    response.path,
                    response.size,
                    response.strings.len()
                )
            })
        }
        Commands::Logs { device, query } => {
            let device = DeviceId::parse(device)?;
            let response = inspector(global)?.logs(&device, query)?;
            emit(global, &response, || response.logs.clone())
        }
        Commands::Parse(args) => run_parse(global, args),
        Commands::Schema(args) => run_schema(global, args),
        Commands::Config(args) => match args.command {
            ConfigCommands::Show => run_config_show(global),
        },
        Commands::Version => {
            let version_info = serde_json::json!({
                "da_core_version": env!("CARGO_PKG_VERSION"),
                "rust_version": env!("CARGO_PKG_RUST_VERSION"),
            });
            emit(global, &version_info, || {
                format!("da-core {}", env!("CARGO_PKG_VERSION"))
            })
        }
    }
}

// ============================================================================
// Shared plumbing
// ============================================================================

fn resolved_config(global: &GlobalOpts) -> Result<ResolvedConfig> {
    let options = ConfigOptions {
        config_path: global.config.clone(),
        config_dir: None,
    };
    Ok(load_config(&options)?)
}

fn inspector_for(global: &GlobalOpts, config: &ResolvedConfig) -> DeviceInspector {
    let adb = config.resolve_adb(global.adb.as_deref());
    info!(adb = %adb.path.display(), source = %adb.source, "adb resolved");
    DeviceInspector::new(AdbClient::new(config.adb_config(&adb)))
}

fn inspector(global: &GlobalOpts) -> Result<DeviceInspector> {
    let config = resolved_config(global)?;
    Ok(inspector_for(global, &config))
}

/// Print a payload to stdout in the selected format.
fn emit<T, F>(global: &GlobalOpts, value: &T, summary: F) -> Result<ExitCode>
where
    T: Serialize,
    F: FnOnce() -> String,
{
    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Summary => println!("{}", summary()),
    }
    Ok(ExitCode::Clean)
}

fn report_error(global: &GlobalOpts, err: &Error) -> ExitCode {
    match global.format {
        OutputFormat::Json => eprintln!("{}", StructuredError::from(err).to_json()),
        OutputFormat::Summary => {
            let use_color = !global.no_color && std::io::stderr().is_terminal();
            eprintln!("{}", format_error_human(err, use_color));
        }
    }
    ExitCode::from(err)
}

fn read_input(path: Option<&Path>) -> Result<String> {
    let bytes = match path {
        Some(path) => std::fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::InvalidArgument(format!("input file not found: {}", path.display()))
            } else {
                Error::Io(e)
            }
        })?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_serve(global: &GlobalOpts, args: &ServeArgs) -> Result<ExitCode> {
    let resolved = resolved_config(global)?;
    let mut config = resolved.config.clone();
    if let Some(bind) = &args.bind {
        config.bind = bind.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    validate_config(&config)?;

    let inspector = inspector_for(global, &resolved);
    let server = HttpServer::start(&config, inspector)?;
    eprintln!("Serving on http://{}", server.addr());
    server.wait();
    Ok(ExitCode::Clean)
}

fn run_parse(global: &GlobalOpts, args: &ParseArgs) -> Result<ExitCode> {
    if args.listing.is_some() && args.kind != ParseKind::Probe {
        return Err(Error::InvalidArgument(
            "--listing only applies to `parse probe`".to_string(),
        ));
    }
    let text = read_input(args.input.as_deref())?;

    match args.kind {
        ParseKind::Listing => {
            let mut entries = parse_listing(&text);
            sort_entries(&mut entries);
            emit(global, &entries, || format!("{} entries", entries.len()))
        }
        ParseKind::Probe => match &args.listing {
            Some(listing_path) => {
                let listing = read_input(Some(listing_path))?;
                let mut entries = parse_listing(&listing);
                enrich_entries(&mut entries, &text);
                sort_entries(&mut entries);
                emit(global, &entries, || {
                    let hinted = entries.iter().filter(|e| e.content_hint.is_some()).count();
                    format!("{} entries, {} with content hints", entries.len(), hinted)
                })
            }
            None => {
                let hints: BTreeMap<String, String> = parse_probe_output(&text).into_iter().collect();
                emit(global, &hints, || format!("{} descriptions", hints.len()))
            }
        },
        ParseKind::AppLinks => {
            let report = parse_app_links(&text);
            emit(global, &report, || {
                let mut out = format!("{} domains", report.domains.len());
                for d in &report.domains {
                    out.push_str(&format!("\n{}\t{}\t{}", d.domain, d.severity, d.description));
                }
                out
            })
        }
        ParseKind::Package => {
            let profile = analyze_package(&text);
            emit(global, &profile, || {
                format!(
                    "{} ({}) uid={} debuggable={} requested={} granted={}",
                    profile.version_name,
                    profile.version_code,
                    profile.user_id,
                    profile.is_debuggable,
                    profile.requested_permissions.len(),
                    profile.granted_permissions.len()
                )
            })
        }
        ParseKind::Devices => {
            let devices = parse_devices(&text);
            emit(global, &devices, || format!("{} device(s)", devices.len()))
        }
        ParseKind::PackageList => {
            let names = parse_package_list(&text);
            emit(global, &names, || format!("{} packages", names.len()))
        }
    }
}

fn run_schema(global: &GlobalOpts, args: &SchemaArgs) -> Result<ExitCode> {
    let format = if args.compact {
        SchemaFormat::JsonCompact
    } else {
        SchemaFormat::Json
    };

    if args.list || (args.name.is_none() && !args.all) {
        let names: Vec<_> = available_schemas()
            .into_iter()
            .map(|(name, description)| serde_json::json!({"name": name, "description": description}))
            .collect();
        return emit(global, &names, || {
            available_schemas()
                .into_iter()
                .map(|(name, description)| format!("{:<24} {}", name, description))
                .collect::<Vec<_>>()
                .join("\n")
        });
    }

    if args.all {
        let all = serde_json::to_value(generate_all_schemas())?;
        println!("{}", format_schema(&all, format));
        return Ok(ExitCode::Clean);
    }

    let name = args.name.as_deref().unwrap_or_default();
    match generate_schema(name) {
        Some(schema) => {
            println!("{}", format_schema(&schema, format));
            Ok(ExitCode::Clean)
        }
        None => Err(Error::InvalidArgument(format!(
            "unknown schema type `{}` (see `da-core schema --list`)",
            name
        ))),
    }
}

fn run_config_show(global: &GlobalOpts) -> Result<ExitCode> {
    let resolved = resolved_config(global)?;
    let adb = resolved.resolve_adb(global.adb.as_deref());
    if !adb.path.exists() && adb.path.components().count() > 1 {
        warn!(adb = %adb.path.display(), "resolved adb path does not exist");
    }
    let snapshot = resolved.snapshot(adb);

    emit(global, &snapshot, || {
        let source = snapshot
            .config_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string());
        format!(
            "config: {} adb: {} (from {}) listen: {}:{} workers: {}",
            source,
            snapshot.adb.path.display(),
            snapshot.adb.source,
            snapshot.config.bind,
            snapshot.config.port,
            snapshot.config.workers
        )
    })
}
