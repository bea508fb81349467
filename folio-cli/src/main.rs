// Command-line interface for folio
//
// This binary is a thin shell over folio-formats: every command resolves a format plugin
// through the registry (explicit --from, alias, or detection) and delegates to the IO service.
//
// Usage:
//  folio <input> --to <format> [--from <format>] [--output <file>]  - Convert between formats (default)
//  folio convert <input> --to <format> [--from <format>] [--output <file>]  - Same as above (explicit)
//  folio import <input> [--from <format>]      - Print the imported content nodes as JSON
//  folio validate <input> [--from <format>]    - Check a file; exits non-zero when invalid
//  folio detect <input>                        - Name the format a file would be imported as
//  folio formats                               - List registered formats and aliases
//
// Configuration:
//
// ./folio.toml is layered over the built-in defaults when present; --config adds an explicit
// file on top. Logging goes to stderr and follows RUST_LOG (default "warn").

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use folio_config::{build_registry, FolioConfig, Loader};
use folio_formats::services::IoService;
use folio_formats::{ExportInput, ExportOutput, FormatRegistry, SourceFile};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::process;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const SUBCOMMANDS: &[&str] = &["convert", "import", "validate", "detect", "formats", "help"];

fn input_arg() -> Arg {
    Arg::new("input")
        .help("Input file path")
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn from_arg() -> Arg {
    Arg::new("from")
        .long("from")
        .help("Source format or alias (detected from the file if not specified)")
        .value_hint(ValueHint::Other)
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .help("Print machine-readable JSON")
        .action(ArgAction::SetTrue)
}

fn build_cli() -> Command {
    Command::new("folio")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Import, convert and validate learning content formats")
        .long_about(
            "folio works with the content formats of a learning platform: Markdown documents,\n\
            Gherkin feature files, Perseus quiz JSON and packaged HTML5 apps.\n\n\
            Examples:\n  \
            folio notes.md --to gherkin                 # Convert (outputs to stdout)\n  \
            folio import voting.feature                 # Content nodes as JSON\n  \
            folio validate quiz.perseus.json            # Errors, warnings and stats\n  \
            folio detect upload.bin                     # Which format would be used\n  \
            folio formats                               # Registered formats and aliases"
        )
        .arg_required_else_help(true)
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a folio.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .subcommand(
            Command::new("convert")
                .about("Convert between content formats (default command)")
                .long_about(
                    "Import a file with one format and export its primary content node with another.\n\n\
                    The source format is detected from the file name and content unless --from is given.\n\
                    Text output goes to stdout by default; binary formats need -o.\n\n\
                    Examples:\n  \
                    folio convert voting.feature --to markdown     # Feature as Markdown (stdout)\n  \
                    folio convert app.zip --to html5-app -o out.zip\n  \
                    folio notes.md --to gherkin                     # 'convert' is optional"
                )
                .arg(input_arg())
                .arg(from_arg())
                .arg(
                    Arg::new("to")
                        .long("to")
                        .help("Target format or alias (required)")
                        .required(true)
                        .value_hint(ValueHint::Other),
                )
                .arg(
                    Arg::new("output")
                        .long("output")
                        .short('o')
                        .help("Output file path (defaults to stdout)")
                        .value_hint(ValueHint::FilePath),
                ),
        )
        .subcommand(
            Command::new("import")
                .about("Import a file and print its content nodes as JSON")
                .arg(input_arg())
                .arg(from_arg()),
        )
        .subcommand(
            Command::new("validate")
                .about("Validate a file against its format")
                .long_about(
                    "Reports errors, warnings and statistics for a file.\n\n\
                    Exits with status 1 when the file has errors; warnings never fail."
                )
                .arg(input_arg())
                .arg(from_arg())
                .arg(json_arg()),
        )
        .subcommand(
            Command::new("detect")
                .about("Detect the format of a file")
                .arg(input_arg()),
        )
        .subcommand(
            Command::new("formats")
                .about("List registered formats and aliases")
                .arg(json_arg()),
        )
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let cli = build_cli();
    let matches = match cli.clone().try_get_matches_from(&args) {
        Ok(m) => m,
        Err(e) => {
            // A leading file path means the user meant `convert`
            if args.len() > 1 && !args[1].starts_with('-') && !SUBCOMMANDS.contains(&args[1].as_str()) {
                let mut new_args = vec![args[0].clone(), "convert".to_string()];
                new_args.extend_from_slice(&args[1..]);
                match cli.try_get_matches_from(&new_args) {
                    Ok(m) => m,
                    Err(e2) => e2.exit(),
                }
            } else {
                e.exit();
            }
        }
    };

    let config = load_cli_config(matches.get_one::<String>("config").map(|s| s.as_str()));
    let registry = build_registry(&config);
    debug!(formats = ?registry.list_formats(), "registry ready");
    let io = IoService::new(&registry);

    match matches.subcommand() {
        Some(("convert", sub_matches)) => handle_convert_command(&io, sub_matches).await,
        Some(("import", sub_matches)) => handle_import_command(&io, sub_matches).await,
        Some(("validate", sub_matches)) => handle_validate_command(&io, sub_matches),
        Some(("detect", sub_matches)) => handle_detect_command(&io, sub_matches),
        Some(("formats", sub_matches)) => handle_formats_command(&registry, sub_matches.get_flag("json")),
        _ => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            process::exit(1);
        }
    }
}

fn required<'a>(matches: &'a ArgMatches, name: &str) -> &'a str {
    match matches.get_one::<String>(name) {
        Some(value) => value,
        None => {
            eprintln!("Error: missing argument '{name}'");
            process::exit(2);
        }
    }
}

fn read_source(path: &str) -> SourceFile {
    let bytes = fs::read(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{path}': {e}");
        process::exit(1);
    });
    SourceFile::new(path, bytes)
}

/// Handle the convert command
async fn handle_convert_command(io: &IoService<'_>, matches: &ArgMatches) {
    let input = required(matches, "input");
    let from = matches.get_one::<String>("from").map(|s| s.as_str());
    let to = required(matches, "to");
    let output = matches.get_one::<String>("output");

    if !io.registry().has(to) {
        eprintln!("Error: Format '{to}' not found");
        process::exit(1);
    }

    let imported = io.import_file(input, from).await.unwrap_or_else(|e| {
        eprintln!("Import error: {e}");
        process::exit(1);
    });
    for warning in &imported.warnings {
        eprintln!("warning[{}]: {}", warning.code, warning.message);
    }
    let Some(node) = imported.primary() else {
        eprintln!("Error: '{input}' produced no content");
        process::exit(1);
    };

    let result = io.export(&ExportInput::from(node), to).unwrap_or_else(|e| {
        eprintln!("Serialization error: {e}");
        process::exit(1);
    });

    match (output, result) {
        (Some(path), data) => {
            fs::write(path, data.into_bytes()).unwrap_or_else(|e| {
                eprintln!("Error writing file '{path}': {e}");
                process::exit(1);
            });
        }
        (None, ExportOutput::Text(text)) => {
            print!("{text}");
        }
        (None, ExportOutput::Binary(_)) => {
            eprintln!("Binary formats (like html5-app) require an output file. Use -o <path>.");
            process::exit(1);
        }
    }
}

/// Handle the import command
async fn handle_import_command(io: &IoService<'_>, matches: &ArgMatches) {
    let input = required(matches, "input");
    let from = matches.get_one::<String>("from").map(|s| s.as_str());

    let imported = io.import_file(input, from).await.unwrap_or_else(|e| {
        eprintln!("Import error: {e}");
        process::exit(1);
    });
    print_json(&json!({
        "nodes": imported.nodes,
        "warnings": imported.warnings,
    }));
}

/// Handle the validate command
fn handle_validate_command(io: &IoService<'_>, matches: &ArgMatches) {
    let input = required(matches, "input");
    let from = matches.get_one::<String>("from").map(|s| s.as_str());
    let file = read_source(input);

    let result = io.validate(&file, from).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    if matches.get_flag("json") {
        print_json(&result);
    } else {
        for error in &result.errors {
            match error.line {
                Some(line) => println!("error[{}] line {line}: {}", error.code, error.message),
                None => println!("error[{}]: {}", error.code, error.message),
            }
        }
        for warning in &result.warnings {
            println!("warning[{}]: {}", warning.code, warning.message);
        }
        if let Some(stats) = &result.stats {
            let stats: Vec<String> = stats.iter().map(|(key, value)| format!("{key}={value}")).collect();
            println!("stats: {}", stats.join(" "));
        }
        println!("{input}: {}", if result.is_valid() { "valid" } else { "invalid" });
    }

    if !result.is_valid() {
        process::exit(1);
    }
}

/// Handle the detect command
fn handle_detect_command(io: &IoService<'_>, matches: &ArgMatches) {
    let input = required(matches, "input");
    let file = read_source(input);
    let detection = io.detect(&file).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });
    println!("{}\t{:.2}", detection.format_id, detection.confidence.value());
}

/// Handle the formats command
fn handle_formats_command(registry: &FormatRegistry, as_json: bool) {
    if as_json {
        print_json(&json!({
            "formats": registry.list_metadata(),
            "aliases": registry
                .aliases()
                .into_iter()
                .map(|(alias, target)| json!({"alias": alias, "format": target}))
                .collect::<Vec<_>>(),
            "defaultEditor": registry.default_editor().name(),
        }));
        return;
    }

    println!("Formats:");
    for meta in registry.list_metadata() {
        println!(
            "  {:<10} {} ({})",
            meta.format_id,
            meta.display_name,
            meta.file_extensions.join(", ")
        );
    }
    let aliases = registry.aliases();
    if !aliases.is_empty() {
        println!("\nAliases:");
        for (alias, target) in aliases {
            println!("  {alias} -> {target}");
        }
    }
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => {
            eprintln!("Error encoding JSON: {e}");
            process::exit(1);
        }
    }
}

fn load_cli_config(explicit_path: Option<&str>) -> FolioConfig {
    let loader = Loader::new().with_optional_file("folio.toml");
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };

    loader.build().unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        process::exit(1);
    })
}
