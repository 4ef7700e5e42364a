//! Values Schema CLI
//!
//! Compiles the annotations of a data-values document and optionally exports
//! the inferred schema as an OpenAPI v3 document.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use values_schema::{
    emit, infer, load_annotations, load_values_auto, process_assert_annotations, to_json, to_yaml,
    InspectOptions, OutputType, ValidationStore, DEFAULT_DOCUMENT_TITLE,
};

#[derive(Parser)]
#[command(name = "values-schema")]
#[command(about = "Compile data-values annotations into validations and an OpenAPI schema")]
#[command(version)]
struct Cli {
    /// Values source: file path or URL (http:// or https://)
    values: String,

    /// Annotation sidecar (JSON Pointer -> annotations)
    #[arg(long)]
    annotations: Option<PathBuf>,

    /// Export the inferred data values schema
    #[arg(long)]
    data_values_schema_inspect: bool,

    /// Output type; only openapi-v3 is supported
    #[arg(long, short)]
    output: Option<String>,

    /// Title of the exported document
    #[arg(long, default_value = DEFAULT_DOCUMENT_TITLE)]
    title: String,

    /// Write the exported document as JSON instead of YAML
    #[arg(long)]
    json: bool,

    /// Pretty-print JSON output
    #[arg(long, requires = "json")]
    pretty: bool,

    /// Output file (stdout if not specified)
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Log pass progress to stderr (overridden by RUST_LOG)
    #[arg(long, short)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: Cli) -> Result<(), u8> {
    let options = InspectOptions::new(cli.data_values_schema_inspect)
        .output(cli.output)
        .title(cli.title);
    let output_type = options.validate().map_err(|e| fail(&e, e.exit_code()))?;

    let (mut tree, document) =
        load_values_auto(&cli.values).map_err(|e| fail(&e, e.exit_code()))?;
    if let Some(path) = &cli.annotations {
        load_annotations(&mut tree, document, path).map_err(|e| fail(&e, e.exit_code()))?;
    }

    let mut store = ValidationStore::new();
    let validations = process_assert_annotations(&tree, document, &mut store)
        .map_err(|e| fail(&e, e.exit_code()))?;
    let schema = infer(&tree, document).map_err(|e| fail(&e, e.exit_code()))?;

    let rendered = match output_type {
        Some(OutputType::OpenApiV3) => {
            let doc = emit(&schema, &options.title);
            if cli.json {
                to_json(&doc, cli.pretty).map_err(|e| {
                    eprintln!("Error serializing output: {}", e);
                    2u8
                })?
            } else {
                to_yaml(&doc).map_err(|e| {
                    eprintln!("Error serializing output: {}", e);
                    2u8
                })?
            }
        }
        None => format!(
            "OK: {} validation(s) compiled, schema inferred for {} node(s)",
            validations,
            schema.node_count()
        ),
    };

    match cli.output_file {
        Some(path) => {
            std::fs::write(&path, &rendered).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", rendered.trim_end());
        }
    }

    Ok(())
}

/// Report an error on stderr and map it to its exit code.
fn fail(err: &dyn std::fmt::Display, code: i32) -> u8 {
    eprintln!("Error: {}", err);
    u8::try_from(code).unwrap_or(1)
}
