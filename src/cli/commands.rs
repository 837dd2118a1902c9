use crate::{
    collector::AnnotationCollector,
    config::AuditConfig,
    emitter::YamlEmitter,
    logging::{init_logging_with_config, LogConfig},
    metadata::{php, MetadataTable},
    routes::load_routes,
};
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line interface for annotation-audit
///
/// Collects the role/permission metadata of every routed handler and writes
/// it to a YAML report.
#[derive(Parser)]
#[command(name = "annotation-audit")]
#[command(about = "Audit the security annotations of an application's routes", long_about = None)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Collect security expressions for every route and write the report
    Scan {
        /// Route file (name → controller mapping) or OpenAPI document, YAML or JSON
        #[arg(short, long, env = "ANNOTATION_AUDIT_ROUTES")]
        routes: PathBuf,

        /// Metadata table describing controller classes and methods (YAML or JSON)
        #[arg(short, long, required_unless_present = "source", conflicts_with = "source")]
        metadata: Option<PathBuf>,

        /// Directory of PHP controller sources to scan instead of a metadata table
        #[arg(long)]
        source: Option<PathBuf>,

        /// Report path (default: ./security_annotations.yml, or ANNOTATION_AUDIT_OUTPUT)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// YAML levels rendered in block style before switching to inline style
        #[arg(long)]
        inline: Option<usize>,

        /// Spaces per YAML indentation level
        #[arg(long)]
        indent: Option<usize>,
    },
    /// Scan PHP controller sources and print (or save) the metadata table
    ExtractMetadata {
        /// Directory of PHP controller sources
        #[arg(long)]
        source: PathBuf,

        /// Write the table to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Parse arguments, initialize logging and execute the command
///
/// # Errors
///
/// Returns an error if:
/// - The route file or metadata table cannot be read or parsed
/// - The PHP source directory cannot be walked
/// - The report cannot be written
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging_with_config(&LogConfig::from_env())?;
    let stdout = std::io::stdout();
    run(&cli, &mut stdout.lock())
}

/// Execute a parsed command, writing console output to `out`.
pub fn run(cli: &Cli, out: &mut dyn Write) -> anyhow::Result<()> {
    match &cli.command {
        Commands::Scan {
            routes,
            metadata,
            source,
            output,
            inline,
            indent,
        } => {
            let config = AuditConfig::from_env();
            let output = output.clone().unwrap_or(config.output);
            let emitter = YamlEmitter::new(
                inline.unwrap_or(config.inline),
                indent.unwrap_or(config.indent),
            );

            let routes = load_routes(routes)?;
            let table = load_metadata(metadata.as_deref(), source.as_deref())?;
            info!(routes = routes.len(), classes = table.len(), "collecting security annotations");

            let collection = AnnotationCollector::new(&table).collect(&routes);
            for diagnostic in &collection.diagnostics {
                writeln!(out, "{}", diagnostic)?;
            }

            emitter.write(&output, &collection.report)?;
            writeln!(
                out,
                "Security annotations have been saved to {}",
                output.display()
            )?;
            Ok(())
        }
        Commands::ExtractMetadata { source, output } => {
            let table = php::scan_directory(source)?;
            let yaml = table.to_yaml()?;
            match output {
                Some(path) => {
                    std::fs::write(path, yaml)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    writeln!(
                        out,
                        "Metadata for {} class(es) has been saved to {}",
                        table.len(),
                        path.display()
                    )?;
                }
                None => write!(out, "{}", yaml)?,
            }
            Ok(())
        }
    }
}

fn load_metadata(metadata: Option<&Path>, source: Option<&Path>) -> anyhow::Result<MetadataTable> {
    match (metadata, source) {
        (Some(path), _) => MetadataTable::load(path),
        (None, Some(dir)) => php::scan_directory(dir),
        (None, None) => anyhow::bail!("either --metadata or --source is required"),
    }
}
