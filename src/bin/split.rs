//! Proto Split CLI
//!
//! Splits one `.proto` file into one file per type.
//!
//! Usage:
//!   proto-split split schema.proto -o out/
//!   proto-split check schema.proto -o out/
//!   proto-split plan schema.proto --json
//!   proto-split graph schema.proto -o types.dot

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use proto_splitter::{check_output, write_files, Manifest, SplitOptions, SplitOutput, Splitter, SplitterConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "proto-split")]
#[command(about = "Split a .proto schema into one file per type with acyclic imports")]
struct Cli {
    /// Config file to layer over the default locations
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a schema and write the output files
    Split {
        /// Input schema file
        input: PathBuf,

        /// Output directory (default: output.dir from config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show what would be written without writing
        #[arg(long)]
        dry_run: bool,

        /// Write a JSON manifest of the run
        #[arg(long)]
        manifest: Option<PathBuf>,
    },

    /// Compare an output directory with what split would write
    Check {
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the file plan
    Plan {
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export the type dependency graph in DOT format
    Graph {
        input: PathBuf,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write the effective configuration to a file
    Init {
        #[arg(short, long, default_value = "splitter.toml")]
        output: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = SplitterConfig::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command {
        Commands::Split {
            input,
            output,
            dry_run,
            manifest,
        } => {
            let (source, result) = split_file(&input, &config)?;
            let dir = output.unwrap_or_else(|| config.output_dir());
            print_diagnostics(&result);

            if dry_run {
                println!("📋 Dry run: {} file(s) would be written to {:?}", result.files.len(), dir);
                for file in &result.files {
                    println!("   {} ({})", file.file_name, file.checksum.short());
                }
                return Ok(());
            }

            write_files(&dir, &result.files)?;
            println!("✅ Wrote {} file(s) to {:?}", result.files.len(), dir);

            if let Some(path) = manifest {
                Manifest::new(&source, &result.plans, &result.files).write(&path)?;
                println!("📄 Manifest: {:?}", path);
            }
        }

        Commands::Check { input, output } => {
            let (_, result) = split_file(&input, &config)?;
            let dir = output.unwrap_or_else(|| config.output_dir());
            let report = check_output(&dir, &result.files, &config.output.extension)?;

            if !report.has_drift() {
                println!("✅ {:?} is up to date ({} file(s))", dir, report.unchanged);
                return Ok(());
            }

            for name in &report.missing {
                println!("   + {}", name);
            }
            for name in &report.stale {
                println!("   - {}", name);
            }
            for changed in &report.changed {
                println!("   ~ {}", changed.file_name);
                print!("{}", changed.diff);
            }
            eprintln!(
                "\n⚠️  Output drift: {} missing, {} changed, {} stale",
                report.missing.len(),
                report.changed.len(),
                report.stale.len()
            );
            std::process::exit(1);
        }

        Commands::Plan { input, json } => {
            let (_, result) = split_file(&input, &config)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result.plans)?);
            } else {
                for plan in &result.plans {
                    let marker = if plan.is_merged() { "🔗" } else { "📄" };
                    println!("{} {}", marker, config.render_options().file_name(&plan.file_name));
                    if plan.is_merged() {
                        println!("   members: {}", plan.members.join(", "));
                    }
                    for import in &plan.imports {
                        println!("   imports {}", import);
                    }
                }
                print_diagnostics(&result);
            }
        }

        Commands::Graph { input, output } => {
            let (_, result) = split_file(&input, &config)?;
            let dot = result.graph.to_dot();
            match output {
                Some(path) => {
                    std::fs::write(&path, &dot)?;
                    println!(
                        "✅ Exported DOT to {:?} ({} types, {} references)",
                        path,
                        result.graph.node_count(),
                        result.graph.edge_count()
                    );
                }
                None => print!("{}", dot),
            }
        }

        Commands::Init { output } => {
            config.save(&output)?;
            println!("✅ Wrote configuration to {}", output);
        }
    }

    Ok(())
}

fn split_file(input: &Path, config: &SplitterConfig) -> anyhow::Result<(String, SplitOutput)> {
    let source = std::fs::read_to_string(input).with_context(|| format!("reading {:?}", input))?;
    let result = Splitter::new(SplitOptions::from(config)).split(&source)?;
    Ok((source, result))
}

fn print_diagnostics(result: &SplitOutput) {
    for item in result.diagnostics.warnings() {
        eprintln!("⚠️  {}", item);
    }
}
