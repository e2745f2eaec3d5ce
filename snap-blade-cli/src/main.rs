//! snap-blade CLI tool

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;

use snap_blade::config::SnapConfig;
use snap_blade::observability::{self, LoggingConfig};
use snap_blade_cli_lib::commands::{CheckCommand, CompileCommand, RenderCommand};
use snap_blade_cli_lib::{apply_template_dirs, build_engine, Fixture};

#[derive(Parser)]
#[command(name = "snap-blade")]
#[command(version)]
#[command(about = "Render and check snap-blade templates", long_about = None)]
struct Cli {
    /// Configuration file (default: ./blade.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Template directory; repeat to add fallbacks
    #[arg(long = "templates", global = true, value_name = "DIR")]
    templates: Vec<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a template and print the output
    Render {
        /// Template name (e.g. `views.index`), or a theme file with --view
        name: String,
        /// JSON fixture with data and site answers
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Resolve NAME as a theme file slug
        #[arg(long)]
        view: bool,
    },
    /// Print the template code a template expands to
    Compile {
        /// Template name
        name: String,
    },
    /// Compile every template and report failures
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    observability::init(&LoggingConfig::verbose(cli.verbose))?;

    let mut config = match &cli.config {
        Some(path) => SnapConfig::load_from(path)?,
        None => SnapConfig::load()?,
    };
    apply_template_dirs(&mut config, &cli.templates);

    match cli.command {
        Commands::Render {
            name,
            fixture,
            view,
        } => {
            let fixture = fixture
                .as_deref()
                .map(Fixture::load)
                .transpose()?
                .unwrap_or_default();
            let engine = build_engine(&config, &fixture);
            let output = RenderCommand {
                name,
                data: fixture.data,
                view,
            }
            .execute(&engine)?;
            print!("{output}");
        }
        Commands::Compile { name } => {
            let engine = build_engine(&config, &Fixture::default());
            println!("{}", CompileCommand { name }.execute(&engine)?);
        }
        Commands::Check => {
            let engine = build_engine(&config, &Fixture::default());
            let report = CheckCommand.execute(&engine)?;
            for name in &report.passed {
                println!("{} {name}", style("ok").green().bold());
            }
            for (name, error) in &report.failed {
                println!("{} {name}: {error}", style("error").red().bold());
            }
            println!();
            if !report.is_ok() {
                bail!(
                    "{} of {} templates failed to compile",
                    report.failed.len(),
                    report.total()
                );
            }
            println!(
                "{} {} templates compiled",
                style("Done").green().bold(),
                report.total()
            );
        }
    }

    Ok(())
}
