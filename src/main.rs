//! `strata` CLI: assemble a layered configuration and print the result.
//!
//! Discovers `<profile>[-<variant>].<ext>` sources under the given roots,
//! applies the trailing engine tokens (`--load <path>` and
//! `<path>=<value>`), and prints the merged document as pretty JSON.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use strata::AssemblyOptions;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Assemble and print a layered configuration document.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Profile to load (repeatable, in load order)
    #[arg(short, long = "profile")]
    profiles: Vec<String>,

    /// Variant layered within each profile (repeatable)
    #[arg(long = "variant")]
    variants: Vec<String>,

    /// Search root for configuration resources (repeatable)
    #[arg(short, long = "root", default_value = ".")]
    roots: Vec<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Engine tokens: `--load <path>` or `<slash/separated/path>=<value>`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::WARN
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let mut options = AssemblyOptions::new()
        .with_roots(cli.roots)
        .with_args(cli.tokens);
    options.profiles = cli.profiles;
    options.variants = cli.variants;

    let document = strata::assemble(&options)?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}
