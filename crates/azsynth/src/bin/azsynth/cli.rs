//! azsynth cli interface

use clap::{Parser, Subcommand, ValueEnum};
use std::fmt::Formatter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Change the work directory
    ///
    /// Can be specified multiple times. Note that all
    /// paths on the way to the final path must exist.
    ///
    /// This is equivalent to running { cd <directory>; azsynth ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synthesize ARM templates from declarations
    ///
    /// Reads HCL from stdin unless any other source is provided (via --input-*).
    /// Prints one template per deployable unit, keyed by the unit's path.
    #[command(alias = "synth")]
    Synthesize(SynthesizeCommand),

    /// Print debug information for development
    Dev(DevCommand),
}

#[derive(Parser, Debug)]
pub struct SynthesizeCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[clap(flatten)]
    pub output: OutputArgs,

    /// Only print the template of this unit, e.g. `/main/core`
    #[clap(short = 'u', long = "unit")]
    pub unit: Option<String>,
}

#[derive(Parser, Debug)]
pub struct InputArgs {
    /// Load `*.infra.hcl` files from work directory
    #[clap(short = 'w', long = "input-workdir")]
    pub workdir: bool,

    /// Load a file
    #[clap(short = 'f', long = "input-file")]
    pub files: Vec<PathBuf>,

    /// Load `*.infra.hcl` files from given directory
    #[clap(short = 'd', long = "input-dir")]
    pub directories: Vec<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct OutputArgs {
    #[arg(short = 'F', long = "output-format", default_value_t)]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Default, Debug)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Json => f.write_str("json"),
            OutputFormat::Yaml => f.write_str("yaml"),
        }
    }
}

#[derive(Parser, Debug)]
pub struct DevCommand {
    #[clap(flatten)]
    pub input: InputArgs,

    #[command(subcommand)]
    pub command: DevSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum DevSubCommand {
    /// Loaded HCL documents
    Documents,
    /// Construct tree with the capabilities of each node
    Tree,
    /// Resource types known to the catalog
    Catalog,
}
