//! vapor cli interface

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
    /// This is equivalent to running { cd <directory>; vapor ... }
    #[clap(short = 'C', long = "directory", global(true))]
    pub directory: Vec<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a template
    ///
    /// Builds the named document and applies recipes in the given order.
    /// Without --recipe the comma separated `defaults.recipes` setting is used.
    #[command(alias = "gen")]
    Generate(GenerateCommand),

    /// List document sources and recipes
    List,

    /// Show or change settings
    Configure(ConfigureCommand),
}

#[derive(Parser, Debug)]
pub struct GenerateCommand {
    /// Name of the document source
    pub source: String,

    /// Recipe to apply, can be specified multiple times
    #[clap(short = 'r', long = "recipe")]
    pub recipes: Vec<String>,

    /// Write to a file instead of stdout
    #[clap(short = 'o', long = "output")]
    pub output_file: Option<PathBuf>,

    #[clap(flatten)]
    pub output: OutputArgs,
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
pub struct ConfigureCommand {
    #[command(subcommand)]
    pub command: ConfigureSubCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigureSubCommand {
    /// Print all settings (global and local combined)
    List,
    /// Set a value
    Set(SetArgs),
}

#[derive(Parser, Debug)]
pub struct SetArgs {
    /// Write to the global settings file instead of the local one
    #[clap(long)]
    pub system: bool,

    pub section: String,
    pub key: String,
    pub value: String,
}
