use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    config::{MatchMode, NameKey, SchemaChoice, TypeKey},
    vocabulary::Side,
};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Reconcile a gazetteer extract against the CHGIS reference data",
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Match incoming place names against a target table and annotate the result
    Match(MatchArgs),
    /// List the canonical fields and the CHGIS reference schemas
    Fields(FieldsArgs),
    /// Write a starter YAML configuration
    Init(InitArgs),
}

#[derive(Debug, Args)]
pub struct MatchArgs {
    /// Incoming CSV/TSV file (the data to reconcile)
    #[arg(short = 'i', long = "incoming")]
    pub incoming: PathBuf,
    /// Target CSV/TSV file (typically a CHGIS export)
    #[arg(short = 't', long = "target")]
    pub target: PathBuf,
    /// YAML configuration with field mappings and matching choices
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,
    /// Output path without extension; writes <OUTPUT>.csv and <OUTPUT>.info.txt
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Name field to join on
    #[arg(long = "name-key", value_enum)]
    pub name_key: Option<NameKey>,
    /// Strict names, or fuzzy (first two characters; never applied to pinyin)
    #[arg(long = "name-mode", value_enum)]
    pub name_mode: Option<MatchMode>,
    /// Strict coordinates, or fuzzy (rounded to --decimal-places)
    #[arg(long = "coord-mode", value_enum)]
    pub coord_mode: Option<MatchMode>,
    /// Decimal places for fuzzy coordinates (invalid values fall back to 0)
    #[arg(long = "decimal-places", allow_hyphen_values = true)]
    pub decimal_places: Option<String>,
    /// Administrative type field to compare when both are present
    #[arg(long = "type-key", value_enum)]
    pub type_key: Option<TypeKey>,
    /// How target columns are mapped (overrides the configuration)
    #[arg(long = "target-schema", value_enum)]
    pub target_schema: Option<SchemaChoice>,
    /// CSV delimiter character for both inputs (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input files (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Delimiter for the output table (defaults to ',')
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
    /// Character encoding for the output files (defaults to utf-8)
    #[arg(long = "output-encoding")]
    pub output_encoding: Option<String>,
    /// Also write the summary as <OUTPUT>.info.json
    #[arg(long = "summary-json")]
    pub summary_json: bool,
}

#[derive(Debug, Args)]
pub struct FieldsArgs {
    /// Only list one side's vocabulary
    #[arg(long, value_enum)]
    pub side: Option<Side>,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Destination YAML file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
