//! The `match` command.
//!
//! [`run_pipeline`] threads one explicit state through every stage
//! (normalize both tables, resolve the plan, join, compare, assemble) and
//! touches no files. [`execute`] wraps it with input validation, reading and
//! writing. Nothing is written until every stage has succeeded.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use encoding_rs::Encoding;
use log::{info, warn};

use crate::{
    assemble::{AssembledTable, Comparisons, assemble},
    cli::MatchArgs,
    compare::STRENGTH_COLUMN,
    config::{MatchConfig, MatchPlan, RawPrecision, SchemaChoice, TableConfig},
    frame::Frame,
    frequency::{FrequencyTable, column_frequencies},
    io_utils,
    join::{Joined, MATCH_COLUMN, match_names},
    printable_delimiter,
    report::{InputSummary, MappingSummary, OutputSummary, Summary},
    schema::normalize,
    temporal::OVERLAP_COLUMN,
    vocabulary::Side,
};

#[derive(Debug, Clone)]
pub struct MatchOutcome {
    pub plan: MatchPlan,
    pub joined: Joined,
    pub comparisons: Comparisons,
    pub table: AssembledTable,
}

impl MatchOutcome {
    /// Value counts for the status column and every comparison column.
    pub fn frequencies(&self) -> Vec<FrequencyTable> {
        let mut columns = vec![MATCH_COLUMN.to_string()];
        columns.extend(self.comparisons.coordinates.iter().map(|c| c.name.clone()));
        if let Some(temporal) = &self.comparisons.temporal {
            columns.push(temporal.beg_match.name.clone());
            columns.push(temporal.end_match.name.clone());
            columns.push(OVERLAP_COLUMN.to_string());
        }
        columns.extend(self.comparisons.admin_type.iter().map(|c| c.name.clone()));
        columns.push(STRENGTH_COLUMN.to_string());
        let names = columns.iter().map(String::as_str).collect::<Vec<_>>();
        column_frequencies(&self.table, &names)
    }
}

pub fn run_pipeline(incoming: &Frame, target: &Frame, config: &MatchConfig) -> Result<MatchOutcome> {
    let target = normalize(target, Side::Target, &config.target).context("Normalizing target table")?;
    let incoming =
        normalize(incoming, Side::Incoming, &config.incoming).context("Normalizing incoming table")?;
    let plan = config
        .matching
        .resolve(incoming.fields(), target.fields())
        .context("Resolving matching configuration")?;
    info!(
        "Matching on {} ({} names, {} coordinates)",
        plan.name_key,
        plan.name_mode,
        plan.coordinates.label()
    );

    let joined = match_names(target, incoming, plan.name_key, plan.name_mode);
    let comparisons = Comparisons::compute(&joined, &plan);
    let table = assemble(&joined, &comparisons);
    Ok(MatchOutcome {
        plan,
        joined,
        comparisons,
        table,
    })
}

/// Applies command-line overrides on top of a loaded configuration.
fn apply_overrides(config: &mut MatchConfig, args: &MatchArgs) {
    let matching = &mut config.matching;
    if let Some(key) = args.name_key {
        matching.name_key = Some(key);
    }
    if let Some(mode) = args.name_mode {
        matching.name_mode = mode;
    }
    if let Some(mode) = args.coord_mode {
        matching.coord_mode = mode;
    }
    if let Some(places) = &args.decimal_places {
        matching.decimal_places = Some(RawPrecision::Text(places.clone()));
    }
    if let Some(key) = args.type_key {
        matching.type_key = Some(key);
    }
    if let Some(schema) = args.target_schema {
        config.target.schema = schema;
    }
}

fn read_table(path: &Path, delimiter: Option<u8>, encoding: &'static Encoding) -> Result<Frame> {
    let delimiter = io_utils::resolve_input_delimiter(path, delimiter);
    info!(
        "Reading '{}' with delimiter '{}'",
        path.display(),
        printable_delimiter(delimiter)
    );
    Frame::read_csv(path, delimiter, encoding).with_context(|| format!("Reading {path:?}"))
}

pub fn execute(args: &MatchArgs) -> Result<()> {
    io_utils::validate_input_path(&args.incoming)?;
    io_utils::validate_input_path(&args.target)?;
    let input_encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let output_encoding = io_utils::resolve_encoding(args.output_encoding.as_deref())?;

    let mut config = match &args.config {
        Some(path) => MatchConfig::load(path)?,
        None => {
            warn!("No configuration supplied; detecting the target schema automatically");
            MatchConfig {
                target: TableConfig {
                    schema: SchemaChoice::Auto,
                    ..Default::default()
                },
                ..MatchConfig::default()
            }
        }
    };
    apply_overrides(&mut config, args);

    let incoming = read_table(&args.incoming, args.delimiter, input_encoding)?;
    let target = read_table(&args.target, args.delimiter, input_encoding)?;
    let outcome = run_pipeline(&incoming, &target, &config)?;

    let csv_path = io_utils::with_suffix(&args.output, "csv");
    let info_path = io_utils::with_suffix(&args.output, "info.txt");
    let summary = Summary {
        generated_at: Local::now(),
        incoming: InputSummary {
            file: io_utils::file_label(&args.incoming),
            sha256: io_utils::file_digest(&args.incoming)?,
            rows: incoming.len(),
        },
        target: InputSummary {
            file: io_utils::file_label(&args.target),
            sha256: io_utils::file_digest(&args.target)?,
            rows: target.len(),
        },
        output: OutputSummary {
            file: io_utils::file_label(&csv_path),
            rows: outcome.table.len(),
            discarded_target_rows: outcome.joined.discarded_target_rows,
        },
        frequencies: outcome.frequencies(),
        plan: outcome.plan,
        target_mapping: MappingSummary {
            origin: outcome.joined.target.origin,
            fields: outcome.joined.target.mapping.clone(),
        },
        incoming_mapping: MappingSummary {
            origin: outcome.joined.incoming.origin,
            fields: outcome.joined.incoming.mapping.clone(),
        },
        output_columns: outcome.table.headers.clone(),
    };

    let output_delimiter =
        io_utils::resolve_output_delimiter(args.output_delimiter, io_utils::DEFAULT_CSV_DELIMITER);
    let csv_bytes = io_utils::render_csv(
        &outcome.table.headers,
        &outcome.table.rows,
        output_delimiter,
        output_encoding,
    )?;
    let info_bytes = io_utils::encode_text(&summary.render_text(), output_encoding)?;
    let json = if args.summary_json {
        Some(summary.render_json().context("Serializing summary")?)
    } else {
        None
    };

    io_utils::write_bytes(&csv_path, &csv_bytes)?;
    io_utils::write_bytes(&info_path, &info_bytes)?;
    info!("Wrote {} row(s) to {:?}", outcome.table.len(), csv_path);
    info!("Wrote summary to {:?}", info_path);
    if let Some(json) = json {
        let json_path = io_utils::with_suffix(&args.output, "info.json");
        io_utils::write_bytes(&json_path, json.as_bytes())?;
        info!("Wrote JSON summary to {:?}", json_path);
    }
    Ok(())
}
