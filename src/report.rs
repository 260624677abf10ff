//! Run summary written next to the output table.
//!
//! The text form mirrors what an analyst reviews after a run: inputs and their
//! digests, row counts, value counts for each comparison column, and the
//! effective configuration. The same data serializes to JSON.

use std::fmt::Write as _;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::{
    config::{CoordinateMode, MatchPlan},
    frequency::FrequencyTable,
    schema::{FieldMapping, MappingOrigin},
    table::render_table,
};

pub const TIMESTAMP_FORMAT: &str = "%H:%M, %m/%d/%Y";

#[derive(Debug, Clone, Serialize)]
pub struct InputSummary {
    pub file: String,
    pub sha256: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutputSummary {
    pub file: String,
    pub rows: usize,
    pub discarded_target_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct MappingSummary {
    pub origin: MappingOrigin,
    pub fields: FieldMapping,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub generated_at: DateTime<Local>,
    pub incoming: InputSummary,
    pub target: InputSummary,
    pub output: OutputSummary,
    pub frequencies: Vec<FrequencyTable>,
    pub plan: MatchPlan,
    pub target_mapping: MappingSummary,
    pub incoming_mapping: MappingSummary,
    pub output_columns: Vec<String>,
}

impl Summary {
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "SUMMARY OF RESULTS");
        let _ = writeln!(out, "Generated at {}", self.generated_at.format(TIMESTAMP_FORMAT));
        let _ = writeln!(out);
        let _ = writeln!(out, "Incoming file: {}", self.incoming.file);
        let _ = writeln!(out, "  sha256: {}", self.incoming.sha256);
        let _ = writeln!(out, "Target file:   {}", self.target.file);
        let _ = writeln!(out, "  sha256: {}", self.target.sha256);
        let _ = writeln!(out, "Output file:   {}", self.output.file);
        let _ = writeln!(out);
        let _ = writeln!(out, "Incoming rows: {}", self.incoming.rows);
        let _ = writeln!(out, "Target rows:   {}", self.target.rows);
        let _ = writeln!(out, "Output rows:   {}", self.output.rows);
        let _ = writeln!(
            out,
            "Target rows with no incoming match (dropped): {}",
            self.output.discarded_target_rows
        );

        let _ = writeln!(out);
        let _ = writeln!(out, "FREQUENCY COUNTS");
        for table in &self.frequencies {
            let _ = writeln!(out);
            let _ = writeln!(out, "{}", table.column);
            out.push_str(&render_table(&["value", "count", "percent"], &table.render_rows()));
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "BACKGROUND INFORMATION");
        let _ = writeln!(out);
        let _ = writeln!(out, "Name match key: {}", self.plan.name_key);
        let _ = writeln!(out, "Name match mode: {}", self.plan.name_mode);
        match self.plan.type_key {
            Some(key) => {
                let _ = writeln!(out, "Administrative type key: {key}");
            }
            None => {
                let _ = writeln!(out, "Administrative type key: none (not compared)");
            }
        }
        match self.plan.coordinates {
            CoordinateMode::Strict => {
                let _ = writeln!(out, "Coordinate match mode: strict");
            }
            CoordinateMode::Fuzzy { places, defaulted } => {
                let _ = writeln!(out, "Coordinate match mode: fuzzy");
                let note = if defaulted { " (defaulted)" } else { "" };
                let _ = writeln!(out, "Decimal places: {places}{note}");
            }
        }
        write_mapping(&mut out, "Target", &self.target_mapping);
        write_mapping(&mut out, "Incoming", &self.incoming_mapping);

        let _ = writeln!(out);
        let _ = writeln!(out, "Output columns:");
        for column in &self.output_columns {
            let _ = writeln!(out, "  {column}");
        }
        out
    }

    pub fn render_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn write_mapping(out: &mut String, label: &str, mapping: &MappingSummary) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{label} field mapping ({}):", mapping.origin);
    let rows = mapping
        .fields
        .iter()
        .map(|field| vec![field.source.clone(), field.canonical.clone()])
        .collect::<Vec<_>>();
    out.push_str(&render_table(&["source", "canonical"], &rows));
}
